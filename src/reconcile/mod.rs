// Merge freshly scraped events into a shipment's stored history.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::extractor::RawEvent;
use crate::shipment::{StatusCode, StatusEvent};
use crate::util::time::normalize_or_now;

pub mod classify;

pub use classify::{classify, mentions_delivered};

/// Two events with equal text closer than this are the same milestone.
pub const DUPLICATE_WINDOW_MS: i64 = 60_000;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    /// Drop rows whose status text is blank instead of keeping them as `custom`.
    pub skip_empty_status: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub history: Vec<StatusEvent>,
    pub added: usize,
    pub is_delivered: bool,
    /// The delivered flag went from false to true in this merge.
    pub newly_delivered: bool,
}

pub fn normalize(raw: &RawEvent, now: DateTime<Utc>) -> StatusEvent {
    StatusEvent::new(normalize_or_now(&raw.time_text, now), raw.status_text.clone(), classify(&raw.status_text))
}

pub fn is_duplicate(a: &StatusEvent, b: &StatusEvent) -> bool {
    a.status == b.status && (a.timestamp - b.timestamp).num_milliseconds().abs() < DUPLICATE_WINDOW_MS
}

pub fn history_is_delivered(history: &[StatusEvent]) -> bool {
    history.iter().any(|e| e.code == StatusCode::Delivered || mentions_delivered(&e.status))
}

pub fn reconcile(history: &[StatusEvent], fresh: &[RawEvent], now: DateTime<Utc>) -> Reconciliation {
    reconcile_with(history, fresh, now, ReconcileOptions::default())
}

pub fn reconcile_with(
    history: &[StatusEvent],
    fresh: &[RawEvent],
    now: DateTime<Utc>,
    opts: ReconcileOptions,
) -> Reconciliation {
    let was_delivered = history_is_delivered(history);
    let mut merged = history.to_vec();
    let mut added = 0usize;

    for raw in fresh {
        if opts.skip_empty_status && raw.status_text.trim().is_empty() { continue; }
        let candidate = normalize(raw, now);
        if merged.iter().any(|existing| is_duplicate(existing, &candidate)) { continue; }
        merged.push(candidate);
        added += 1;
    }

    let is_delivered = history_is_delivered(&merged) || fresh.iter().any(|r| mentions_delivered(&r.status_text));
    Reconciliation { history: merged, added, is_delivered, newly_delivered: is_delivered && !was_delivered }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::time::parse_carrier_datetime;
    use chrono::Duration;

    fn now() -> DateTime<Utc> { parse_carrier_datetime("2025/10/23 09:00").unwrap() }

    #[test]
    fn first_delivered_event() {
        let raw = vec![RawEvent::new("2025/10/22 12:37", "順利送達")];
        let rec = reconcile(&[], &raw, now());
        assert_eq!(rec.history.len(), 1);
        assert_eq!(rec.added, 1);
        assert_eq!(rec.history[0].code, StatusCode::Delivered);
        assert_eq!(rec.history[0].icon, "✅");
        assert_eq!(rec.history[0].timestamp, parse_carrier_datetime("2025/10/22 12:37").unwrap());
        assert!(rec.is_delivered);
        assert!(rec.newly_delivered);
    }

    #[test]
    fn reconciling_twice_adds_nothing() {
        let raw = vec![
            RawEvent::new("2025/10/21 18:02", "已集貨"),
            RawEvent::new("2025/10/21 22:15", "轉運中"),
            RawEvent::new("2025/10/22 07:50", "配送中"),
        ];
        let once = reconcile(&[], &raw, now());
        let twice = reconcile(&once.history, &raw, now() + Duration::hours(1));
        assert_eq!(twice.added, 0);
        assert_eq!(twice.history, once.history);
        assert!(!twice.newly_delivered);
    }

    #[test]
    fn row_fallback_times_are_stable_across_checks() {
        let html = "<table><tr><td>2017-11-24 08:00</td><td>貨件配送中，請耐心等候</td></tr></table>";
        let raw = crate::extractor::extract(html);
        assert_eq!(raw.len(), 1);
        let once = reconcile(&[], &raw, now());
        let later = reconcile(&once.history, &raw, now() + Duration::minutes(30));
        assert_eq!(once.added, 1);
        assert_eq!(later.added, 0);
        assert_eq!(once.history[0].timestamp, parse_carrier_datetime("2017/11/24 08:00").unwrap());
    }

    #[test]
    fn duplicate_window_is_under_sixty_seconds() {
        let base = parse_carrier_datetime("2025/10/22 12:00").unwrap();
        let existing = vec![StatusEvent::new(base, "配送中", StatusCode::Delivery)];

        let near = reconcile(&existing, &[RawEvent::new("2025/10/22 12:00:59", "配送中")], now());
        assert_eq!(near.history.len(), 1);

        let far = reconcile(&existing, &[RawEvent::new("2025/10/22 12:01:01", "配送中")], now());
        assert_eq!(far.history.len(), 2);

        let other_text = reconcile(&existing, &[RawEvent::new("2025/10/22 12:00", "轉運中")], now());
        assert_eq!(other_text.history.len(), 2);
    }

    #[test]
    fn duplicates_inside_one_batch_collapse() {
        let raw = vec![RawEvent::new("2025/10/22 12:37", "順利送達"), RawEvent::new("2025/10/22 12:37", "順利送達")];
        let rec = reconcile(&[], &raw, now());
        assert_eq!(rec.added, 1);
    }

    #[test]
    fn appends_in_extraction_order() {
        let existing = vec![StatusEvent::new(now(), "手動備註", StatusCode::Custom)];
        let raw = vec![RawEvent::new("2025/10/22 12:37", "順利送達"), RawEvent::new("2025/10/21 18:02", "已集貨")];
        let rec = reconcile(&existing, &raw, now());
        let texts: Vec<&str> = rec.history.iter().map(|e| e.status.as_str()).collect();
        assert_eq!(texts, vec!["手動備註", "順利送達", "已集貨"]);
    }

    #[test]
    fn bad_time_falls_back_to_now() {
        let rec = reconcile(&[], &[RawEvent::new("2025/13/40 99:99", "配送中")], now());
        assert_eq!(rec.history[0].timestamp, now());
    }

    #[test]
    fn unparseable_rows_are_kept_as_custom() {
        let rec = reconcile(&[], &[RawEvent::new("???", "")], now());
        assert_eq!(rec.added, 1);
        assert_eq!(rec.history[0].code, StatusCode::Custom);

        let skip = ReconcileOptions { skip_empty_status: true };
        let rec = reconcile_with(&[], &[RawEvent::new("???", "  ")], now(), skip);
        assert_eq!(rec.added, 0);
    }

    #[test]
    fn already_delivered_is_not_a_transition() {
        let delivered = vec![StatusEvent::new(now(), "順利送達", StatusCode::Delivered)];
        let rec = reconcile(&delivered, &[RawEvent::new("2025/10/23 10:00", "貨件已經簽收")], now());
        assert!(rec.is_delivered);
        assert!(!rec.newly_delivered);
    }
}

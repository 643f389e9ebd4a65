use chrono::{DateTime, Utc};

use super::types::{StatusCode, StatusEvent};

struct Preset {
    label: &'static str,
    code: StatusCode,
    keywords: &'static [&'static str],
}

// Numbered choices offered for manual entry, 1-based.
const PRESETS: &[Preset] = &[
    Preset { label: "📦 已集貨", code: StatusCode::Pickup, keywords: &["集貨", "取件", "已取"] },
    Preset { label: "🚚 轉運中", code: StatusCode::Transit, keywords: &["轉運", "發送", "抵達", "到著"] },
    Preset { label: "🏃 配送中", code: StatusCode::Delivery, keywords: &["配達", "配送", "派送"] },
    Preset { label: "✅ 順利送達", code: StatusCode::Delivered, keywords: &["送達", "配交", "簽收", "完成"] },
    Preset { label: "⚠️ 異常狀況", code: StatusCode::Exception, keywords: &["客戶不在", "地址錯誤", "異常"] },
];

pub fn preset_labels() -> impl Iterator<Item = (usize, &'static str)> {
    PRESETS.iter().enumerate().map(|(i, p)| (i + 1, p.label))
}

// Typed text is matched against the presets in menu order.
fn classify_manual(text: &str) -> StatusCode {
    PRESETS
        .iter()
        .find(|p| p.keywords.iter().any(|k| text.contains(k)))
        .map(|p| p.code)
        .unwrap_or(StatusCode::Custom)
}

// The leading run of ASCII digits, so "4 號" still picks preset 4.
fn leading_number(input: &str) -> Option<usize> {
    let end = input.find(|c: char| !c.is_ascii_digit()).unwrap_or(input.len());
    input[..end].parse().ok()
}

/// Turn user input into an event: a preset number or free text. Blank input yields nothing.
pub fn manual_status(input: &str, now: DateTime<Utc>) -> Option<StatusEvent> {
    let input = input.trim();
    if input.is_empty() { return None; }

    if let Some(p) = leading_number(input).and_then(|n| n.checked_sub(1)).and_then(|i| PRESETS.get(i)) {
        return Some(StatusEvent::new(now, p.label, p.code));
    }
    Some(StatusEvent::new(now, input, classify_manual(input)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_pick_presets() {
        let now = Utc::now();
        let ev = manual_status("4", now).unwrap();
        assert_eq!(ev.status, "✅ 順利送達");
        assert_eq!(ev.code, StatusCode::Delivered);
        assert_eq!(ev.icon, "✅");
        assert_eq!(ev.timestamp, now);

        assert_eq!(manual_status(" 1 ", now).unwrap().code, StatusCode::Pickup);
        assert_eq!(manual_status("5", now).unwrap().icon, "⚠️");
    }

    #[test]
    fn leading_digits_pick_presets() {
        let now = Utc::now();
        assert_eq!(manual_status("4 號", now).unwrap().status, "✅ 順利送達");
        assert_eq!(manual_status("2轉運", now).unwrap().code, StatusCode::Transit);
        let ev = manual_status("45", now).unwrap();
        assert_eq!((ev.status.as_str(), ev.code), ("45", StatusCode::Custom));
    }

    #[test]
    fn out_of_range_numbers_are_free_text() {
        let now = Utc::now();
        let ev = manual_status("0", now).unwrap();
        assert_eq!((ev.status.as_str(), ev.code), ("0", StatusCode::Custom));
        assert_eq!(manual_status("6", now).unwrap().code, StatusCode::Custom);
    }

    #[test]
    fn free_text_is_kept_verbatim_and_classified() {
        let now = Utc::now();
        let ev = manual_status("台中營業所 配送完成", now).unwrap();
        assert_eq!(ev.status, "台中營業所 配送完成");
        assert_eq!(ev.code, StatusCode::Delivery);

        assert_eq!(manual_status("已取件", now).unwrap().code, StatusCode::Pickup);
        assert_eq!(manual_status("請來電", now).unwrap().code, StatusCode::Custom);
        assert!(manual_status("   ", now).is_none());
    }

    #[test]
    fn labels_are_numbered_from_one() {
        let labels: Vec<_> = preset_labels().collect();
        assert_eq!(labels.len(), 5);
        assert_eq!(labels[0], (1, "📦 已集貨"));
    }
}

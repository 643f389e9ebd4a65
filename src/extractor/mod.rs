use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::telemetry::{self};
use crate::telemetry::ops::extract::Phase as ExtractPhase;

mod grid;
mod inline;
mod pairing;
pub mod patterns;
mod rows;

pub use pairing::{GUESS_DELIVERED, GUESS_IN_TRANSIT, GUESS_PICKED_UP};

pub const PREVIEW_CHARS: usize = 3000;

/// One unclassified (time, status) pair scraped from a tracking page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "time")]
    pub time_text: String,
    #[serde(rename = "status")]
    pub status_text: String,
}

impl RawEvent {
    pub fn new(time_text: impl Into<String>, status_text: impl Into<String>) -> Self {
        Self { time_text: time_text.into(), status_text: status_text.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Grid,
    Table,
    Proximity,
    Rows,
    Inline,
    None,
}

/// Extract status events from a carrier tracking page. Never fails; an
/// unrecognizable page yields an empty list.
pub fn extract(html: &str) -> Vec<RawEvent> {
    extract_with_strategy(html).1
}

// Strategies run in order and the first one producing events wins.
pub fn extract_with_strategy(html: &str) -> (Strategy, Vec<RawEvent>) {
    let grid = grid::grid_times(html);
    let (times, source) = if grid.is_empty() {
        (grid::table_times(html), Strategy::Table)
    } else {
        (grid, Strategy::Grid)
    };

    if !times.is_empty() {
        let keywords = patterns::scan_keywords(html, patterns::pairing_keyword_re());
        let paired = pairing::positional(&times, &keywords);
        if !paired.is_empty() { return (source, paired); }

        let near = pairing::proximity(html, &times);
        if !near.is_empty() { return (Strategy::Proximity, near); }
    }

    let by_row = rows::row_events(html);
    if !by_row.is_empty() { return (Strategy::Rows, by_row); }

    let loose = inline::inline_events(html);
    if !loose.is_empty() { return (Strategy::Inline, loose); }

    (Strategy::None, Vec::new())
}

/// Facts about a page that produced no events, for diagnosing markup drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDiagnostics {
    pub html_length: usize,
    pub html_preview: String,
    pub has_grid_items: bool,
    pub has_col_optime: bool,
    pub has_tables: bool,
    pub has_date_time: bool,
}

pub fn diagnose(html: &str) -> PageDiagnostics {
    PageDiagnostics {
        html_length: html.len(),
        html_preview: patterns::truncate_chars(html, PREVIEW_CHARS).to_string(),
        has_grid_items: html.contains("grid-item"),
        has_col_optime: html.contains("col_optime"),
        has_tables: html.contains("<table"),
        has_date_time: patterns::date_re().is_match(html),
    }
}

#[derive(Args, Debug)]
pub struct ExtractCmd {
    /// Saved carrier page to run the extractor against
    pub file: PathBuf,
}

#[derive(Serialize)]
struct ExtractReport {
    strategy: Strategy,
    events: Vec<RawEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<PageDiagnostics>,
}

pub async fn run(args: ExtractCmd) -> Result<()> {
    let log = telemetry::extract();
    let _g = log.root_span_kv([("file", args.file.display().to_string())]).entered();

    let html = {
        let _s = log.span(&ExtractPhase::Read).entered();
        tokio::fs::read_to_string(&args.file).await.with_context(|| format!("read {}", args.file.display()))?
    };
    let (strategy, events) = { let _s = log.span(&ExtractPhase::Extract).entered(); extract_with_strategy(&html) };

    let _o = log.span(&ExtractPhase::Output).entered();
    let debug = if events.is_empty() { Some(diagnose(&html)) } else { None };
    if telemetry::config::json_mode() {
        log.result(&ExtractReport { strategy, events, debug })?;
    } else if events.is_empty() {
        log.warn_kv("⚠️ no status events found", [("html_length", html.len().to_string())]);
    } else {
        log.info(format!("🔎 {} event(s) via {:?}", events.len(), strategy));
        for ev in &events { log.info(format!("  {}  {}", ev.time_text, ev.status_text)); }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID_PAGE: &str = r#"
        <div class="header">查詢時間：<span>2025/10/22 13:00</span></div>
        <div class="grid">
          <div class="grid-item col_optime">2025/10/22 12:37</div><div class="grid-item col_status">順利送達</div>
          <div class="grid-item col_optime">2025/10/22 07:50</div><div class="grid-item col_status">配送中</div>
          <div class="grid-item col_optime">2025/10/21 22:15</div><div class="grid-item col_status">轉運中</div>
          <div class="grid-item col_optime">2025/10/21 18:02</div><div class="grid-item col_status">已集貨</div>
        </div>
    "#;

    #[test]
    fn no_timestamps_means_no_events() {
        let html = "<html><body><p>順利送達</p><table><tr><td>貨態進度</td><td>配送中</td></tr></table></body></html>";
        assert_eq!(extract_with_strategy(html), (Strategy::None, Vec::new()));
        assert!(extract("").is_empty());
    }

    #[test]
    fn grid_times_pair_with_keywords_in_document_order() {
        let (strategy, events) = extract_with_strategy(GRID_PAGE);
        assert_eq!(strategy, Strategy::Grid);
        assert_eq!(events, vec![
            RawEvent::new("2025/10/22 12:37", "順利送達"),
            RawEvent::new("2025/10/22 07:50", "配送中"),
            RawEvent::new("2025/10/21 22:15", "轉運中"),
            RawEvent::new("2025/10/21 18:02", "已集貨"),
        ]);
    }

    #[test]
    fn grid_times_without_keywords_are_guessed() {
        let html = r#"
            <div class="grid-item col_optime">2025/10/22 12:37</div>
            <div class="grid-item col_optime">2025/10/22 07:50</div>
            <div class="grid-item col_optime">2025/10/21 22:15</div>
        "#;
        let (strategy, events) = extract_with_strategy(html);
        assert_eq!(strategy, Strategy::Proximity);
        let labels: Vec<&str> = events.iter().map(|e| e.status_text.as_str()).collect();
        assert_eq!(labels, vec![GUESS_DELIVERED, GUESS_IN_TRANSIT, GUESS_PICKED_UP]);
    }

    #[test]
    fn table_cells_used_when_grid_missing() {
        let html = "<table><tr><td>2017/11/24 21:27</td><td>貨件已經簽收</td></tr><tr><td>2017/11/24 08:00</td><td>配送中</td></tr></table>";
        let (strategy, events) = extract_with_strategy(html);
        assert_eq!(strategy, Strategy::Table);
        assert_eq!(events, vec![
            RawEvent::new("2017/11/24 21:27", "簽收"),
            RawEvent::new("2017/11/24 08:00", "配送中"),
        ]);
    }

    #[test]
    fn rows_used_when_no_time_markup_matches() {
        let html = "<table><tr><td>2017年11月24日 21:27</td><td>貨件已經簽收</td></tr></table>";
        let (strategy, events) = extract_with_strategy(html);
        assert_eq!(strategy, Strategy::Rows);
        assert_eq!(events, vec![RawEvent::new("2017年11月24日 21:27", "貨件已經簽收")]);
    }

    #[test]
    fn inquiry_time_never_becomes_an_event() {
        let html = r#"<p>查詢時間：<span>2025/10/22 13:00</span></p>"#;
        assert!(extract(html).is_empty());
    }

    #[test]
    fn diagnostics_flag_markup() {
        let d = diagnose("<table><tr><td class=\"grid-item\">2025/1/1</td></tr></table>");
        assert!(d.has_tables && d.has_grid_items && d.has_date_time);
        assert!(!d.has_col_optime);
        assert_eq!(d.html_length, d.html_preview.len());
    }

    #[test]
    fn raw_event_wire_names() {
        let v = serde_json::to_value(RawEvent::new("2025/10/22 12:37", "順利送達")).unwrap();
        assert_eq!(v, serde_json::json!({ "time": "2025/10/22 12:37", "status": "順利送達" }));
    }
}

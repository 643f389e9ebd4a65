use scraper::{Html, Selector};

use super::patterns::{cell_date_re, collapse_whitespace, INQUIRY_LABEL};
use super::RawEvent;

// Header cells of the carrier's status table.
const HEADER_LABELS: &[&str] = &["作業時間", "貨態進度"];
const MIN_STATUS_CHARS: usize = 4;

/// Walk table rows and take (date cell, adjacent cell) pairs.
pub fn row_events(html: &str) -> Vec<RawEvent> {
    let doc = Html::parse_document(html);
    let (Ok(row_sel), Ok(cell_sel)) = (Selector::parse("tr"), Selector::parse("td, th")) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for row in doc.select(&row_sel) {
        let cells: Vec<String> = row
            .select(&cell_sel)
            .map(|c| collapse_whitespace(&c.text().collect::<String>()))
            .collect();
        if cells.len() < 2 { continue; }
        if let Some(ev) = pick_pair(&cells) { out.push(ev); }
    }
    out
}

fn pick_pair(cells: &[String]) -> Option<RawEvent> {
    let non_empty = |i: usize| cells.get(i).filter(|s| !s.is_empty());

    let (time, status) = if cell_date_re().is_match(&cells[0]) {
        (&cells[0], non_empty(1).or(non_empty(2))?)
    } else if cell_date_re().is_match(&cells[1]) {
        (&cells[1], non_empty(2).or(non_empty(0))?)
    } else {
        return None;
    };

    if cells.iter().any(|c| c.contains(INQUIRY_LABEL)) { return None; }
    if HEADER_LABELS.iter().any(|h| status.contains(h)) { return None; }
    if status.chars().count() < MIN_STATUS_CHARS { return None; }
    Some(RawEvent::new(time.clone(), status.clone()))
}

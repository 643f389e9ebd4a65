use std::sync::OnceLock;

use regex::Regex;

use super::patterns::{date_re, is_inquiry_time};

/// A time string found in the document and where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeHit {
    pub text: String,
    pub offset: usize,
}

// <div class="grid-item col_optime">2025/10/22 12:37</div>
fn grid_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<div[^>]*class="[^"]*col_optime[^"]*"[^>]*>([^<]+)</div>"#).expect("grid time regex")
    })
}

// <td>2017/11/24 21:27</td>
fn table_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)<td[^>]*>\s*(\d{4}/\d{1,2}/\d{1,2}\s+\d{1,2}:\d{2}(?::\d{2})?)\s*</td>").expect("table time regex")
    })
}

fn collect(html: &str, re: &Regex) -> Vec<TimeHit> {
    re.captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| {
            let raw = m.as_str();
            let text = raw.trim();
            if !date_re().is_match(text) { return None; }
            let offset = m.start() + (raw.len() - raw.trim_start().len());
            if is_inquiry_time(html, offset) { return None; }
            Some(TimeHit { text: text.to_string(), offset })
        })
        .collect()
}

/// Times carried by the carrier's grid layout markers, in document order.
pub fn grid_times(html: &str) -> Vec<TimeHit> {
    collect(html, grid_time_re())
}

/// Times sitting alone in table cells; used when the grid layout is absent.
pub fn table_times(html: &str) -> Vec<TimeHit> {
    collect(html, table_time_re())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_markers_in_order() {
        let html = r#"
            <div class="grid-item col_optime">2025/10/22 12:37</div><div class="grid-item">順利送達</div>
            <div class="grid-item col_optime"> 2025/10/22 08:10 </div><div class="grid-item">配送中</div>
            <div class="grid-item col_optime">處理中</div>
        "#;
        let times: Vec<String> = grid_times(html).into_iter().map(|t| t.text).collect();
        assert_eq!(times, vec!["2025/10/22 12:37", "2025/10/22 08:10"]);
    }

    #[test]
    fn offsets_point_at_time_text() {
        let html = r#"<div class="col_optime">  2025/1/2 3:04</div>"#;
        let hit = &grid_times(html)[0];
        assert!(html[hit.offset..].starts_with("2025/1/2 3:04"));
    }

    #[test]
    fn table_cells_with_seconds() {
        let html = "<table><tr><td>2017/11/24 21:27:05</td><td>貨件已經簽收</td></tr><tr><td>作業時間</td></tr></table>";
        let times: Vec<String> = table_times(html).into_iter().map(|t| t.text).collect();
        assert_eq!(times, vec!["2017/11/24 21:27:05"]);
    }

    #[test]
    fn inquiry_time_is_skipped() {
        let html = "<table><tr><td>查詢時間</td><td>2025/10/22 13:00</td></tr><tr><td>2025/10/22 12:37</td><td>順利送達</td></tr></table>";
        let times: Vec<String> = table_times(html).into_iter().map(|t| t.text).collect();
        assert_eq!(times, vec!["2025/10/22 12:37"]);
    }
}

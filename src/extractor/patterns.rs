use std::sync::OnceLock;

use regex::Regex;

/// Label printed next to the page's own query timestamp.
pub const INQUIRY_LABEL: &str = "查詢時間";
pub const INQUIRY_LOOKBEHIND_CHARS: usize = 30;

// Vocabulary used for positional pairing. Longer phrases first so alternation
// prefers them at the same offset.
pub const PAIRING_KEYWORDS: &[&str] = &[
    "順利送達", "已送達", "配送中", "配達", "已集貨", "集貨", "轉運中", "轉運", "到著", "簽收",
    "out for delivery", "delivered", "signed", "in transit", "picked up",
];

// Proximity search also accepts the rarer milestones and exception wording.
pub const PROXIMITY_EXTRA_KEYWORDS: &[&str] = &[
    "送達", "配交", "發送", "抵達", "取件", "派送", "客戶不在", "地址錯誤", "異常", "exception",
];

pub fn alternation_of(words: &[&str]) -> String {
    words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|")
}

pub fn pairing_keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!("(?i)(?:{})", alternation_of(PAIRING_KEYWORDS))).expect("pairing keyword regex")
    })
}

pub fn proximity_keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let all: Vec<&str> = PAIRING_KEYWORDS.iter().chain(PROXIMITY_EXTRA_KEYWORDS).copied().collect();
        Regex::new(&format!("(?i)(?:{})", alternation_of(&all))).expect("proximity keyword regex")
    })
}

pub fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}/\d{1,2}/\d{1,2}").expect("date regex"))
}

// "YYYY/M/D", "YYYY-M-D" or "YYYY年M月D" inside a table cell.
pub fn cell_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}[/\-年]\d{1,2}[/\-月]\d{1,2}").expect("cell date regex"))
}

pub fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag regex"))
}

/// A keyword occurrence: byte offset in the document and the matched text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordHit {
    pub offset: usize,
    pub text: String,
}

pub fn scan_keywords(haystack: &str, re: &Regex) -> Vec<KeywordHit> {
    re.find_iter(haystack)
        .map(|m| KeywordHit { offset: m.start(), text: m.as_str().to_string() })
        .collect()
}

// Up to `chars` characters immediately before byte offset `at`.
pub fn lookbehind(s: &str, at: usize, chars: usize) -> &str {
    if chars == 0 { return ""; }
    let head = &s[..at];
    let from = head.char_indices().rev().nth(chars - 1).map(|(i, _)| i).unwrap_or(0);
    &head[from..]
}

// Up to `chars` characters starting at byte offset `at`.
pub fn lookahead(s: &str, at: usize, chars: usize) -> &str {
    let tail = &s[at..];
    let to = tail.char_indices().nth(chars).map(|(i, _)| i).unwrap_or(tail.len());
    &tail[..to]
}

/// True when the time at `offset` is the page's own inquiry timestamp.
pub fn is_inquiry_time(html: &str, offset: usize) -> bool {
    lookbehind(html, offset, INQUIRY_LOOKBEHIND_CHARS).contains(INQUIRY_LABEL)
}

pub fn strip_tags(fragment: &str) -> String {
    let text = tag_re().replace_all(fragment, " ");
    collapse_whitespace(&text.replace("&nbsp;", " "))
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_scan_is_case_insensitive_and_ordered() {
        let hits = scan_keywords("<p>Picked Up</p><p>轉運中</p><p>順利送達</p>", pairing_keyword_re());
        let words: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(words, vec!["Picked Up", "轉運中", "順利送達"]);
    }

    #[test]
    fn lookaround_respects_char_boundaries() {
        let s = "查詢時間：2025/10/22";
        let at = s.find("2025").unwrap();
        assert_eq!(lookbehind(s, at, 2), "間：");
        assert_eq!(lookbehind(s, at, 100), "查詢時間：");
        assert_eq!(lookahead(s, at, 4), "2025");
        assert_eq!(lookahead(s, at, 1000), "2025/10/22");
    }

    #[test]
    fn inquiry_label_detected_within_window() {
        let html = "<span>查詢時間</span><span>2025/10/22 13:00</span>";
        let at = html.find("2025").unwrap();
        assert!(is_inquiry_time(html, at));

        let far = format!("查詢時間{}2025/10/22 13:00", "x".repeat(40));
        let at = far.find("2025").unwrap();
        assert!(!is_inquiry_time(&far, at));
    }

    #[test]
    fn strip_tags_collapses_markup() {
        assert_eq!(strip_tags("<b>貨件</b>&nbsp; 已經<br/>簽收"), "貨件 已經 簽收");
    }
}

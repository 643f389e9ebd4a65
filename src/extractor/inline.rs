use std::sync::OnceLock;

use regex::Regex;

use super::patterns::{alternation_of, is_inquiry_time, strip_tags, PAIRING_KEYWORDS, PROXIMITY_EXTRA_KEYWORDS};
use super::RawEvent;

// A date-time followed on the same line, within 200 characters, by a status word.
fn inline_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let words: Vec<&str> = PAIRING_KEYWORDS.iter().chain(PROXIMITY_EXTRA_KEYWORDS).copied().collect();
        let pattern = format!(
            r"(?i)(\d{{4}}/\d{{1,2}}/\d{{1,2}}\s+\d{{1,2}}:\d{{2}}(?::\d{{2}})?)[^\n]{{0,200}}(?:{})",
            alternation_of(&words)
        );
        Regex::new(&pattern).expect("inline event regex")
    })
}

/// Last resort over the tag-stripped text of the page.
pub fn inline_events(html: &str) -> Vec<RawEvent> {
    let text = html
        .lines()
        .map(strip_tags)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let mut out = Vec::new();
    for caps in inline_re().captures_iter(&text) {
        let (Some(whole), Some(time)) = (caps.get(0), caps.get(1)) else { continue };
        if is_inquiry_time(&text, time.start()) { continue; }
        let status = whole.as_str()[time.as_str().len()..].trim();
        if status.is_empty() { continue; }
        out.push(RawEvent::new(time.as_str().trim(), status));
    }
    out
}

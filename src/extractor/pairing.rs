use super::grid::TimeHit;
use super::patterns::{lookahead, lookbehind, proximity_keyword_re, scan_keywords, KeywordHit};
use super::RawEvent;

pub const WINDOW_BEFORE_CHARS: usize = 150;
pub const WINDOW_AFTER_CHARS: usize = 300;

// Ordinal guesses for timestamps with no status wording nearby. The newest
// milestone is listed first on the carrier page.
pub const GUESS_DELIVERED: &str = "順利送達";
pub const GUESS_IN_TRANSIT: &str = "配送中";
pub const GUESS_PICKED_UP: &str = "已集貨";

pub fn guessed_status(unmatched_ordinal: usize) -> &'static str {
    match unmatched_ordinal {
        0 => GUESS_DELIVERED,
        1 => GUESS_IN_TRANSIT,
        _ => GUESS_PICKED_UP,
    }
}

/// Zip times and keywords by position, up to the shorter list.
/// Assumes the page emits both lists in the same relative order.
pub fn positional(times: &[TimeHit], keywords: &[KeywordHit]) -> Vec<RawEvent> {
    times
        .iter()
        .zip(keywords.iter())
        .map(|(t, k)| RawEvent::new(t.text.clone(), k.text.clone()))
        .collect()
}

/// Pair each time with the nearest keyword inside a window around it,
/// guessing by ordinal when the window has none.
pub fn proximity(html: &str, times: &[TimeHit]) -> Vec<RawEvent> {
    let mut unmatched = 0usize;
    let mut out = Vec::with_capacity(times.len());
    for t in times {
        let before = lookbehind(html, t.offset, WINDOW_BEFORE_CHARS);
        let after = lookahead(html, t.offset, WINDOW_AFTER_CHARS);
        let start = t.offset - before.len();
        let window = &html[start..t.offset + after.len()];

        let nearest = scan_keywords(window, proximity_keyword_re())
            .into_iter()
            .min_by_key(|k| (start + k.offset).abs_diff(t.offset));

        let status = match nearest {
            Some(k) => k.text,
            None => {
                let guess = guessed_status(unmatched);
                unmatched += 1;
                guess.to_string()
            }
        };
        out.push(RawEvent::new(t.text.clone(), status));
    }
    out
}

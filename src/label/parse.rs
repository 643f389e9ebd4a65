use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Recipient details read off a shipping label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelFields {
    pub tracking_number: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub quantity: Option<u32>,
}

const ADDRESS_MARKERS: &[char] = &['市', '區', '路', '街', '號'];
const ADDRESS_MIN_CHARS: usize = 10;
const ADDRESS_MERGE_LINES: usize = 3;
const MAX_QUANTITY: u32 = 100;

fn tracking_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]{10}").expect("tracking number regex"))
}

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\x{4e00}-\x{9fa5}]{2,4}").expect("name regex"))
}

fn address_part_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[市區路街巷弄號樓]").expect("address part regex"))
}

fn quantity_of(line: &str) -> Option<u32> {
    if line.is_empty() || !line.bytes().all(|b| b.is_ascii_digit()) { return None; }
    line.parse::<u32>().ok().filter(|q| *q < MAX_QUANTITY)
}

// Short addresses are usually split across lines: join the run of
// address-looking lines that starts at the first city/district line.
fn merged_address(lines: &[&str]) -> Option<String> {
    let start = lines.iter().position(|l| l.contains('市') || l.contains('區'))?;
    let parts: Vec<&str> = lines[start..]
        .iter()
        .take(ADDRESS_MERGE_LINES)
        .filter(|l| address_part_re().is_match(l))
        .copied()
        .collect();
    if parts.is_empty() { None } else { Some(parts.concat()) }
}

/// Pull fields out of OCR text. The tracking number is only looked for when asked.
pub fn parse_label_text(text: &str, include_tracking: bool) -> LabelFields {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let mut out = LabelFields::default();

    if include_tracking {
        out.tracking_number = lines.iter().find_map(|l| tracking_re().find(l)).map(|m| m.as_str().to_string());
    }

    for line in &lines {
        if out.name.is_none() {
            out.name = name_re().find(line).map(|m| m.as_str().to_string());
        }
        if line.contains(ADDRESS_MARKERS) {
            out.address = Some(line.to_string());
        }
        if let Some(q) = quantity_of(line) {
            out.quantity = Some(q);
        }
    }

    let short = out.address.as_ref().is_some_and(|a| a.chars().count() < ADDRESS_MIN_CHARS);
    if short && lines.len() > 2 {
        if let Some(merged) = merged_address(&lines) { out.address = Some(merged); }
    }
    out
}

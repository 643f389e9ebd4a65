use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use regex::Regex;

// Carrier pages print wall-clock time in Taiwan (UTC+08:00).
pub const CARRIER_UTC_OFFSET_SECS: i32 = 8 * 3600;

fn carrier_datetime_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{4})[/\-年](\d{1,2})[/\-月](\d{1,2})(?:日\s*|\s+)(\d{1,2}):(\d{2})(?::(\d{2}))?")
            .expect("carrier datetime regex")
    })
}

pub fn carrier_offset() -> FixedOffset {
    FixedOffset::east_opt(CARRIER_UTC_OFFSET_SECS).expect("UTC+8 is a valid offset")
}

// Parse "YYYY/M/D H:MM[:SS]" (carrier local time) into a UTC instant.
// Row cells may also use "YYYY-M-D" or "YYYY年M月D日".
// Returns None when the text does not match or the calendar/clock values are out of range.
pub fn parse_carrier_datetime(s: &str) -> Option<DateTime<Utc>> {
    let caps = carrier_datetime_re().captures(s)?;
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
    let date = NaiveDate::from_ymd_opt(year, num(2)?, num(3)?)?;
    let second = match caps.get(6) { Some(_) => num(6)?, None => 0 };
    let naive = date.and_hms_opt(num(4)?, num(5)?, second)?;

    carrier_offset()
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Normalize carrier time text, substituting `now` when it cannot be parsed.
pub fn normalize_or_now(s: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    parse_carrier_datetime(s).unwrap_or(now)
}

pub fn format_carrier_local(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&carrier_offset()).format("%Y/%m/%d %H:%M").to_string()
}

// Relative "time ago" label used next to the status badge.
pub fn format_relative(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let mins = (now - ts).num_minutes();
    if mins < 1 { return "剛剛".to_string(); }
    if mins < 60 { return format!("{} 分鐘前", mins); }
    let hours = mins / 60;
    if hours < 24 { return format!("{} 小時前", hours); }
    let days = hours / 24;
    if days < 7 { return format!("{} 天前", days); }
    ts.with_timezone(&carrier_offset()).format("%Y/%m/%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn parses_minutes_as_taiwan_time() {
        let ts = parse_carrier_datetime("2025/10/22 12:37").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-10-22T04:37:00+00:00");
    }

    #[test]
    fn parses_seconds_and_single_digit_fields() {
        let ts = parse_carrier_datetime("2025/3/5 8:05:09").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-03-05T00:05:09+00:00");
    }

    #[test]
    fn parses_dash_and_cjk_dates() {
        let slash = parse_carrier_datetime("2017/11/24 21:27").unwrap();
        assert_eq!(parse_carrier_datetime("2017-11-24 21:27"), Some(slash));
        assert_eq!(parse_carrier_datetime("2017年11月24日 21:27"), Some(slash));
        assert_eq!(parse_carrier_datetime("2017年11月24日21:27"), Some(slash));
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(parse_carrier_datetime("2025/13/40 99:99").is_none());
        assert!(parse_carrier_datetime("2025/02/30 10:00").is_none());
        assert!(parse_carrier_datetime("not a date").is_none());
    }

    #[test]
    fn normalize_falls_back_to_now() {
        let now = Utc::now();
        assert_eq!(normalize_or_now("2025/13/40 99:99", now), now);
    }

    #[test]
    fn relative_labels() {
        let now = parse_carrier_datetime("2025/10/22 12:00").unwrap();
        assert_eq!(format_relative(now, now), "剛剛");
        assert_eq!(format_relative(now - Duration::minutes(5), now), "5 分鐘前");
        assert_eq!(format_relative(now - Duration::hours(3), now), "3 小時前");
        assert_eq!(format_relative(now - Duration::days(2), now), "2 天前");
        assert_eq!(format_relative(now - Duration::days(30), now), "2025/09/22");
    }
}

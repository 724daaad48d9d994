// src/utils/time.rs

//! Timestamp parsing and KST helpers.
//!
//! All sources publish Korean local times. Values with `Z` or an explicit
//! offset are taken as-is; naive values are interpreted as KST (+09:00).

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};

const KST_OFFSET_SECS: i32 = 9 * 3600;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y.%m.%d", "%Y.%m.%d.", "%Y%m%d"];

/// The fixed Korea Standard Time offset.
pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Current time in KST.
pub fn now_kst() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&kst())
}

/// Parse an ISO-8601 timestamp or a plain date.
///
/// Returns `None` for empty or unrecognized input.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return naive.and_local_timezone(kst()).single();
        }
    }

    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date
                .and_hms_opt(0, 0, 0)
                .and_then(|naive| naive.and_local_timezone(kst()).single());
        }
    }

    None
}

/// Render a timestamp for a checkpoint marker, always in KST.
pub fn format_checkpoint(dt: &DateTime<FixedOffset>) -> String {
    dt.with_timezone(&kst()).to_rfc3339()
}

/// `MMDD` folder name for the KST date of `dt`.
pub fn date_folder(dt: &DateTime<FixedOffset>) -> String {
    dt.with_timezone(&kst()).format("%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_utc_and_offset() {
        let utc = parse_timestamp("2025-06-01T00:00:00.000Z").unwrap();
        let kst_dt = parse_timestamp("2025-06-01T09:00:00+09:00").unwrap();
        assert_eq!(utc, kst_dt);
    }

    #[test]
    fn test_naive_is_kst() {
        let naive = parse_timestamp("2025-05-15T12:00:00").unwrap();
        assert_eq!(naive.offset().local_minus_utc(), KST_OFFSET_SECS);
        assert_eq!(naive, parse_timestamp("2025-05-15T03:00:00Z").unwrap());
    }

    #[test]
    fn test_dotted_date() {
        let dt = parse_timestamp("2024.03.07").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-07T00:00:00+09:00");
        assert_eq!(parse_timestamp("2024.03.07."), Some(dt));
    }

    #[test]
    fn test_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_checkpoint_and_folder_use_kst() {
        let dt = parse_timestamp("2025-01-31T20:00:00Z").unwrap();
        assert_eq!(format_checkpoint(&dt), "2025-02-01T05:00:00+09:00");
        assert_eq!(date_folder(&dt), "0201");
    }
}

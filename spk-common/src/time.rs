//! Timestamp utilities
//!
//! Stage completion stamps and intake dates are carried as RFC 3339 strings
//! with millisecond precision (the shape the legacy data already uses).
//! Historical data also contains a handful of locale formats; `parse_flexible`
//! accepts those.

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};

/// Current UTC timestamp as an RFC 3339 string with millisecond precision.
pub fn now_iso() -> String {
    to_iso(Utc::now())
}

/// Format a timestamp as RFC 3339 with millisecond precision and `Z` suffix.
pub fn to_iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a date string in any of the historically observed formats.
///
/// Tries RFC 3339 first, then bare `YYYY-MM-DD`, then the legacy locale
/// forms `DD-MM-YYYY`, `DD/MM/YYYY` and `MM/DD/YYYY`. Bare dates are taken
/// as midnight UTC. Returns `None` for anything else.
pub fn parse_flexible(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            let naive = date.and_hms_opt(0, 0, 0)?;
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flexible_rfc3339() {
        let dt = parse_flexible("2024-01-01T00:00:00.000Z").unwrap();
        assert_eq!(to_iso(dt), "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_parse_flexible_bare_date() {
        let dt = parse_flexible("2024-03-05").unwrap();
        assert_eq!(to_iso(dt), "2024-03-05T00:00:00.000Z");
    }

    #[test]
    fn test_parse_flexible_dmy() {
        let dt = parse_flexible("05-03-2024").unwrap();
        assert_eq!(to_iso(dt), "2024-03-05T00:00:00.000Z");
        let dt = parse_flexible("05/03/2024").unwrap();
        assert_eq!(to_iso(dt), "2024-03-05T00:00:00.000Z");
    }

    #[test]
    fn test_parse_flexible_rejects_garbage() {
        assert!(parse_flexible("").is_none());
        assert!(parse_flexible("-").is_none());
        assert!(parse_flexible("next tuesday").is_none());
    }

    #[test]
    fn test_now_iso_shape() {
        let s = now_iso();
        assert!(s.ends_with('Z'));
        assert_eq!(s.len(), "2024-01-01T00:00:00.000Z".len());
    }
}

//! HL7 timestamp conversion
//!
//! HL7 v2 TS values are `yyyyMMddHHmmss` with optional fractional seconds and
//! offsets, frequently truncated to `yyyyMMdd`. These helpers normalize them
//! to the ISO renderings FHIR expects. Conversion failures yield `None`; the
//! mappers log and skip rather than fail a message over a bad date.

use chrono::NaiveDateTime;

/// Converts an HL7 TS to an ISO instant (`2024-01-01T12:00:00Z`).
///
/// Eight-digit (date-only) inputs are padded with `000000` before parsing.
/// Fractional seconds and offsets are ignored.
pub fn to_iso_datetime(ts: &str) -> Option<String> {
    let dt = parse_ts(ts)?;
    Some(dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

/// Converts an HL7 TS to an ISO date (`1980-01-01`).
pub fn to_iso_date(ts: &str) -> Option<String> {
    let dt = parse_ts(ts)?;
    Some(dt.format("%Y-%m-%d").to_string())
}

fn parse_ts(ts: &str) -> Option<NaiveDateTime> {
    let digits: String = ts.chars().take_while(|c| c.is_ascii_digit()).collect();
    let padded = match digits.len() {
        8 => format!("{digits}000000"),
        n if n >= 14 => digits[..14].to_string(),
        _ => return None,
    };
    NaiveDateTime::parse_from_str(&padded, "%Y%m%d%H%M%S").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_timestamp() {
        assert_eq!(
            to_iso_datetime("20240101120000").as_deref(),
            Some("2024-01-01T12:00:00Z")
        );
    }

    #[test]
    fn test_date_only_is_padded() {
        assert_eq!(
            to_iso_datetime("19800101").as_deref(),
            Some("1980-01-01T00:00:00Z")
        );
        assert_eq!(to_iso_date("19800101").as_deref(), Some("1980-01-01"));
    }

    #[test]
    fn test_fractional_seconds_and_offset_ignored() {
        assert_eq!(
            to_iso_datetime("20240101120000.0000+0100").as_deref(),
            Some("2024-01-01T12:00:00Z")
        );
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(to_iso_datetime(""), None);
        assert_eq!(to_iso_datetime("202401"), None);
        assert_eq!(to_iso_datetime("20241301120000"), None);
        assert_eq!(to_iso_date("notadate"), None);
    }
}

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{0}' is not a valid ISO-8601 timestamp")]
pub struct TimestampError(pub String);

/// Parses an export timestamp into UTC.
///
/// Accepts RFC 3339 strings with a `Z` marker or a numeric offset (the instant is preserved and expressed in UTC), as
/// well as offset-less `YYYY-MM-DDTHH:MM:SS[.fraction]` strings, which are taken to already be in UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, TimestampError> {
    let s = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| TimestampError(value.to_string()))
}

#[cfg(test)]
mod test {
    use chrono::Timelike;

    use super::*;

    #[test]
    fn utc_marker_is_zero_offset() {
        let with_z = parse_timestamp("2024-03-01T12:30:00Z").unwrap();
        let with_offset = parse_timestamp("2024-03-01T12:30:00+00:00").unwrap();
        assert_eq!(with_z, with_offset);
        assert_eq!(with_z.hour(), 12);
    }

    #[test]
    fn offsets_are_normalised_to_utc() {
        let dt = parse_timestamp("2024-03-01T14:30:00+02:00").unwrap();
        assert_eq!(dt, parse_timestamp("2024-03-01T12:30:00Z").unwrap());
    }

    #[test]
    fn naive_timestamps_are_taken_as_utc() {
        let dt = parse_timestamp("2024-03-01T12:30:00.250").unwrap();
        assert_eq!(dt.timestamp_subsec_millis(), 250);
        assert_eq!(parse_timestamp("2024-03-01 12:30:00").unwrap(), parse_timestamp("2024-03-01T12:30:00Z").unwrap());
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_timestamp("yesterday"), Err(TimestampError("yesterday".into())));
        assert!(parse_timestamp("2024-13-01T00:00:00Z").is_err());
        assert!(parse_timestamp("").is_err());
    }
}

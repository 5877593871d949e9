//! Timestamp handling at the two boundaries of the editing core.
//!
//! The core stores canonical `DateTime<Utc>` values. Strings only exist:
//! - on the wire, as ISO-8601 (`2024-06-01T10:00:00.000Z`), and
//! - in form inputs, as `datetime-local` values (`2024-06-01T12:00`) expressed
//!   in the user's UTC offset.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, SecondsFormat, TimeZone, Utc};

/// Format used by `<input type="datetime-local">`.
pub const DATETIME_LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Error returned when a timestamp string cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid ISO-8601 timestamp: '{0}'")]
    InvalidTimestamp(String),

    #[error("Invalid datetime-local value: '{0}'")]
    InvalidLocalValue(String),
}

/// Parse an ISO-8601 timestamp as sent by the gateway.
///
/// Accepts RFC 3339 (with or without seconds, `Z` or numeric offsets) and
/// naive timestamps, which are taken as UTC. A bare date maps to midnight UTC.
pub fn parse_iso8601(value: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TimeParseError::InvalidTimestamp(value.to_string()))
}

/// Render a timestamp the way the gateway expects it (millisecond precision, `Z`).
pub fn format_iso8601(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Convert a canonical timestamp into a `datetime-local` input value.
pub fn to_datetime_local(ts: &DateTime<Utc>, offset: &FixedOffset) -> String {
    ts.with_timezone(offset)
        .format(DATETIME_LOCAL_FORMAT)
        .to_string()
}

/// Convert a `datetime-local` input value (wall-clock time in `offset`) back
/// into a canonical timestamp.
pub fn from_datetime_local(
    value: &str,
    offset: &FixedOffset,
) -> Result<DateTime<Utc>, TimeParseError> {
    let trimmed = value.trim();
    let naive = NaiveDateTime::parse_from_str(trimmed, DATETIME_LOCAL_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|_| TimeParseError::InvalidLocalValue(value.to_string()))?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| TimeParseError::InvalidLocalValue(value.to_string()))
}

/// UTC offset of the machine running the client, for callers at the form boundary.
pub fn local_offset() -> FixedOffset {
    chrono::Local::now().offset().fix()
}

/// Serde adapters for optional ISO-8601 fields.
///
/// Missing, `null` and empty-string values all deserialize to `None`; web
/// forms post `''` for unset dates.
pub mod iso8601_option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&super::format_iso8601(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(s) if !s.trim().is_empty() => super::parse_iso8601(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_parse_rfc3339() {
        let ts = parse_iso8601("2024-06-01T10:00:00.000Z").unwrap();
        assert_eq!(ts, utc("2024-06-01T10:00:00Z"));
    }

    #[test]
    fn test_parse_without_seconds() {
        let ts = parse_iso8601("2024-06-01T10:00Z").unwrap();
        assert_eq!(ts, utc("2024-06-01T10:00:00Z"));

        let ts = parse_iso8601("2024-06-01T12:00+02:00").unwrap();
        assert_eq!(ts, utc("2024-06-01T10:00:00Z"));
    }

    #[test]
    fn test_parse_naive_is_utc() {
        let ts = parse_iso8601("2024-06-01T10:30:00").unwrap();
        assert_eq!(ts, utc("2024-06-01T10:30:00Z"));
    }

    #[test]
    fn test_parse_date_only() {
        let ts = parse_iso8601("2024-06-10").unwrap();
        assert_eq!(ts.hour(), 0);
        assert_eq!(ts, utc("2024-06-10T00:00:00Z"));
    }

    #[test]
    fn test_parse_garbage() {
        let err = parse_iso8601("next tuesday").unwrap_err();
        assert_eq!(err, TimeParseError::InvalidTimestamp("next tuesday".into()));
    }

    #[test]
    fn test_format_iso8601_millis() {
        assert_eq!(
            format_iso8601(&utc("2024-06-01T10:00:00Z")),
            "2024-06-01T10:00:00.000Z"
        );
    }

    #[test]
    fn test_datetime_local_uses_offset() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let ts = utc("2024-06-01T10:00:00Z");
        assert_eq!(to_datetime_local(&ts, &offset), "2024-06-01T13:00");
        assert_eq!(from_datetime_local("2024-06-01T13:00", &offset).unwrap(), ts);
    }

    #[test]
    fn test_datetime_local_rejects_iso_with_zone() {
        let offset = FixedOffset::east_opt(0).unwrap();
        assert!(from_datetime_local("2024-06-01T13:00Z", &offset).is_err());
        assert!(from_datetime_local("", &offset).is_err());
    }

    #[test]
    fn test_option_adapter_empty_string() {
        #[derive(serde::Deserialize, serde::Serialize)]
        struct Wrapper {
            #[serde(default, with = "iso8601_option")]
            at: Option<DateTime<Utc>>,
        }

        let w: Wrapper = serde_json::from_str(r#"{"at": ""}"#).unwrap();
        assert!(w.at.is_none());
        let w: Wrapper = serde_json::from_str(r#"{}"#).unwrap();
        assert!(w.at.is_none());
        let w: Wrapper = serde_json::from_str(r#"{"at": "2024-06-01T10:00Z"}"#).unwrap();
        assert_eq!(
            serde_json::to_string(&w).unwrap(),
            r#"{"at":"2024-06-01T10:00:00.000Z"}"#
        );
        assert!(serde_json::from_str::<Wrapper>(r#"{"at": "soon"}"#).is_err());
    }
}

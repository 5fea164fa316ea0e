//! Server JSON, live push payloads and range-picker bounds to `healthview_core` types.

pub mod socketio;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use healthview_core::{Accelerometer, FetchError, LiveMessage, Sample, ViewError, ViewWindow};
use serde_json::Value;

/// Local wall-clock formats accepted from the range picker.
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse the historical response body (a JSON array of records).
pub fn parse_history_str(body: &str) -> Result<Vec<Sample>, FetchError> {
    let value: Value =
        serde_json::from_str(body).map_err(|err| FetchError::Parse(err.to_string()))?;
    parse_history_value(&value)
}

/// Parse the historical payload. One defective record rejects the whole load.
pub fn parse_history_value(value: &Value) -> Result<Vec<Sample>, FetchError> {
    let records = value
        .as_array()
        .ok_or_else(|| FetchError::Parse(format!("Expected a JSON array, received {}", kind(value))))?;

    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            decode_record(record).map_err(|defect| match defect {
                RecordDefect::MissingHealthData => FetchError::MissingHealthData { index },
                other => FetchError::Parse(format!("record {index}: {other}")),
            })
        })
        .collect()
}

/// Decode one live event payload. Anything without the nested health payload is `Malformed`.
pub fn decode_live_value(value: &Value) -> LiveMessage {
    match decode_record(value) {
        Ok(sample) => LiveMessage::Sample(sample),
        Err(defect) => LiveMessage::Malformed(defect.to_string()),
    }
}

pub fn decode_live_str(text: &str) -> LiveMessage {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => decode_live_value(&value),
        Err(err) => LiveMessage::Malformed(format!("invalid JSON: {err}")),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum RecordDefect {
    NotAnObject,
    MissingHealthData,
    MissingField(&'static str),
    BadTimestamp(String),
}

impl std::fmt::Display for RecordDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordDefect::NotAnObject => write!(f, "record is not an object"),
            RecordDefect::MissingHealthData => write!(f, "missing HealthData"),
            RecordDefect::MissingField(field) => write!(f, "missing {field}"),
            RecordDefect::BadTimestamp(text) => write!(f, "unreadable DateTime {text:?}"),
        }
    }
}

fn decode_record(record: &Value) -> Result<Sample, RecordDefect> {
    if !record.is_object() {
        return Err(RecordDefect::NotAnObject);
    }

    let health = record
        .get("HealthData")
        .filter(|value| value.is_object())
        .ok_or(RecordDefect::MissingHealthData)?;

    let raw_time = record
        .get("DateTime")
        .and_then(Value::as_str)
        .ok_or(RecordDefect::MissingField("DateTime"))?;
    let timestamp =
        parse_instant(raw_time).ok_or_else(|| RecordDefect::BadTimestamp(raw_time.to_string()))?;

    let heart_rate = number_field(health, "HeartRate")?;
    let oxygen_level = number_field(health, "OxygenLevel")?;

    let motion = health
        .get("AccelerometerData")
        .filter(|value| value.is_object())
        .ok_or(RecordDefect::MissingField("AccelerometerData"))?;
    let accelerometer = Accelerometer {
        ax: number_field(motion, "Ax")?,
        ay: number_field(motion, "Ay")?,
        az: number_field(motion, "Az")?,
    };

    Ok(Sample::new(timestamp, heart_rate, oxygen_level, accelerometer))
}

fn number_field(object: &Value, field: &'static str) -> Result<f64, RecordDefect> {
    object
        .get(field)
        .and_then(|value| {
            value
                .as_f64()
                .or_else(|| value.as_str().and_then(|text| text.trim().parse().ok()))
        })
        .ok_or(RecordDefect::MissingField(field))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// RFC 3339 instant; a timestamp without offset is read as UTC.
pub fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

/// Parse one range-picker bound (`YYYY-MM-DD HH:mm:ss`, local wall clock).
pub fn parse_local_bound(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
}

/// Parse `Z`, `+07:00`, `-0530` or `+7` into a fixed offset.
pub fn parse_utc_offset(text: &str) -> Option<FixedOffset> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("z") || text.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    if !rest.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return None;
    }
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Convert a committed picker range to a UTC window.
pub fn parse_range(start: &str, end: &str, offset: FixedOffset) -> Result<ViewWindow, ViewError> {
    let start_local = parse_local_bound(start)
        .ok_or_else(|| ViewError::Range(format!("unreadable range start {start:?}")))?;
    let end_local = parse_local_bound(end)
        .ok_or_else(|| ViewError::Range(format!("unreadable range end {end:?}")))?;
    ViewWindow::from_local(start_local, end_local, offset)
        .ok_or_else(|| ViewError::Range(format!("range {start:?}..{end:?} is not representable")))
}

/// The picker's whole-day range (`YYYY-MM-DD`, 00:00:00.000 to 23:59:59.999 local).
pub fn parse_day(day: &str, offset: FixedOffset) -> Result<ViewWindow, ViewError> {
    let date = NaiveDate::parse_from_str(day.trim(), "%Y-%m-%d")
        .map_err(|err| ViewError::Range(format!("unreadable day {day:?}: {err}")))?;
    ViewWindow::local_day(date, offset)
        .ok_or_else(|| ViewError::Range(format!("day {day:?} is not representable")))
}

#[cfg(test)]
mod tests {
    use healthview_core::format_instant;

    use super::*;

    #[test]
    fn offsets_in_common_spellings() {
        assert_eq!(parse_utc_offset("Z"), FixedOffset::east_opt(0));
        assert_eq!(parse_utc_offset("+07:00"), FixedOffset::east_opt(7 * 3600));
        assert_eq!(parse_utc_offset("-0530"), FixedOffset::west_opt(5 * 3600 + 1800));
        assert_eq!(parse_utc_offset("+7"), FixedOffset::east_opt(7 * 3600));
        assert_eq!(parse_utc_offset("07:00"), None);
        assert_eq!(parse_utc_offset("+25:00"), None);
    }

    #[test]
    fn whole_day_in_local_time() {
        let offset = parse_utc_offset("+07:00").expect("offset hợp lệ");
        let window = parse_day("2024-01-01", offset).expect("ngày hợp lệ");
        assert_eq!(format_instant(window.start), "2023-12-31T17:00:00.000Z");
        assert_eq!(format_instant(window.end), "2024-01-01T16:59:59.999Z");
        assert!(matches!(parse_day("01/01/2024", offset), Err(ViewError::Range(_))));
    }

    #[test]
    fn offsets_with_foreign_characters_are_rejected() {
        assert_eq!(parse_utc_offset("+€1"), None);
        assert_eq!(parse_utc_offset("-€"), None);
        assert_eq!(parse_utc_offset("+-5"), None);
        assert_eq!(parse_utc_offset("+07:3x"), None);
    }

    #[test]
    fn instant_without_offset_is_utc() {
        let instant = parse_instant("2024-01-01T10:00:00").expect("parsed");
        assert_eq!(healthview_core::format_instant(instant), "2024-01-01T10:00:00.000Z");
        assert!(parse_instant("yesterday").is_none());
    }

    #[test]
    fn numeric_strings_count_as_present() {
        let record = serde_json::json!({
            "DateTime": "2024-01-01T10:00:00Z",
            "HealthData": {
                "HeartRate": "72",
                "OxygenLevel": 97.5,
                "AccelerometerData": { "Ax": 0, "Ay": 0, "Az": 1 }
            }
        });
        let sample = decode_record(&record).expect("decoded");
        assert_eq!(sample.heart_rate, 72.0);
    }
}

//! Date and duration field transforms.

use crate::error::TransformError;
use crate::transform::{leading_integer, require_key};
use crate::value::{Record, Value};

/// Truncates an ISO-8601 timestamp to its `YYYY-MM-DD` prefix.
pub fn datetime_to_date(record: &mut Record, key: &str) -> Result<(), TransformError> {
    let Value::Str(text) = require_key(record, key)? else {
        return Err(TransformError::InvalidDate(key.to_string()));
    };
    if text.chars().count() < 10 {
        return Err(TransformError::InvalidDate(key.to_string()));
    }
    let date: String = text.chars().take(10).collect();
    record.insert(key.to_string(), Value::Str(date));
    Ok(())
}

/// Integer seconds to `"HH:MM"`; leftover seconds are dropped.
pub fn duration_to_string(record: &mut Record, key: &str) -> Result<(), TransformError> {
    let seconds = match require_key(record, key)? {
        Value::Int(seconds) => *seconds,
        _ => return Err(TransformError::InvalidDuration(key.to_string())),
    };
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    record.insert(
        key.to_string(),
        Value::Str(format!("{hours:02}:{minutes:02}")),
    );
    Ok(())
}

/// `"HH:MM"` to integer seconds.
pub fn duration_to_integer(record: &mut Record, key: &str) -> Result<(), TransformError> {
    let Value::Str(text) = require_key(record, key)? else {
        return Err(TransformError::InvalidDuration(key.to_string()));
    };
    let parts: Vec<&str> = text.split(':').collect();
    let [hours, minutes] = parts.as_slice() else {
        return Err(TransformError::InvalidDuration(key.to_string()));
    };
    let seconds = leading_integer(hours) * 3600 + leading_integer(minutes) * 60;
    record.insert(key.to_string(), Value::Int(seconds));
    Ok(())
}

/// Collapses a Europass date fragment (`{"@year", "@month", "@day"}`) into
/// `YYYY-MM-DD`. Missing parts default to `0000`, `01` and `01`; leading
/// sign characters are stripped.
pub fn convert_europass_date(record: &mut Record, key: &str) -> Result<(), TransformError> {
    let Value::Map(parts) = require_key(record, key)? else {
        return Err(TransformError::InvalidDate(key.to_string()));
    };
    let part = |name: &str, default: &str| -> String {
        parts
            .get(name)
            .and_then(Value::to_text)
            .map(|text| text.trim_start_matches(['-', '+']).to_string())
            .unwrap_or_else(|| default.to_string())
    };
    let date = format!(
        "{}-{}-{}",
        part("@year", "0000"),
        part("@month", "01"),
        part("@day", "01")
    );
    record.insert(key.to_string(), Value::Str(date));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    #[test]
    fn datetime_to_date_truncates() {
        let mut item = record! { "d" => "2020-05-17T10:30:00+02:00" };
        datetime_to_date(&mut item, "d").unwrap();
        assert_eq!(item["d"], Value::from("2020-05-17"));
    }

    #[test]
    fn datetime_to_date_rejects_short_input() {
        let mut item = record! { "d" => "2020" };
        assert_eq!(
            datetime_to_date(&mut item, "d"),
            Err(TransformError::InvalidDate("d".into()))
        );
    }

    #[test]
    fn datetime_to_date_preconditions() {
        let mut empty = Record::new();
        assert_eq!(
            datetime_to_date(&mut empty, "d"),
            Err(TransformError::EmptyObject)
        );
        let mut item = record! { "d" => "2020-05-17" };
        assert_eq!(datetime_to_date(&mut item, ""), Err(TransformError::EmptyKey));
        assert_eq!(
            datetime_to_date(&mut item, "x"),
            Err(TransformError::PropertyNotFound("x".into()))
        );
    }

    #[test]
    fn duration_roundtrip() {
        let mut item = record! { "duration" => 3900 };
        duration_to_string(&mut item, "duration").unwrap();
        assert_eq!(item["duration"], Value::from("01:05"));
        duration_to_integer(&mut item, "duration").unwrap();
        assert_eq!(item["duration"], Value::Int(3900));
    }

    #[test]
    fn duration_to_string_drops_seconds() {
        let mut item = record! { "duration" => 3959 };
        duration_to_string(&mut item, "duration").unwrap();
        assert_eq!(item["duration"], Value::from("01:05"));

        let mut item = record! { "duration" => 40 * 3600 };
        duration_to_string(&mut item, "duration").unwrap();
        assert_eq!(item["duration"], Value::from("40:00"));
    }

    #[test]
    fn duration_to_string_keeps_sign_of_negative_values() {
        let mut item = record! { "duration" => -3900 };
        duration_to_string(&mut item, "duration").unwrap();
        assert_eq!(item["duration"], Value::from("-1:-5"));
    }

    #[test]
    fn duration_to_string_requires_integer() {
        let mut item = record! { "duration" => "3900" };
        assert_eq!(
            duration_to_string(&mut item, "duration"),
            Err(TransformError::InvalidDuration("duration".into()))
        );
    }

    #[test]
    fn duration_to_integer_requires_two_components() {
        for input in ["3900", "01:05:00", ""] {
            let mut item = record! { "duration" => input };
            assert_eq!(
                duration_to_integer(&mut item, "duration"),
                Err(TransformError::InvalidDuration("duration".into())),
                "input {input:?}"
            );
        }
    }

    #[test]
    fn europass_date_defaults_and_signs() {
        let mut item = record! {
            "date" => record! { "@year" => "-2015", "@month" => "--07" }
        };
        convert_europass_date(&mut item, "date").unwrap();
        assert_eq!(item["date"], Value::from("2015-07-01"));

        let mut item = record! { "date" => record! { "@day" => "9" } };
        convert_europass_date(&mut item, "date").unwrap();
        assert_eq!(item["date"], Value::from("0000-01-9"));
    }

    #[test]
    fn europass_date_requires_mapping() {
        let mut item = record! { "date" => "2015-07-01" };
        assert_eq!(
            convert_europass_date(&mut item, "date"),
            Err(TransformError::InvalidDate("date".into()))
        );
    }
}

//! Field transforms between the flat file representation and the structured
//! store representation of a record.
//!
//! Every keyed transform validates its preconditions before touching the
//! record, so a failed call leaves the record exactly as it was. Only the
//! target field is ever rewritten.

use crate::config::LINE_BREAK_ESCAPE;
use crate::error::TransformError;
use crate::value::{Record, Value};

/// Checks the record/key preconditions shared by every keyed transform.
pub(crate) fn require_key<'a>(record: &'a Record, key: &str) -> Result<&'a Value, TransformError> {
    if record.is_empty() {
        return Err(TransformError::EmptyObject);
    }
    if key.is_empty() {
        return Err(TransformError::EmptyKey);
    }
    record
        .get(key)
        .ok_or_else(|| TransformError::PropertyNotFound(key.to_string()))
}

/// Like [`require_key`], with a non-empty sub-property name checked before key presence.
pub(crate) fn require_key_and_property<'a>(
    record: &'a Record,
    key: &str,
    property: &str,
) -> Result<&'a Value, TransformError> {
    if record.is_empty() {
        return Err(TransformError::EmptyObject);
    }
    if key.is_empty() {
        return Err(TransformError::EmptyKey);
    }
    if property.is_empty() {
        return Err(TransformError::EmptyProperty);
    }
    record
        .get(key)
        .ok_or_else(|| TransformError::PropertyNotFound(key.to_string()))
}

fn require_str<'a>(value: &'a Value, key: &str) -> Result<&'a str, TransformError> {
    value
        .as_str()
        .ok_or_else(|| TransformError::InvalidItem(key.to_string()))
}

/// Strips every field whose value is null, an empty string or an empty collection.
pub fn remove_null_fields(record: &mut Record) {
    record.retain(|_, value| !value.is_absent());
}

pub fn escape_line_breaks(record: &mut Record, key: &str) -> Result<(), TransformError> {
    let text = require_str(require_key(record, key)?, key)?;
    let escaped = text.replace('\n', LINE_BREAK_ESCAPE);
    record.insert(key.to_string(), Value::Str(escaped));
    Ok(())
}

pub fn unescape_line_breaks(record: &mut Record, key: &str) -> Result<(), TransformError> {
    let text = require_str(require_key(record, key)?, key)?;
    let unescaped = text.replace(LINE_BREAK_ESCAPE, "\n");
    record.insert(key.to_string(), Value::Str(unescaped));
    Ok(())
}

/// Sorts a sequence field in place using [`Value::natural_cmp`].
pub fn sort_array(record: &mut Record, key: &str) -> Result<(), TransformError> {
    require_key(record, key)?;
    match record.get_mut(key) {
        Some(Value::Seq(items)) => {
            items.sort_by(Value::natural_cmp);
            Ok(())
        }
        _ => Err(TransformError::InvalidItem(key.to_string())),
    }
}

/// Reads the leading integer of a string the lenient way: surrounding
/// whitespace is ignored, parsing stops at the first non-digit, and text
/// without leading digits reads as zero.
pub(crate) fn leading_integer(text: &str) -> i64 {
    let text = text.trim();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let magnitude = digits[..end].parse::<i64>().unwrap_or(0);
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

pub fn string_to_integer(record: &mut Record, key: &str) -> Result<(), TransformError> {
    let parsed = match require_key(record, key)? {
        Value::Int(i) => *i,
        Value::Str(s) => leading_integer(s),
        Value::Bool(b) => i64::from(*b),
        Value::Null => 0,
        Value::Seq(_) | Value::Map(_) => return Err(TransformError::InvalidItem(key.to_string())),
    };
    record.insert(key.to_string(), Value::Int(parsed));
    Ok(())
}

/// Only the literal string `"true"` reads as true. Any other text, including
/// malformed input, reads as false without an error. Booleans pass through.
pub fn string_to_boolean(record: &mut Record, key: &str) -> Result<(), TransformError> {
    let parsed = match require_key(record, key)? {
        Value::Bool(b) => *b,
        Value::Str(s) => s == "true",
        _ => false,
    };
    record.insert(key.to_string(), Value::Bool(parsed));
    Ok(())
}

pub fn string_to_array(record: &mut Record, key: &str) -> Result<(), TransformError> {
    let text = require_str(require_key(record, key)?, key)?;
    let items = text
        .split(',')
        .map(|item| Value::Str(item.trim().to_string()))
        .collect();
    record.insert(key.to_string(), Value::Seq(items));
    Ok(())
}

pub fn array_to_string(record: &mut Record, key: &str) -> Result<(), TransformError> {
    let Value::Seq(items) = require_key(record, key)? else {
        return Err(TransformError::InvalidItem(key.to_string()));
    };
    let parts = items
        .iter()
        .map(|item| match item {
            Value::Null => Ok(String::new()),
            other => other
                .to_text()
                .map(|text| text.trim().to_string())
                .ok_or_else(|| TransformError::InvalidItem(key.to_string())),
        })
        .collect::<Result<Vec<_>, _>>()?;
    record.insert(key.to_string(), Value::Str(parts.join(", ")));
    Ok(())
}

/// Wraps the field value into a single-key mapping `{property: value}`.
pub fn string_to_associative_array(
    record: &mut Record,
    key: &str,
    property: &str,
) -> Result<(), TransformError> {
    let value = require_key_and_property(record, key, property)?.clone();
    let mut wrapped = Record::new();
    wrapped.insert(property.to_string(), value);
    record.insert(key.to_string(), Value::Map(wrapped));
    Ok(())
}

/// Replaces a mapping field with its `property` entry (null when the entry is missing).
pub fn associative_array_to_string(
    record: &mut Record,
    key: &str,
    property: &str,
) -> Result<(), TransformError> {
    let Value::Map(fields) = require_key_and_property(record, key, property)? else {
        return Err(TransformError::InvalidItem(key.to_string()));
    };
    let inner = fields.get(property).cloned().unwrap_or(Value::Null);
    record.insert(key.to_string(), inner);
    Ok(())
}

/// Splits a comma-separated field into `[{property: item}, ...]`.
pub fn string_to_collection(
    record: &mut Record,
    key: &str,
    property: &str,
) -> Result<(), TransformError> {
    let text = require_str(require_key_and_property(record, key, property)?, key)?;
    let items = text
        .split(',')
        .map(|item| {
            let mut fragment = Record::new();
            fragment.insert(property.to_string(), Value::Str(item.trim().to_string()));
            Value::Map(fragment)
        })
        .collect();
    record.insert(key.to_string(), Value::Seq(items));
    Ok(())
}

/// Joins the `property` entry of every mapping in a sequence field with `", "`.
pub fn collection_to_string(
    record: &mut Record,
    key: &str,
    property: &str,
) -> Result<(), TransformError> {
    let Value::Seq(items) = require_key_and_property(record, key, property)? else {
        return Err(TransformError::InvalidItem(key.to_string()));
    };
    let parts = items
        .iter()
        .map(|item| match item {
            Value::Map(fields) => Ok(fields
                .get(property)
                .and_then(Value::to_text)
                .map(|text| text.trim().to_string())
                .unwrap_or_default()),
            _ => Err(TransformError::InvalidItem(key.to_string())),
        })
        .collect::<Result<Vec<_>, _>>()?;
    record.insert(key.to_string(), Value::Str(parts.join(", ")));
    Ok(())
}

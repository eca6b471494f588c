//! Raw tabular (CSV) and document (JSON) codecs.
//!
//! These know nothing about entities: they turn bytes into flat records and
//! back. Nested values survive CSV by flattening to dotted column names
//! (`partOfEpisode.episodeNumber`, `tags.0`) and unflattening on read.

use crate::error::CodecError;
use crate::value::{Record, Value};
use csv::{ReaderBuilder, Writer};
use rustc_hash::FxHashSet;
use std::str::FromStr;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Json,
}

impl FileFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Json => "json",
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "csv" => Some(FileFormat::Csv),
            "json" => Some(FileFormat::Json),
            _ => None,
        }
    }

    pub fn decode(self, data: &[u8]) -> Result<Vec<Record>, CodecError> {
        match self {
            FileFormat::Csv => decode_csv(data),
            FileFormat::Json => decode_json(data),
        }
    }

    pub fn encode(self, records: &[Record]) -> Result<String, CodecError> {
        match self {
            FileFormat::Csv => encode_csv(records),
            FileFormat::Json => encode_json(records),
        }
    }
}

impl FromStr for FileFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| CodecError::UnsupportedFormat(s.to_string()))
    }
}

pub fn decode_csv(data: &[u8]) -> Result<Vec<Record>, CodecError> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(data);
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result?;
        let flat: Vec<(&str, &str)> = headers.iter().zip(row.iter()).collect();
        records.push(unflatten(flat));
    }
    Ok(records)
}

pub fn encode_csv(records: &[Record]) -> Result<String, CodecError> {
    let rows: Vec<Vec<(String, String)>> = records
        .iter()
        .map(|record| {
            let mut cells = Vec::new();
            for (key, value) in record {
                flatten_into(key.clone(), value, &mut cells);
            }
            cells
        })
        .collect();

    // Header is the union of every row's columns, first seen first
    let mut seen = FxHashSet::default();
    let mut header: Vec<&str> = Vec::new();
    for cells in &rows {
        for (column, _) in cells {
            if seen.insert(column.as_str()) {
                header.push(column);
            }
        }
    }
    if header.is_empty() {
        return Ok(String::new());
    }

    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(&header)?;
    for cells in &rows {
        let line = header.iter().map(|column| {
            cells
                .iter()
                .find(|(name, _)| name.as_str() == *column)
                .map_or("", |(_, text)| text.as_str())
        });
        writer.write_record(line)?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

pub fn decode_json(data: &[u8]) -> Result<Vec<Record>, CodecError> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let document: serde_json::Value = serde_json::from_slice(data)?;
    match Value::from(document) {
        Value::Seq(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Map(fields) => Ok(fields),
                other => Err(CodecError::InvalidRoot(format!(
                    "an array containing a {}",
                    other.type_name()
                ))),
            })
            .collect(),
        Value::Map(fields) => Ok(vec![fields]),
        other => Err(CodecError::InvalidRoot(other.type_name().to_string())),
    }
}

pub fn encode_json(records: &[Record]) -> Result<String, CodecError> {
    let document = serde_json::Value::from(Value::Seq(
        records.iter().cloned().map(Value::Map).collect(),
    ));
    Ok(serde_json::to_string_pretty(&document)?)
}

fn flatten_into(prefix: String, value: &Value, cells: &mut Vec<(String, String)>) {
    match value {
        Value::Map(fields) => {
            for (key, inner) in fields {
                flatten_into(format!("{prefix}.{key}"), inner, cells);
            }
        }
        Value::Seq(items) => {
            for (index, inner) in items.iter().enumerate() {
                flatten_into(format!("{prefix}.{index}"), inner, cells);
            }
        }
        Value::Null => cells.push((prefix, String::new())),
        scalar => cells.push((prefix, scalar.to_text().unwrap_or_default())),
    }
}

fn unflatten<'a>(cells: impl IntoIterator<Item = (&'a str, &'a str)>) -> Record {
    let mut record = Record::new();
    for (column, text) in cells {
        let path: Vec<&str> = column.split('.').collect();
        insert_path(&mut record, &path, Value::Str(text.to_string()));
    }
    for value in record.values_mut() {
        sequences_from_indexes(value);
    }
    record
}

fn insert_path(record: &mut Record, path: &[&str], value: Value) {
    match path {
        [] => {}
        [last] => {
            record.insert(last.to_string(), value);
        }
        [head, rest @ ..] => {
            let slot = record
                .entry(head.to_string())
                .or_insert_with(|| Value::Map(Record::new()));
            if !matches!(slot, Value::Map(_)) {
                *slot = Value::Map(Record::new());
            }
            if let Value::Map(inner) = slot {
                insert_path(inner, rest, value);
            }
        }
    }
}

/// Turns mappings whose keys are all array indexes back into sequences.
fn sequences_from_indexes(value: &mut Value) {
    let Value::Map(fields) = value else {
        return;
    };
    for inner in fields.values_mut() {
        sequences_from_indexes(inner);
    }
    if fields.is_empty() || !fields.keys().all(|k| k.parse::<usize>().is_ok()) {
        return;
    }
    let mut indexed: Vec<(usize, Value)> = std::mem::take(fields)
        .into_iter()
        .filter_map(|(k, v)| k.parse().ok().map(|i| (i, v)))
        .collect();
    indexed.sort_by_key(|(i, _)| *i);
    *value = Value::Seq(indexed.into_iter().map(|(_, v)| v).collect());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    #[test]
    fn csv_flattens_nested_values() {
        let records = vec![
            record! {
                "name" => "c",
                "autoplay" => true,
                "partOfEpisode" => record! { "episodeNumber" => "S01E01" },
            },
            record! { "name" => "d", "tags" => vec!["a", "b"] },
        ];
        let text = encode_csv(&records).unwrap();
        assert_eq!(
            text,
            "name,autoplay,partOfEpisode.episodeNumber,tags.0,tags.1\n\
             c,true,S01E01,,\n\
             d,,,a,b\n"
        );
    }

    #[test]
    fn csv_unflattens_dotted_headers() {
        let data = "name,partOfEpisode.episodeNumber,tags.1,tags.0\nc,S01E01,b,a\n";
        let records = decode_csv(data.as_bytes()).unwrap();
        assert_eq!(
            records,
            vec![record! {
                "name" => "c",
                "partOfEpisode" => record! { "episodeNumber" => "S01E01" },
                "tags" => vec!["a", "b"],
            }]
        );
    }

    #[test]
    fn csv_strips_bom_and_keeps_quoted_commas() {
        let data = "\u{FEFF}name,characters\n\"Pilot, part 1\",\"john, jane\"\n";
        let records = decode_csv(data.as_bytes()).unwrap();
        assert_eq!(records[0]["name"], Value::from("Pilot, part 1"));
        assert_eq!(records[0]["characters"], Value::from("john, jane"));
    }

    #[test]
    fn csv_tolerates_short_rows() {
        let records = decode_csv(b"name,alternateName\nJohn Doe\n").unwrap();
        assert_eq!(records, vec![record! { "name" => "John Doe" }]);
    }

    #[test]
    fn csv_of_nothing_is_empty() {
        assert_eq!(encode_csv(&[]).unwrap(), "");
    }

    #[test]
    fn json_accepts_array_or_single_object() {
        let records = decode_json(br#"[{"name": "a"}, {"name": "b", "n": 2}]"#).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["n"], Value::Int(2));

        let records = decode_json(br#"{"name": "a"}"#).unwrap();
        assert_eq!(records, vec![record! { "name" => "a" }]);
    }

    #[test]
    fn json_rejects_other_roots() {
        assert!(matches!(
            decode_json(b"42"),
            Err(CodecError::InvalidRoot(_))
        ));
        assert!(matches!(
            decode_json(b"[1, 2]"),
            Err(CodecError::InvalidRoot(_))
        ));
        assert!(matches!(decode_json(b"{"), Err(CodecError::Json(_))));
    }

    #[test]
    fn json_output_is_pretty_and_ordered() {
        let text = encode_json(&[record! { "zeta" => 1, "alpha" => "x" }]).unwrap();
        assert_eq!(text, "[\n  {\n    \"zeta\": 1,\n    \"alpha\": \"x\"\n  }\n]");
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(FileFormat::from_extension("CSV"), Some(FileFormat::Csv));
        assert_eq!("json".parse::<FileFormat>().unwrap(), FileFormat::Json);
        assert!(matches!(
            "xml".parse::<FileFormat>(),
            Err(CodecError::UnsupportedFormat(f)) if f == "xml"
        ));
    }
}

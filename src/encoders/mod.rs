//! Per-(entity, format) encoders and the serializer that dispatches to them.
//!
//! An encoder owns the ordered list of field transforms that turn a
//! normalized record into a file row (`transform_for_export`) and a file row
//! back into a record with resolved references (`transform_for_import`).
//! Every step is best-effort: a failing step is logged and the record moves
//! on to the next step unchanged.

mod clip;
mod referenced;

pub use clip::{ClipCsvEncoder, ClipJsonEncoder};
pub use referenced::{ReferencedEncoder, ReferencedKind};

use crate::codec::FileFormat;
use crate::error::{CodecError, TransformError};
use crate::schema::EntityKind;
use crate::store::EntityStore;
use crate::value::Record;
use tracing::{debug, warn};

pub trait RecordEncoder {
    /// Registered format identifier, e.g. `clip:csv`.
    fn format(&self) -> &'static str;

    fn kind(&self) -> EntityKind;

    fn file_format(&self) -> FileFormat;

    fn supports_encoding(&self, format: &str) -> bool {
        format == self.format()
    }

    fn supports_decoding(&self, format: &str) -> bool {
        format == self.format()
    }

    fn transform_for_export(&self, record: Record) -> Record;

    fn transform_for_import(&self, record: Record, store: &mut dyn EntityStore) -> Record;
}

/// Runs one best-effort step. Missing optional fields are routine and only
/// logged at debug; anything else is a warning.
pub(crate) fn attempt(step: &str, key: &str, result: Result<(), TransformError>) {
    match result {
        Ok(()) => {}
        Err(e @ TransformError::PropertyNotFound(_)) => {
            debug!(step, field = key, error = %e, "Skipping transform")
        }
        Err(e) => warn!(step, field = key, error = %e, "Transform failed, keeping field as is"),
    }
}

/// Picks the encoder registered for a format and runs the raw codec around it.
pub struct Serializer {
    encoders: Vec<Box<dyn RecordEncoder>>,
}

impl Default for Serializer {
    fn default() -> Self {
        Self {
            encoders: vec![
                Box::new(ClipCsvEncoder::default()),
                Box::new(ClipJsonEncoder::default()),
                Box::new(ReferencedEncoder::new(ReferencedKind::Episode, FileFormat::Csv)),
                Box::new(ReferencedEncoder::new(ReferencedKind::Episode, FileFormat::Json)),
                Box::new(ReferencedEncoder::new(ReferencedKind::Person, FileFormat::Csv)),
                Box::new(ReferencedEncoder::new(ReferencedKind::Person, FileFormat::Json)),
                Box::new(ReferencedEncoder::new(ReferencedKind::Tag, FileFormat::Csv)),
                Box::new(ReferencedEncoder::new(ReferencedKind::Tag, FileFormat::Json)),
            ],
        }
    }
}

impl Serializer {
    pub fn formats(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.encoders.iter().map(|encoder| encoder.format())
    }

    pub fn encoder(&self, format: &str) -> Option<&dyn RecordEncoder> {
        self.encoders
            .iter()
            .find(|encoder| encoder.supports_encoding(format))
            .map(Box::as_ref)
    }

    pub fn decoder(&self, format: &str) -> Option<&dyn RecordEncoder> {
        self.encoders
            .iter()
            .find(|encoder| encoder.supports_decoding(format))
            .map(Box::as_ref)
    }

    /// Encodes records with the encoder registered for `format`. Bare `csv`
    /// and `json` write the records as they are.
    pub fn encode(&self, records: Vec<Record>, format: &str) -> Result<String, CodecError> {
        if let Some(encoder) = self.encoder(format) {
            let rows: Vec<Record> = records
                .into_iter()
                .map(|record| encoder.transform_for_export(record))
                .collect();
            return encoder.file_format().encode(&rows);
        }
        raw_format(format)?.encode(&records)
    }

    /// Decodes file contents into records ready for denormalization,
    /// resolving relationships against `store` as it goes.
    pub fn decode(
        &self,
        data: &[u8],
        format: &str,
        store: &mut dyn EntityStore,
    ) -> Result<Vec<Record>, CodecError> {
        if let Some(decoder) = self.decoder(format) {
            let rows = decoder.file_format().decode(data)?;
            return Ok(rows
                .into_iter()
                .map(|row| decoder.transform_for_import(row, store))
                .collect());
        }
        raw_format(format)?.decode(data)
    }
}

fn raw_format(format: &str) -> Result<FileFormat, CodecError> {
    match format {
        "csv" => Ok(FileFormat::Csv),
        "json" => Ok(FileFormat::Json),
        other => Err(CodecError::UnsupportedFormat(other.to_string())),
    }
}

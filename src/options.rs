//! Option inference for the export, import and update runs.
//!
//! Callers supply whatever subset of class name, encoder, directory and file
//! name they have; the rest is filled in by naming convention:
//!
//! - an encoder reads `<entity-token>:<extension>` or just `<entity-token>`
//! - a missing class comes from the encoder's entity token, or (import and
//!   update) from the singularized file base name
//! - a missing encoder (import and update) becomes `<table>:<extension>`
//! - export writes to `<pluralized table>.<extension>`

use crate::config::{
    DEFAULT_EXPORT_DIR, DEFAULT_FORMAT, DEFAULT_GROUP, DEFAULT_IMPORT_DIR,
    DEFAULT_UNIQUE_PROPERTY,
};
use crate::error::OptionError;
use crate::inflector::{classify, pluralize, singularize, tableize};
use crate::schema::EntityKind;
use std::path::PathBuf;

pub type OptionTable = Vec<(&'static str, String)>;

/// Empty strings count as not supplied.
fn supplied(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn shown(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Entity token of an encoder: `person:csv` → `person`.
fn encoder_token(encoder: &str) -> &str {
    encoder.split_once(':').map_or(encoder, |(token, _)| token)
}

/// Extension carried by an encoder. Bare `csv`/`json` are their own extension.
fn encoder_extension(encoder: &str) -> Option<&str> {
    match encoder.split_once(':') {
        Some((_, extension)) if !extension.is_empty() => Some(extension),
        Some(_) => None,
        None if matches!(encoder, "csv" | "json") => Some(encoder),
        None => None,
    }
}

fn lookup(class_name: &str) -> Result<EntityKind, OptionError> {
    EntityKind::from_class_name(class_name)
        .ok_or_else(|| OptionError::EntityNotFound(class_name.to_string()))
}

/// Aligns option rows into two columns.
pub fn render_table(rows: &[(&str, String)]) -> String {
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    rows.iter()
        .map(|(label, value)| format!(" {label:<width$}   {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub class_name: Option<String>,
    pub encoder: Option<String>,
    pub group: Option<String>,
    pub directory: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            class_name: None,
            encoder: None,
            group: Some(DEFAULT_GROUP.to_string()),
            directory: Some(DEFAULT_EXPORT_DIR.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExport {
    pub kind: EntityKind,
    pub class_name: String,
    pub table_name: String,
    pub encoder: String,
    pub extension: Option<String>,
    pub group: String,
    pub directory: PathBuf,
    pub file_name: String,
    pub file_path: PathBuf,
}

impl ExportOptions {
    /// The options as supplied, before inference.
    pub fn table(&self) -> OptionTable {
        vec![
            ("class-name", shown(&self.class_name)),
            ("directory", shown(&self.directory)),
            ("encoder", shown(&self.encoder)),
            ("group", shown(&self.group)),
        ]
    }

    pub fn resolve(&self) -> Result<ResolvedExport, OptionError> {
        let directory = supplied(&self.directory).ok_or(OptionError::EmptyDestinationDirectory)?;
        let class_name = supplied(&self.class_name);
        let encoder = supplied(&self.encoder);
        if class_name.is_none() && encoder.is_none() {
            return Err(OptionError::MissingClassAndEncoder);
        }

        let encoder = encoder.unwrap_or(DEFAULT_FORMAT).to_string();
        let class_name = match class_name {
            Some(class_name) => class_name.to_string(),
            None => classify(encoder_token(&encoder)),
        };
        let kind = lookup(&class_name)?;

        let table_name = tableize(kind.spec().class_name);
        let extension = encoder_extension(&encoder).map(str::to_string);
        let file_name = match &extension {
            Some(extension) => format!("{}.{extension}", pluralize(&table_name)),
            None => pluralize(&table_name),
        };
        let directory = PathBuf::from(directory);

        Ok(ResolvedExport {
            kind,
            class_name,
            table_name,
            encoder,
            extension,
            group: supplied(&self.group).unwrap_or(DEFAULT_GROUP).to_string(),
            file_path: directory.join(&file_name),
            directory,
            file_name,
        })
    }
}

impl ResolvedExport {
    pub fn table(&self) -> OptionTable {
        vec![
            ("class-name", self.class_name.clone()),
            ("class-short-name", self.kind.to_string()),
            ("directory", self.directory.display().to_string()),
            ("encoder", self.encoder.clone()),
            ("extension", self.extension.clone().unwrap_or_default()),
            ("file-name", self.file_name.clone()),
            ("file-path", self.file_path.display().to_string()),
            ("group", self.group.clone()),
            ("table-name", self.table_name.clone()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub class_name: Option<String>,
    pub encoder: Option<String>,
    pub directory: Option<String>,
    pub file_name: Option<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            class_name: None,
            encoder: None,
            directory: Some(DEFAULT_IMPORT_DIR.to_string()),
            file_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImport {
    pub kind: EntityKind,
    pub class_name: String,
    pub table_name: String,
    pub encoder: String,
    pub extension: Option<String>,
    pub directory: PathBuf,
    pub file_name: String,
}

impl ImportOptions {
    pub fn table(&self) -> OptionTable {
        vec![
            ("class-name", shown(&self.class_name)),
            ("directory", shown(&self.directory)),
            ("encoder", shown(&self.encoder)),
            ("file-name", shown(&self.file_name)),
        ]
    }

    pub fn resolve(&self) -> Result<ResolvedImport, OptionError> {
        let directory = supplied(&self.directory).ok_or(OptionError::EmptySourceDirectory)?;
        let file_name = supplied(&self.file_name).ok_or(OptionError::EmptySourceFile)?;
        let encoder = supplied(&self.encoder);

        let (base_name, extension) = match file_name.rsplit_once('.') {
            Some((base, extension)) if !extension.is_empty() => (base, Some(extension.to_string())),
            _ => (file_name, None),
        };

        let mut table_name = None;
        let class_name = match (supplied(&self.class_name), encoder) {
            (Some(class_name), _) => class_name.to_string(),
            (None, Some(encoder)) => classify(encoder_token(encoder)),
            (None, None) => {
                let table = singularize(&tableize(base_name));
                let class_name = classify(&table);
                table_name = Some(table);
                class_name
            }
        };
        let kind = lookup(&class_name)?;
        let table_name = table_name.unwrap_or_else(|| tableize(kind.spec().class_name));

        let encoder = match encoder {
            Some(encoder) => encoder.to_string(),
            None => match &extension {
                Some(extension) => format!("{table_name}:{extension}"),
                None => table_name.clone(),
            },
        };

        Ok(ResolvedImport {
            kind,
            class_name,
            table_name,
            encoder,
            extension,
            directory: PathBuf::from(directory),
            file_name: file_name.to_string(),
        })
    }
}

impl ResolvedImport {
    pub fn table(&self) -> OptionTable {
        vec![
            ("class-name", self.class_name.clone()),
            ("class-short-name", self.kind.to_string()),
            ("directory", self.directory.display().to_string()),
            ("encoder", self.encoder.clone()),
            ("extension", self.extension.clone().unwrap_or_default()),
            ("file-name", self.file_name.clone()),
            ("table-name", self.table_name.clone()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub source: ImportOptions,
    pub property: Option<String>,
    pub overwrite: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            source: ImportOptions::default(),
            property: Some(DEFAULT_UNIQUE_PROPERTY.to_string()),
            overwrite: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUpdate {
    pub source: ResolvedImport,
    pub property: String,
    pub overwrite: bool,
}

impl UpdateOptions {
    pub fn table(&self) -> OptionTable {
        let mut table = self.source.table();
        table.push(("overwrite", self.overwrite.to_string()));
        table.push(("property", shown(&self.property)));
        table
    }

    pub fn resolve(&self) -> Result<ResolvedUpdate, OptionError> {
        Ok(ResolvedUpdate {
            source: self.source.resolve()?,
            property: supplied(&self.property)
                .unwrap_or(DEFAULT_UNIQUE_PROPERTY)
                .to_string(),
            overwrite: self.overwrite,
        })
    }
}

impl ResolvedUpdate {
    pub fn table(&self) -> OptionTable {
        let mut table = self.source.table();
        table.push(("overwrite", self.overwrite.to_string()));
        table.push(("property", self.property.clone()));
        table
    }
}

use crate::encoders::Serializer;
use crate::files::write_file;
use crate::import::resolve_or_report;
use crate::iri::IriConverter;
use crate::normalizer::{normalize, Group};
use crate::options::{render_table, ExportOptions};
use crate::stats::{Operation, RunSummary};
use crate::store::EntityStore;
use anyhow::{Context, Result};
use tracing::info;

/// Writes every entity of the resolved kind to `<directory>/<plural>.<ext>`.
pub fn run_export(options: &ExportOptions, store: &dyn EntityStore) -> Result<RunSummary> {
    let resolved = resolve_or_report(options.resolve(), || options.table())?;
    println!("{}", render_table(&resolved.table()));

    let group: Group = resolved.group.parse()?;
    let iri = IriConverter;
    let mut summary = RunSummary::new(Operation::Export, resolved.table());

    let mut records = Vec::new();
    for entity in store.find_all(resolved.kind) {
        let record = normalize(entity, group, store, &iri).with_context(|| {
            format!(
                "Failed to normalize {} {}",
                resolved.kind,
                entity.id.unwrap_or_default()
            )
        })?;
        records.push(record);
        summary.inc_rows();
    }

    let content = Serializer::default()
        .encode(records, &resolved.encoder)
        .with_context(|| format!("Failed to encode {} rows", resolved.encoder))?;
    write_file(&resolved.file_path, content.as_bytes())?;

    info!(
        kind = %resolved.kind,
        rows = summary.rows,
        path = %resolved.file_path.display(),
        "Export complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Entity;
    use crate::schema::EntityKind;
    use crate::store::JsonFileStore;
    use crate::value::Value;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn export_without_entities_writes_empty_document() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::in_memory();
        let options = ExportOptions {
            class_name: Some("Tag".into()),
            directory: Some(dir.path().display().to_string()),
            ..ExportOptions::default()
        };

        let summary = run_export(&options, &store).unwrap();
        assert_eq!(summary.message(), "0 rows exported.");
        assert_eq!(fs::read_to_string(dir.path().join("tags.json")).unwrap(), "[]");
    }

    #[test]
    fn export_rejects_unknown_group() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::in_memory();
        let mut tag = Entity::new(EntityKind::Tag);
        tag.attributes.insert("name".into(), Value::from("intro"));
        store.persist(tag).unwrap();

        let options = ExportOptions {
            class_name: Some("Tag".into()),
            group: Some("write".into()),
            directory: Some(dir.path().display().to_string()),
            ..ExportOptions::default()
        };
        let err = run_export(&options, &store).unwrap_err();
        assert!(format!("{err:#}").contains("unknown normalization group"));
        assert!(!dir.path().join("tags.json").exists());
    }
}

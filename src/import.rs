use crate::config::PROGRESS_INTERVAL;
use crate::encoders::Serializer;
use crate::error::OptionError;
use crate::files::find_file;
use crate::iri::IriConverter;
use crate::merge::merge_normalized_objects;
use crate::normalizer::{denormalize, normalize, Group};
use crate::options::{render_table, ImportOptions, OptionTable, ResolvedImport, UpdateOptions};
use crate::record;
use crate::stats::{Operation, RunSummary};
use crate::store::EntityStore;
use crate::value::Record;
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

/// Prints the options as supplied when they cannot be resolved, so the
/// user sees what was inferred from before the run aborts.
pub(crate) fn resolve_or_report<T>(
    resolved: Result<T, OptionError>,
    supplied: impl FnOnce() -> OptionTable,
) -> Result<T> {
    match resolved {
        Ok(resolved) => Ok(resolved),
        Err(err) => {
            println!("{}", render_table(&supplied()));
            Err(err).context("Invalid options")
        }
    }
}

fn make_progress_bar(total: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "    {{spinner:.cyan}} {label:<8} [{{bar:30.cyan/blue}}] {{pos}}/{{len}} rows {{msg}}"
            ))
            .unwrap()
            .progress_chars("=> "),
    );
    pb
}

/// Locates and decodes the source file. Relationship targets named by the
/// rows are created while decoding, before any row entity is persisted.
fn load_rows(resolved: &ResolvedImport, store: &mut dyn EntityStore) -> Result<Vec<Record>> {
    let (path, contents) = find_file(&resolved.directory, &resolved.file_name)?;
    info!(path = %path.display(), encoder = %resolved.encoder, "Decoding source file");

    let rows = Serializer::default()
        .decode(&contents, &resolved.encoder, store)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    debug!(rows = rows.len(), "Decoded rows");
    Ok(rows)
}

/// Inserts one new entity per row. Rows are never matched against existing
/// entities.
pub fn run_import(options: &ImportOptions, store: &mut dyn EntityStore) -> Result<RunSummary> {
    let resolved = resolve_or_report(options.resolve(), || options.table())?;
    println!("{}", render_table(&resolved.table()));

    let rows = load_rows(&resolved, store)?;
    let iri = IriConverter;
    let mut summary = RunSummary::new(Operation::Import, resolved.table());

    let pb = make_progress_bar(rows.len() as u64, "import");
    for (index, row) in rows.iter().enumerate() {
        let entity = denormalize(row, resolved.kind, None, &iri)
            .with_context(|| format!("row {}", index + 1))?;
        let reference = store
            .persist(entity)
            .with_context(|| format!("row {}", index + 1))?;
        store.flush()?;
        debug!(entity = %reference, "Inserted");

        summary.inc_rows();
        summary.inc_created();
        pb.inc(1);
        if summary.rows % PROGRESS_INTERVAL == 0 {
            pb.set_message(format!("{} created", summary.created));
        }
    }
    pb.finish_with_message(format!("{} created", summary.created));

    info!(kind = %resolved.kind, rows = summary.rows, "Import complete");
    Ok(summary)
}

/// Matches each row to a stored entity by the unique property and merges
/// the two. Rows without a match are inserted.
pub fn run_update(options: &UpdateOptions, store: &mut dyn EntityStore) -> Result<RunSummary> {
    let resolved = resolve_or_report(options.resolve(), || options.table())?;
    println!("{}", render_table(&resolved.table()));

    let source = &resolved.source;
    let property = resolved.property.as_str();
    let rows = load_rows(source, store)?;
    let iri = IriConverter;
    let mut summary = RunSummary::new(Operation::Update, resolved.table());

    let pb = make_progress_bar(rows.len() as u64, "update");
    for (index, row) in rows.into_iter().enumerate() {
        let line = index + 1;
        let Some(value) = row.get(property) else {
            bail!("row {line}: Required unique property \"{property}\" not found in current item");
        };
        if value.is_absent() {
            bail!("row {line}: \"{property}\" value cannot be empty");
        }

        let reader: &dyn EntityStore = &*store;
        let existing = match reader.find_one_by(source.kind, &record! { property => value.clone() }) {
            Some(entity) => Some((
                entity.id,
                normalize(entity, Group::Read, reader, &iri)
                    .with_context(|| format!("row {line}"))?,
            )),
            None => None,
        };

        let reference = match existing {
            Some((id, destination)) => {
                let merged = merge_normalized_objects(row, destination, resolved.overwrite);
                let entity = denormalize(&merged, source.kind, id, &iri)
                    .with_context(|| format!("row {line}"))?;
                summary.inc_updated();
                store.persist(entity).with_context(|| format!("row {line}"))?
            }
            None => {
                let entity = denormalize(&row, source.kind, None, &iri)
                    .with_context(|| format!("row {line}"))?;
                summary.inc_created();
                store.persist(entity).with_context(|| format!("row {line}"))?
            }
        };
        store.flush()?;
        debug!(entity = %reference, "Stored");

        summary.inc_rows();
        pb.inc(1);
        if summary.rows % PROGRESS_INTERVAL == 0 {
            pb.set_message(format!("{} updated, {} created", summary.updated, summary.created));
        }
    }
    pb.finish_with_message(format!(
        "{} updated, {} created",
        summary.updated, summary.created
    ));

    info!(
        kind = %source.kind,
        rows = summary.rows,
        updated = summary.updated,
        created = summary.created,
        "Update complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::write_file;
    use crate::models::Entity;
    use crate::schema::EntityKind;
    use crate::store::JsonFileStore;
    use crate::value::Value;
    use tempfile::TempDir;

    fn source(dir: &TempDir, name: &str, contents: &str) -> ImportOptions {
        write_file(&dir.path().join(name), contents.as_bytes()).unwrap();
        ImportOptions {
            directory: Some(dir.path().display().to_string()),
            file_name: Some(name.to_string()),
            ..ImportOptions::default()
        }
    }

    fn john_doe(store: &mut JsonFileStore) {
        let mut person = Entity::new(EntityKind::Person);
        person.attributes.insert("name".into(), Value::from("John Doe"));
        person.attributes.insert("alternateName".into(), Value::from("john"));
        store.persist(person).unwrap();
    }

    #[test]
    fn import_inserts_every_row() {
        let dir = TempDir::new().unwrap();
        let options = source(&dir, "tags.csv", "name\nintro\noutro\n");
        let mut store = JsonFileStore::in_memory();

        let summary = run_import(&options, &mut store).unwrap();
        assert_eq!(summary.message(), "2 rows imported.");
        assert_eq!(summary.created, 2);
        assert_eq!(store.count(EntityKind::Tag), 2);

        run_import(&options, &mut store).unwrap();
        assert_eq!(store.count(EntityKind::Tag), 4);
    }

    #[test]
    fn import_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let options = ImportOptions {
            directory: Some(dir.path().display().to_string()),
            file_name: Some("people.csv".into()),
            ..ImportOptions::default()
        };
        let err = run_import(&options, &mut JsonFileStore::in_memory()).unwrap_err();
        assert!(format!("{err:#}").contains("not found"));
    }

    #[test]
    fn import_reports_invalid_options() {
        let options = ImportOptions {
            file_name: Some("foobar.csv".into()),
            ..ImportOptions::default()
        };
        let err = run_import(&options, &mut JsonFileStore::in_memory()).unwrap_err();
        assert!(format!("{err:#}").contains("entity not found"));
    }

    #[test]
    fn update_keeps_existing_values_without_overwrite() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::in_memory();
        john_doe(&mut store);

        let options = UpdateOptions {
            source: source(&dir, "people.csv", "name,alternateName\nJohn Lennon,john\n"),
            property: Some("alternateName".into()),
            overwrite: false,
        };
        let summary = run_update(&options, &mut store).unwrap();
        assert_eq!(summary.message(), "1 row updated.");
        assert_eq!(summary.updated, 1);

        let people = store.find_all(EntityKind::Person);
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].attribute("name"), Some(&Value::from("John Doe")));
    }

    #[test]
    fn update_with_overwrite_takes_row_values() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::in_memory();
        john_doe(&mut store);

        let options = UpdateOptions {
            source: source(&dir, "people.csv", "name,alternateName\nJohn Lennon,john\n"),
            property: Some("alternateName".into()),
            overwrite: true,
        };
        run_update(&options, &mut store).unwrap();

        let people = store.find_all(EntityKind::Person);
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].attribute("name"), Some(&Value::from("John Lennon")));
        assert_eq!(people[0].id, Some(1));
    }

    #[test]
    fn update_inserts_unmatched_rows() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::in_memory();
        john_doe(&mut store);

        let options = UpdateOptions {
            source: source(&dir, "people.csv", "name,alternateName\nPaul McCartney,paul\n"),
            property: Some("alternateName".into()),
            overwrite: false,
        };
        let summary = run_update(&options, &mut store).unwrap();
        assert_eq!((summary.updated, summary.created), (0, 1));
        assert_eq!(store.count(EntityKind::Person), 2);
    }

    #[test]
    fn update_requires_unique_property() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::in_memory();

        let options = UpdateOptions {
            source: source(&dir, "people.csv", "name\nJohn Lennon\n"),
            ..UpdateOptions::default()
        };
        let err = run_update(&options, &mut store).unwrap_err();
        assert_eq!(
            err.to_string(),
            "row 1: Required unique property \"id\" not found in current item"
        );

        let options = UpdateOptions {
            source: ImportOptions {
                class_name: Some("Tag".into()),
                encoder: Some("csv".into()),
                ..source(&dir, "tags.csv", "id,name\n,intro\n")
            },
            ..UpdateOptions::default()
        };
        let err = run_update(&options, &mut store).unwrap_err();
        assert_eq!(err.to_string(), "row 1: \"id\" value cannot be empty");
    }
}

use super::{attempt, RecordEncoder};
use crate::codec::FileFormat;
use crate::factory::FactorySet;
use crate::resolver::RelationshipResolver;
use crate::schema::EntityKind;
use crate::store::EntityStore;
use crate::transform::{collection_to_string, remove_null_fields, string_to_collection};
use crate::value::Record;

/// Kinds that clips point at. Their only relation is the inverse `clips`
/// list, identified by clip name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferencedKind {
    Episode,
    Person,
    Tag,
}

impl ReferencedKind {
    pub fn kind(self) -> EntityKind {
        match self {
            ReferencedKind::Episode => EntityKind::Episode,
            ReferencedKind::Person => EntityKind::Person,
            ReferencedKind::Tag => EntityKind::Tag,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReferencedEncoder {
    kind: ReferencedKind,
    file_format: FileFormat,
    resolver: RelationshipResolver,
    factories: FactorySet,
}

impl ReferencedEncoder {
    pub fn new(kind: ReferencedKind, file_format: FileFormat) -> Self {
        Self {
            kind,
            file_format,
            resolver: RelationshipResolver::default(),
            factories: FactorySet::default(),
        }
    }
}

impl RecordEncoder for ReferencedEncoder {
    fn format(&self) -> &'static str {
        match (self.kind, self.file_format) {
            (ReferencedKind::Episode, FileFormat::Csv) => "episode:csv",
            (ReferencedKind::Episode, FileFormat::Json) => "episode:json",
            (ReferencedKind::Person, FileFormat::Csv) => "person:csv",
            (ReferencedKind::Person, FileFormat::Json) => "person:json",
            (ReferencedKind::Tag, FileFormat::Csv) => "tag:csv",
            (ReferencedKind::Tag, FileFormat::Json) => "tag:json",
        }
    }

    fn kind(&self) -> EntityKind {
        self.kind.kind()
    }

    fn file_format(&self) -> FileFormat {
        self.file_format
    }

    fn transform_for_export(&self, mut record: Record) -> Record {
        remove_null_fields(&mut record);
        if self.file_format == FileFormat::Csv {
            attempt(
                "collection_to_string",
                "clips",
                collection_to_string(&mut record, "clips", "name"),
            );
        }
        record
    }

    fn transform_for_import(&self, mut record: Record, store: &mut dyn EntityStore) -> Record {
        remove_null_fields(&mut record);
        if self.file_format == FileFormat::Csv {
            attempt(
                "string_to_collection",
                "clips",
                string_to_collection(&mut record, "clips", "name"),
            );
        }
        attempt(
            "fix_relationships",
            "clips",
            self.resolver.fix_relationships(
                &mut record,
                "clips",
                "name",
                self.factories.for_kind(EntityKind::Clip),
                store,
            ),
        );
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use crate::store::JsonFileStore;
    use crate::value::Value;

    #[test]
    fn csv_collapses_clips_to_names() {
        let encoder = ReferencedEncoder::new(ReferencedKind::Person, FileFormat::Csv);
        let row = encoder.transform_for_export(record! {
            "name" => "John Doe",
            "alternateName" => "",
            "clips" => vec![record! { "name" => "Opening" }, record! { "name" => "Ending" }],
        });
        assert_eq!(
            row,
            record! { "name" => "John Doe", "clips" => "Opening, Ending" }
        );
    }

    #[test]
    fn json_keeps_clip_fragments() {
        let encoder = ReferencedEncoder::new(ReferencedKind::Tag, FileFormat::Json);
        let row = encoder.transform_for_export(record! {
            "name" => "intro",
            "clips" => vec![record! { "name" => "Opening" }],
        });
        assert_eq!(row["clips"], Value::from(vec![record! { "name" => "Opening" }]));
    }

    #[test]
    fn csv_import_resolves_clip_names() {
        let mut store = JsonFileStore::in_memory();
        let encoder = ReferencedEncoder::new(ReferencedKind::Episode, FileFormat::Csv);
        let row = encoder.transform_for_import(
            record! { "name" => "Pilot", "episodeNumber" => "S01E01", "clips" => "Opening, Ending" },
            &mut store,
        );
        assert_eq!(
            row["clips"],
            Value::from(vec!["/api/clips/1", "/api/clips/2"])
        );
        assert_eq!(store.count(EntityKind::Clip), 2);
    }

    #[test]
    fn import_without_clips_is_untouched() {
        let mut store = JsonFileStore::in_memory();
        let encoder = ReferencedEncoder::new(ReferencedKind::Person, FileFormat::Json);
        let row = encoder.transform_for_import(
            record! { "name" => "John Doe", "alternateName" => "john" },
            &mut store,
        );
        assert_eq!(row, record! { "name" => "John Doe", "alternateName" => "john" });
    }
}

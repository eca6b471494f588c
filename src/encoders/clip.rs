use super::{attempt, RecordEncoder};
use crate::codec::FileFormat;
use crate::datetime::{duration_to_integer, duration_to_string};
use crate::factory::FactorySet;
use crate::resolver::RelationshipResolver;
use crate::schema::EntityKind;
use crate::store::EntityStore;
use crate::transform::{
    associative_array_to_string, collection_to_string, escape_line_breaks, remove_null_fields,
    string_to_associative_array, string_to_boolean, string_to_collection, unescape_line_breaks,
};
use crate::value::Record;

/// Clips as CSV rows: the episode collapses to its number, characters to
/// their alternate names and tags to their names, comma-joined.
#[derive(Debug, Clone, Default)]
pub struct ClipCsvEncoder {
    resolver: RelationshipResolver,
    factories: FactorySet,
}

impl RecordEncoder for ClipCsvEncoder {
    fn format(&self) -> &'static str {
        "clip:csv"
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Clip
    }

    fn file_format(&self) -> FileFormat {
        FileFormat::Csv
    }

    fn transform_for_export(&self, mut record: Record) -> Record {
        remove_null_fields(&mut record);
        attempt("escape_line_breaks", "citation", escape_line_breaks(&mut record, "citation"));
        attempt("duration_to_string", "duration", duration_to_string(&mut record, "duration"));
        attempt(
            "associative_array_to_string",
            "partOfEpisode",
            associative_array_to_string(&mut record, "partOfEpisode", "episodeNumber"),
        );
        attempt(
            "collection_to_string",
            "characters",
            collection_to_string(&mut record, "characters", "alternateName"),
        );
        attempt(
            "collection_to_string",
            "tags",
            collection_to_string(&mut record, "tags", "name"),
        );
        record
    }

    fn transform_for_import(&self, mut record: Record, store: &mut dyn EntityStore) -> Record {
        remove_null_fields(&mut record);
        attempt("unescape_line_breaks", "citation", unescape_line_breaks(&mut record, "citation"));
        attempt("duration_to_integer", "duration", duration_to_integer(&mut record, "duration"));
        attempt("string_to_boolean", "autoplay", string_to_boolean(&mut record, "autoplay"));

        attempt(
            "string_to_associative_array",
            "partOfEpisode",
            string_to_associative_array(&mut record, "partOfEpisode", "episodeNumber"),
        );
        attempt(
            "fix_relationship",
            "partOfEpisode",
            self.resolver.fix_relationship(
                &mut record,
                "partOfEpisode",
                self.factories.for_kind(EntityKind::Episode),
                store,
            ),
        );

        attempt(
            "string_to_collection",
            "characters",
            string_to_collection(&mut record, "characters", "alternateName"),
        );
        attempt(
            "fix_relationships",
            "characters",
            self.resolver.fix_relationships(
                &mut record,
                "characters",
                "alternateName",
                self.factories.for_kind(EntityKind::Person),
                store,
            ),
        );

        attempt(
            "string_to_collection",
            "tags",
            string_to_collection(&mut record, "tags", "name"),
        );
        attempt(
            "fix_relationships",
            "tags",
            self.resolver.fix_relationships(
                &mut record,
                "tags",
                "name",
                self.factories.for_kind(EntityKind::Tag),
                store,
            ),
        );
        record
    }
}

/// Clips as JSON documents: relations travel as embedded fragments.
#[derive(Debug, Clone, Default)]
pub struct ClipJsonEncoder {
    resolver: RelationshipResolver,
    factories: FactorySet,
}

impl RecordEncoder for ClipJsonEncoder {
    fn format(&self) -> &'static str {
        "clip:json"
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Clip
    }

    fn file_format(&self) -> FileFormat {
        FileFormat::Json
    }

    fn transform_for_export(&self, mut record: Record) -> Record {
        remove_null_fields(&mut record);
        record
    }

    fn transform_for_import(&self, mut record: Record, store: &mut dyn EntityStore) -> Record {
        remove_null_fields(&mut record);
        attempt(
            "fix_relationship",
            "partOfEpisode",
            self.resolver.fix_relationship(
                &mut record,
                "partOfEpisode",
                self.factories.for_kind(EntityKind::Episode),
                store,
            ),
        );
        attempt(
            "fix_relationships",
            "characters",
            self.resolver.fix_relationships(
                &mut record,
                "characters",
                "name",
                self.factories.for_kind(EntityKind::Person),
                store,
            ),
        );
        attempt(
            "fix_relationships",
            "tags",
            self.resolver.fix_relationships(
                &mut record,
                "tags",
                "name",
                self.factories.for_kind(EntityKind::Tag),
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
    fn csv_export_flattens_relations() {
        let row = ClipCsvEncoder::default().transform_for_export(record! {
            "name" => "Opening",
            "citation" => "line one\nline two",
            "duration" => 3900,
            "url" => Value::Null,
            "partOfEpisode" => record! { "name" => "Pilot", "episodeNumber" => "S01E01" },
            "characters" => vec![
                record! { "name" => "John Doe", "alternateName" => "john" },
                record! { "name" => "Jane Doe", "alternateName" => "jane" },
            ],
            "tags" => vec![record! { "name" => "intro" }],
        });

        assert_eq!(
            row,
            record! {
                "name" => "Opening",
                "citation" => "line one\\nline two",
                "duration" => "01:05",
                "partOfEpisode" => "S01E01",
                "characters" => "john, jane",
                "tags" => "intro",
            }
        );
    }

    #[test]
    fn csv_export_survives_bad_fields() {
        let row = ClipCsvEncoder::default().transform_for_export(record! {
            "name" => "Opening",
            "duration" => "not a number",
            "tags" => vec!["bare"],
        });
        assert_eq!(row["duration"], Value::from("not a number"));
        assert_eq!(row["tags"], Value::from(vec!["bare"]));
    }

    #[test]
    fn csv_import_resolves_relations() {
        let mut store = JsonFileStore::in_memory();
        let row = ClipCsvEncoder::default().transform_for_import(
            record! {
                "name" => "Opening",
                "citation" => "line one\\nline two",
                "duration" => "01:05",
                "autoplay" => "true",
                "thumbnailUrl" => "",
                "partOfEpisode" => "S01E01",
                "characters" => "john, jane",
                "tags" => "intro",
            },
            &mut store,
        );

        assert_eq!(
            row,
            record! {
                "name" => "Opening",
                "citation" => "line one\nline two",
                "duration" => 3900,
                "autoplay" => true,
                "partOfEpisode" => "/api/episodes/1",
                "characters" => vec!["/api/people/1", "/api/people/2"],
                "tags" => vec!["/api/tags/1"],
            }
        );
        assert_eq!(store.count(EntityKind::Person), 2);
    }

    #[test]
    fn json_import_resolves_embedded_fragments() {
        let mut store = JsonFileStore::in_memory();
        let encoder = ClipJsonEncoder::default();
        let row = record! {
            "name" => "Opening",
            "partOfEpisode" => record! { "name" => "Pilot" },
            "characters" => vec![record! { "name" => "John Doe" }, record! { "name" => "John Doe" }],
            "tags" => Value::Seq(vec![]),
        };
        let resolved = encoder.transform_for_import(row, &mut store);

        assert_eq!(resolved["partOfEpisode"], Value::from("/api/episodes/1"));
        assert_eq!(
            resolved["characters"],
            Value::from(vec!["/api/people/1", "/api/people/1"])
        );
        assert!(!resolved.contains_key("tags"));
        assert_eq!(store.count(EntityKind::Person), 1);
    }
}

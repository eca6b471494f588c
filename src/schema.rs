//! Static registry of entity kinds.
//!
//! Everything the pipeline knows about an entity kind (its names, natural
//! keys, typed attributes and relations) lives here, so option inference and
//! the factories never have to guess at runtime.

use crate::transform::leading_integer;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Clip,
    Episode,
    Person,
    Tag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Text,
    Integer,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

#[derive(Debug)]
pub struct AttributeSpec {
    pub name: &'static str,
    pub scalar: ScalarType,
}

#[derive(Debug)]
pub struct RelationSpec {
    pub field: &'static str,
    pub target: EntityKind,
    pub cardinality: Cardinality,
    /// Field on the target kind holding the other side of the link
    pub inverse: &'static str,
}

#[derive(Debug)]
pub struct KindSpec {
    pub kind: EntityKind,
    pub class_name: &'static str,
    pub table_name: &'static str,
    pub collection: &'static str,
    /// Natural keys in lookup priority order
    pub natural_keys: &'static [&'static str],
    pub attributes: &'static [AttributeSpec],
    pub relations: &'static [RelationSpec],
    pub required_message: &'static str,
}

const fn text(name: &'static str) -> AttributeSpec {
    AttributeSpec {
        name,
        scalar: ScalarType::Text,
    }
}

const fn clips_inverse(inverse: &'static str) -> RelationSpec {
    RelationSpec {
        field: "clips",
        target: EntityKind::Clip,
        cardinality: Cardinality::Many,
        inverse,
    }
}

static CLIP: KindSpec = KindSpec {
    kind: EntityKind::Clip,
    class_name: "Clip",
    table_name: "clip",
    collection: "clips",
    natural_keys: &["name"],
    attributes: &[
        text("name"),
        text("url"),
        text("citation"),
        text("thumbnailUrl"),
        AttributeSpec {
            name: "autoplay",
            scalar: ScalarType::Boolean,
        },
        AttributeSpec {
            name: "duration",
            scalar: ScalarType::Integer,
        },
    ],
    relations: &[
        RelationSpec {
            field: "partOfEpisode",
            target: EntityKind::Episode,
            cardinality: Cardinality::One,
            inverse: "clips",
        },
        RelationSpec {
            field: "characters",
            target: EntityKind::Person,
            cardinality: Cardinality::Many,
            inverse: "clips",
        },
        RelationSpec {
            field: "tags",
            target: EntityKind::Tag,
            cardinality: Cardinality::Many,
            inverse: "clips",
        },
    ],
    required_message: "Clip name cannot be empty",
};

static EPISODE: KindSpec = KindSpec {
    kind: EntityKind::Episode,
    class_name: "Episode",
    table_name: "episode",
    collection: "episodes",
    natural_keys: &["name", "episodeNumber"],
    attributes: &[text("name"), text("episodeNumber")],
    relations: &[clips_inverse("partOfEpisode")],
    required_message: "Episode name and episodeNumber cannot both be empty",
};

static PERSON: KindSpec = KindSpec {
    kind: EntityKind::Person,
    class_name: "Person",
    table_name: "person",
    collection: "people",
    natural_keys: &["name", "alternateName"],
    attributes: &[text("name"), text("alternateName")],
    relations: &[clips_inverse("characters")],
    required_message: "Person name and alternateName cannot both be empty",
};

static TAG: KindSpec = KindSpec {
    kind: EntityKind::Tag,
    class_name: "Tag",
    table_name: "tag",
    collection: "tags",
    natural_keys: &["name"],
    attributes: &[text("name")],
    relations: &[clips_inverse("tags")],
    required_message: "Tag name cannot be empty",
};

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Clip,
        EntityKind::Episode,
        EntityKind::Person,
        EntityKind::Tag,
    ];

    pub fn spec(self) -> &'static KindSpec {
        match self {
            EntityKind::Clip => &CLIP,
            EntityKind::Episode => &EPISODE,
            EntityKind::Person => &PERSON,
            EntityKind::Tag => &TAG,
        }
    }

    /// Accepts bare (`Person`) and namespaced (`App\Entity\Person`,
    /// `charon::Person`) class names, case-insensitively.
    pub fn from_class_name(name: &str) -> Option<Self> {
        let short = name
            .rsplit(['\\', ':', '/'])
            .next()
            .unwrap_or(name)
            .trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.spec().class_name.eq_ignore_ascii_case(short))
    }

    pub fn from_table_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.spec().table_name == name)
    }

    pub fn from_collection(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.spec().collection == name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec().class_name)
    }
}

impl KindSpec {
    pub fn attribute(&self, name: &str) -> Option<&'static AttributeSpec> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn relation(&self, field: &str) -> Option<&'static RelationSpec> {
        self.relations.iter().find(|r| r.field == field)
    }
}

impl RelationSpec {
    /// The relation on the target kind that mirrors this one.
    pub fn inverse_spec(&self) -> &'static RelationSpec {
        self.target
            .spec()
            .relation(self.inverse)
            .unwrap_or_else(|| unreachable!("registry declares {} without its inverse", self.field))
    }
}

impl ScalarType {
    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Text => "text",
            ScalarType::Integer => "integer",
            ScalarType::Boolean => "boolean",
        }
    }

    /// Converts a scalar into this type's canonical representation.
    /// Returns `None` when the value cannot be read as this type.
    pub fn coerce(self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ScalarType::Text, Value::Str(_)) => Some(value.clone()),
            (ScalarType::Text, Value::Int(_) | Value::Bool(_)) => value.to_text().map(Value::Str),
            (ScalarType::Integer, Value::Int(_)) => Some(value.clone()),
            (ScalarType::Integer, Value::Str(s)) => {
                let trimmed = s.trim();
                let digits = trimmed.strip_prefix(['-', '+']).unwrap_or(trimmed);
                (!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
                    .then(|| Value::Int(leading_integer(trimmed)))
            }
            (ScalarType::Boolean, Value::Bool(_)) => Some(value.clone()),
            (ScalarType::Boolean, Value::Str(s)) => match s.trim() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            (ScalarType::Boolean, Value::Int(i)) => Some(Value::Bool(*i != 0)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_name_lookup() {
        assert_eq!(EntityKind::from_class_name("Person"), Some(EntityKind::Person));
        assert_eq!(
            EntityKind::from_class_name("App\\Entity\\Person"),
            Some(EntityKind::Person)
        );
        assert_eq!(
            EntityKind::from_class_name("charon::Episode"),
            Some(EntityKind::Episode)
        );
        assert_eq!(EntityKind::from_class_name("tag"), Some(EntityKind::Tag));
        assert_eq!(EntityKind::from_class_name("App\\Entity\\FooBar"), None);
    }

    #[test]
    fn table_and_collection_lookup() {
        assert_eq!(EntityKind::from_table_name("person"), Some(EntityKind::Person));
        assert_eq!(EntityKind::from_collection("people"), Some(EntityKind::Person));
        assert_eq!(EntityKind::from_collection("person"), None);
    }

    #[test]
    fn every_relation_has_a_matching_inverse() {
        for kind in EntityKind::ALL {
            for relation in kind.spec().relations {
                let inverse = relation.inverse_spec();
                assert_eq!(inverse.target, kind, "{kind}.{}", relation.field);
                assert_eq!(inverse.inverse, relation.field, "{kind}.{}", relation.field);
            }
        }
    }

    #[test]
    fn natural_keys_are_text_attributes() {
        for kind in EntityKind::ALL {
            let spec = kind.spec();
            for key in spec.natural_keys {
                let attribute = spec.attribute(key).expect("natural key is an attribute");
                assert_eq!(attribute.scalar, ScalarType::Text);
            }
        }
    }

    #[test]
    fn scalar_coercion() {
        assert_eq!(
            ScalarType::Integer.coerce(&Value::from("3900")),
            Some(Value::Int(3900))
        );
        assert_eq!(ScalarType::Integer.coerce(&Value::from("01:05")), None);
        assert_eq!(
            ScalarType::Boolean.coerce(&Value::from("1")),
            Some(Value::Bool(true))
        );
        assert_eq!(ScalarType::Boolean.coerce(&Value::from("maybe")), None);
        assert_eq!(
            ScalarType::Text.coerce(&Value::from(12)),
            Some(Value::from("12"))
        );
        assert_eq!(ScalarType::Text.coerce(&Value::from(vec!["a"])), None);
    }
}

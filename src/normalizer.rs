//! Conversion between stored entities and flat records.
//!
//! Normalization has two shapes, selected by group:
//!
//! - **export** -- attributes plus relations embedded as natural-key
//!   fragments (`{"name": "intro"}`), no `id`. This is what files carry.
//! - **read** -- `id`, attributes, and relations as canonical references.
//!   This is the shape merged against incoming rows during update.

use crate::error::{RecordError, StoreError};
use crate::iri::IriConverter;
use crate::models::{Entity, EntityRef};
use crate::schema::{Cardinality, EntityKind, RelationSpec};
use crate::store::EntityStore;
use crate::value::{Record, Value};
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Export,
    Read,
}

impl FromStr for Group {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "export" => Ok(Group::Export),
            "read" => Ok(Group::Read),
            other if other.starts_with("read:") => Ok(Group::Read),
            other => Err(RecordError::UnknownGroup(other.to_string())),
        }
    }
}

/// Natural-key fields of a related entity.
fn fragment(store: &dyn EntityStore, target: EntityRef) -> Result<Value, StoreError> {
    let entity = store
        .get(target)
        .ok_or_else(|| StoreError::NotFound(target.to_string()))?;
    let mut fields = Record::new();
    for key in target.kind.spec().natural_keys {
        if let Some(value) = entity.attribute(key) {
            fields.insert(key.to_string(), value.clone());
        }
    }
    Ok(Value::Map(fields))
}

fn relation_value(
    relation: &RelationSpec,
    targets: &[EntityRef],
    mut render: impl FnMut(EntityRef) -> Result<Value, RecordError>,
) -> Result<Option<Value>, RecordError> {
    if targets.is_empty() {
        return Ok(None);
    }
    let value = match relation.cardinality {
        Cardinality::One => render(targets[0])?,
        Cardinality::Many => Value::Seq(
            targets
                .iter()
                .map(|target| render(*target))
                .collect::<Result<_, _>>()?,
        ),
    };
    Ok(Some(value))
}

pub fn normalize(
    entity: &Entity,
    group: Group,
    store: &dyn EntityStore,
    iri: &IriConverter,
) -> Result<Record, RecordError> {
    let spec = entity.spec();
    let mut record = Record::new();

    if group == Group::Read {
        if let Some(id) = entity.id {
            record.insert("id".to_string(), Value::Int(id as i64));
        }
    }

    for attribute in spec.attributes {
        if let Some(value) = entity.attribute(attribute.name) {
            record.insert(attribute.name.to_string(), value.clone());
        }
    }

    for relation in spec.relations {
        let targets = entity.related(relation.field);
        let value = match group {
            Group::Export => relation_value(relation, targets, |target| {
                Ok(fragment(store, target)?)
            })?,
            Group::Read => relation_value(relation, targets, |target| {
                Ok(Value::Str(iri.to_reference(target)))
            })?,
        };
        if let Some(value) = value {
            record.insert(relation.field.to_string(), value);
        }
    }

    Ok(record)
}

fn read_reference(
    kind: EntityKind,
    relation: &RelationSpec,
    value: &Value,
    iri: &IriConverter,
) -> Result<Option<EntityRef>, RecordError> {
    let unresolved = || RecordError::UnresolvedRelation {
        kind: kind.spec().class_name,
        field: relation.field.to_string(),
        found: value.type_name().to_string(),
    };
    let text = match value {
        Value::Null => return Ok(None),
        Value::Str(text) if iri.is_reference(text) => text,
        _ => return Err(unresolved()),
    };
    let reference = iri.from_reference(text)?;
    if reference.kind != relation.target {
        return Err(RecordError::WrongTarget {
            kind: kind.spec().class_name,
            field: relation.field.to_string(),
            expected: relation.target.spec().class_name,
            actual: reference.kind.spec().class_name,
        });
    }
    Ok(Some(reference))
}

/// Rebuilds an entity from a record whose relations are already resolved to
/// canonical references. `id` is the identity to keep (update) or `None`
/// for a new entity; an `id` field in the record itself is ignored.
pub fn denormalize(
    record: &Record,
    kind: EntityKind,
    id: Option<u64>,
    iri: &IriConverter,
) -> Result<Entity, RecordError> {
    let spec = kind.spec();
    let mut entity = Entity::new(kind);
    entity.id = id;

    for (field, value) in record {
        if field == "id" {
            debug!(kind = %kind, "Ignoring id field, the store owns identity");
            continue;
        }

        if let Some(attribute) = spec.attribute(field) {
            if value.is_absent() {
                continue;
            }
            let coerced =
                attribute
                    .scalar
                    .coerce(value)
                    .ok_or_else(|| RecordError::InvalidScalar {
                        kind: spec.class_name,
                        field: field.clone(),
                        expected: attribute.scalar.name(),
                        found: value.to_text().unwrap_or_else(|| value.type_name().to_string()),
                    })?;
            entity.attributes.insert(field.clone(), coerced);
        } else if let Some(relation) = spec.relation(field) {
            let items: Vec<&Value> = match value {
                Value::Seq(items) => items.iter().collect(),
                other => vec![other],
            };
            let mut targets = Vec::new();
            for item in items {
                if let Some(target) = read_reference(kind, relation, item, iri)? {
                    if !targets.contains(&target) {
                        targets.push(target);
                    }
                }
            }
            if !targets.is_empty() {
                entity.relations.insert(field.clone(), targets);
            }
        } else {
            debug!(kind = %kind, field = %field, "Ignoring unknown field");
        }
    }

    Ok(entity)
}

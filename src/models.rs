use crate::schema::{EntityKind, KindSpec};
use crate::value::{Record, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store identity of an entity: its kind plus the id assigned on first persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: u64,
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    /// `None` until the entity has been persisted
    pub id: Option<u64>,
    pub attributes: Record,
    #[serde(default)]
    pub relations: IndexMap<String, Vec<EntityRef>>,
}

impl Entity {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            id: None,
            attributes: Record::new(),
            relations: IndexMap::new(),
        }
    }

    pub fn spec(&self) -> &'static KindSpec {
        self.kind.spec()
    }

    pub fn reference(&self) -> Option<EntityRef> {
        self.id.map(|id| EntityRef {
            kind: self.kind,
            id,
        })
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn related(&self, field: &str) -> &[EntityRef] {
        self.relations.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Adds `target` to a relation field. A to-one field is replaced; a
    /// to-many field ignores duplicates. Returns the reference a to-one
    /// field held before, if it changed.
    pub(crate) fn attach(&mut self, field: &str, target: EntityRef, single: bool) -> Option<EntityRef> {
        let slot = self.relations.entry(field.to_string()).or_default();
        if single {
            let previous = slot.first().copied().filter(|prev| *prev != target);
            slot.clear();
            slot.push(target);
            previous
        } else {
            if !slot.contains(&target) {
                slot.push(target);
            }
            None
        }
    }

    pub(crate) fn detach(&mut self, field: &str, target: EntityRef) {
        if let Some(slot) = self.relations.get_mut(field) {
            slot.retain(|r| *r != target);
            if slot.is_empty() {
                self.relations.shift_remove(field);
            }
        }
    }

    /// True when every criterion matches. The `id` criterion compares against
    /// the store identity; everything else against attributes, loosely.
    pub fn matches(&self, criteria: &Record) -> bool {
        criteria.iter().all(|(field, expected)| {
            if field == "id" {
                return match self.id {
                    Some(id) => Value::Int(id as i64).loosely_equals(expected),
                    None => false,
                };
            }
            self.attributes
                .get(field)
                .is_some_and(|actual| actual.loosely_equals(expected))
        })
    }
}

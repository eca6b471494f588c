//! Idempotent get-or-create of entities from flat fragments.
//!
//! A fragment is what a file carries in place of a store identity: either a
//! bare natural-key string (`"John Doe"`) or a mapping of fields
//! (`{"alternateName": "john"}`). Factories look the entity up by each natural
//! key in priority order and only create it when nothing matches.

use crate::error::FactoryError;
use crate::iri::IriConverter;
use crate::models::{Entity, EntityRef};
use crate::record;
use crate::schema::{Cardinality, EntityKind, RelationSpec};
use crate::store::EntityStore;
use crate::transform::remove_null_fields;
use crate::value::{Record, Value};
use tracing::{debug, info, warn};

pub trait EntityFactory {
    fn kind(&self) -> EntityKind;

    /// Returns the stored entity matching the fragment's natural keys, or
    /// creates, persists and flushes a new one.
    fn create(
        &self,
        store: &mut dyn EntityStore,
        fragment: &Value,
    ) -> Result<EntityRef, FactoryError>;
}

/// Factory driven entirely by the kind's registry entry.
#[derive(Debug, Clone, Copy)]
pub struct NaturalKeyFactory {
    kind: EntityKind,
    iri: IriConverter,
}

impl NaturalKeyFactory {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            iri: IriConverter,
        }
    }

    fn fields(&self, fragment: &Value) -> Result<Record, FactoryError> {
        let spec = self.kind.spec();
        let mut fields = match fragment {
            Value::Map(fields) => fields.clone(),
            Value::Str(text) => record! { spec.natural_keys[0] => text.as_str() },
            other => {
                return Err(FactoryError::InvalidFragment {
                    kind: spec.class_name,
                    found: other.type_name().to_string(),
                })
            }
        };
        remove_null_fields(&mut fields);

        for key in spec.natural_keys {
            if let Some(value) = fields.get(*key).filter(|value| !value.is_scalar()) {
                return Err(FactoryError::InvalidNaturalKey {
                    kind: spec.class_name,
                    key: *key,
                    found: value.type_name().to_string(),
                });
            }
        }
        Ok(fields)
    }

    fn find_existing(&self, store: &dyn EntityStore, fields: &Record) -> Option<EntityRef> {
        for key in self.kind.spec().natural_keys {
            let Some(value) = fields.get(*key) else {
                continue;
            };
            let criteria = record! { *key => value.clone() };
            if let Some(found) = store
                .find_one_by(self.kind, &criteria)
                .and_then(Entity::reference)
            {
                debug!(entity = %found, key = %key, "Matched existing entity");
                return Some(found);
            }
        }
        None
    }

    /// Resolves a relation sub-field: canonical references link directly,
    /// anything else goes through the target kind's factory.
    fn resolve_relation(
        &self,
        store: &mut dyn EntityStore,
        relation: &RelationSpec,
        value: &Value,
    ) -> Result<Vec<EntityRef>, FactoryError> {
        let items: Vec<&Value> = match value {
            Value::Seq(items) => items.iter().collect(),
            other => vec![other],
        };

        let target_factory = NaturalKeyFactory::new(relation.target);
        let mut targets = Vec::with_capacity(items.len());
        for item in items {
            let target = match item {
                Value::Null => continue,
                Value::Str(text) if self.iri.is_reference(text) => {
                    let target = self.iri.from_reference(text)?;
                    if target.kind != relation.target {
                        return Err(FactoryError::InvalidFragment {
                            kind: relation.target.spec().class_name,
                            found: text.clone(),
                        });
                    }
                    target
                }
                fragment => target_factory.create(store, fragment)?,
            };
            if !targets.contains(&target) {
                targets.push(target);
            }
        }

        if relation.cardinality == Cardinality::One && targets.len() > 1 {
            warn!(
                kind = %self.kind,
                field = relation.field,
                count = targets.len(),
                "Single-valued relation got several entities, keeping the first"
            );
            targets.truncate(1);
        }
        Ok(targets)
    }
}

impl EntityFactory for NaturalKeyFactory {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn create(
        &self,
        store: &mut dyn EntityStore,
        fragment: &Value,
    ) -> Result<EntityRef, FactoryError> {
        let spec = self.kind.spec();
        let fields = self.fields(fragment)?;

        if spec.natural_keys.iter().all(|key| !fields.contains_key(*key)) {
            return Err(FactoryError::RequiredFieldsEmpty(spec.required_message));
        }

        if let Some(existing) = self.find_existing(store, &fields) {
            return Ok(existing);
        }

        let mut entity = Entity::new(self.kind);
        for (field, value) in &fields {
            if let Some(attribute) = spec.attribute(field) {
                match attribute.scalar.coerce(value) {
                    Some(coerced) => {
                        entity.attributes.insert(field.clone(), coerced);
                    }
                    None => warn!(
                        kind = %self.kind,
                        field = %field,
                        expected = attribute.scalar.name(),
                        found = value.type_name(),
                        "Skipping attribute with unreadable value"
                    ),
                }
            } else if let Some(relation) = spec.relation(field) {
                let targets = self.resolve_relation(store, relation, value)?;
                if !targets.is_empty() {
                    entity.relations.insert(field.clone(), targets);
                }
            } else {
                debug!(kind = %self.kind, field = %field, "Ignoring unknown fragment field");
            }
        }

        let reference = store.persist(entity)?;
        store.flush()?;
        info!(entity = %reference, "Created entity");
        Ok(reference)
    }
}

/// One factory per entity kind.
#[derive(Debug, Clone)]
pub struct FactorySet {
    factories: [NaturalKeyFactory; 4],
}

impl Default for FactorySet {
    fn default() -> Self {
        Self {
            factories: EntityKind::ALL.map(NaturalKeyFactory::new),
        }
    }
}

impl FactorySet {
    pub fn for_kind(&self, kind: EntityKind) -> &NaturalKeyFactory {
        self.factories
            .iter()
            .find(|factory| factory.kind == kind)
            .unwrap_or_else(|| unreachable!("factory set covers every kind"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonFileStore;

    #[test]
    fn create_is_idempotent() {
        let mut store = JsonFileStore::in_memory();
        let factory = NaturalKeyFactory::new(EntityKind::Person);
        let fragment = Value::from(record! { "alternateName" => "john" });

        let first = factory.create(&mut store, &fragment).unwrap();
        let second = factory.create(&mut store, &fragment).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.count(EntityKind::Person), 1);
    }

    #[test]
    fn structured_natural_key_is_rejected() {
        let mut store = JsonFileStore::in_memory();
        let factory = NaturalKeyFactory::new(EntityKind::Tag);
        let fragments = [
            Value::from(record! { "name" => record! { "x" => "intro" } }),
            Value::from(record! { "name" => vec!["intro"] }),
        ];

        for fragment in &fragments {
            for _ in 0..2 {
                let err = factory.create(&mut store, fragment).unwrap_err();
                assert!(matches!(
                    err,
                    FactoryError::InvalidNaturalKey { kind: "Tag", key: "name", .. }
                ));
            }
        }
        assert_eq!(store.count(EntityKind::Tag), 0);
    }

    #[test]
    fn bare_string_uses_first_natural_key() {
        let mut store = JsonFileStore::in_memory();
        let factory = NaturalKeyFactory::new(EntityKind::Person);
        let created = factory.create(&mut store, &Value::from("John Doe")).unwrap();

        let entity = store.get(created).unwrap();
        assert_eq!(entity.attribute("name"), Some(&Value::from("John Doe")));
        assert_eq!(entity.attribute("alternateName"), None);
    }

    #[test]
    fn lookup_follows_key_priority() {
        let mut store = JsonFileStore::in_memory();
        let factory = NaturalKeyFactory::new(EntityKind::Person);
        let john = factory
            .create(
                &mut store,
                &Value::from(record! { "name" => "John Doe", "alternateName" => "john" }),
            )
            .unwrap();

        // Name does not match, alternate name does
        let found = factory
            .create(
                &mut store,
                &Value::from(record! { "name" => "Johnny", "alternateName" => "john" }),
            )
            .unwrap();
        assert_eq!(found, john);
        assert_eq!(
            store.get(john).unwrap().attribute("name"),
            Some(&Value::from("John Doe"))
        );
    }

    #[test]
    fn empty_natural_keys_fail_with_kind_message() {
        let mut store = JsonFileStore::in_memory();
        let factory = NaturalKeyFactory::new(EntityKind::Person);
        let err = factory
            .create(&mut store, &Value::from(record! { "name" => "", "clips" => Value::Null }))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Person name and alternateName cannot both be empty"
        );

        let err = NaturalKeyFactory::new(EntityKind::Tag)
            .create(&mut store, &Value::from(""))
            .unwrap_err();
        assert_eq!(err.to_string(), "Tag name cannot be empty");
    }

    #[test]
    fn rejects_non_fragment_values() {
        let mut store = JsonFileStore::in_memory();
        let err = NaturalKeyFactory::new(EntityKind::Tag)
            .create(&mut store, &Value::from(vec!["a"]))
            .unwrap_err();
        assert!(matches!(err, FactoryError::InvalidFragment { kind: "Tag", .. }));
    }

    #[test]
    fn nested_fragments_are_resolved_and_linked() {
        let mut store = JsonFileStore::in_memory();
        let clip = NaturalKeyFactory::new(EntityKind::Clip)
            .create(
                &mut store,
                &Value::from(record! {
                    "name" => "Pilot opening",
                    "duration" => "65",
                    "autoplay" => "nope",
                    "partOfEpisode" => record! { "episodeNumber" => "S01E01" },
                    "characters" => vec!["John Doe", "Jane Doe"],
                    "tags" => vec![record! { "name" => "intro" }],
                }),
            )
            .unwrap();

        let entity = store.get(clip).unwrap();
        assert_eq!(entity.attribute("duration"), Some(&Value::Int(65)));
        assert_eq!(entity.attribute("autoplay"), None);
        assert_eq!(entity.related("characters").len(), 2);
        assert_eq!(store.count(EntityKind::Episode), 1);
        assert_eq!(store.count(EntityKind::Tag), 1);

        let episode = entity.related("partOfEpisode")[0];
        assert_eq!(store.get(episode).unwrap().related("clips"), &[clip]);
    }

    #[test]
    fn references_are_linked_directly() {
        let mut store = JsonFileStore::in_memory();
        let tag = NaturalKeyFactory::new(EntityKind::Tag)
            .create(&mut store, &Value::from("intro"))
            .unwrap();
        let clip = NaturalKeyFactory::new(EntityKind::Clip)
            .create(
                &mut store,
                &Value::from(record! { "name" => "c", "tags" => vec!["/api/tags/1"] }),
            )
            .unwrap();
        assert_eq!(store.get(clip).unwrap().related("tags"), &[tag]);
        assert_eq!(store.count(EntityKind::Tag), 1);
    }

    #[test]
    fn factory_set_covers_every_kind() {
        let set = FactorySet::default();
        for kind in EntityKind::ALL {
            assert_eq!(set.for_kind(kind).kind(), kind);
        }
    }
}

//! Entity store boundary and the JSON-file backed implementation.
//!
//! Relations are bidirectional: every link is recorded on both the owning
//! entity and the target's inverse field, and the store keeps the two sides
//! consistent on `link`, `unlink`, `persist` and `remove`.

use crate::config::STORE_VERSION;
use crate::error::StoreError;
use crate::models::{Entity, EntityRef};
use crate::schema::{Cardinality, EntityKind, RelationSpec};
use crate::value::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub trait EntityStore {
    fn find_one_by(&self, kind: EntityKind, criteria: &Record) -> Option<&Entity>;

    /// Every entity of a kind, in id order.
    fn find_all(&self, kind: EntityKind) -> Vec<&Entity>;

    fn get(&self, reference: EntityRef) -> Option<&Entity>;

    /// Inserts a new entity (no id) or replaces a stored one (id set). The
    /// entity's relations are authoritative: inverse sides of removed and
    /// added links are updated to match.
    fn persist(&mut self, entity: Entity) -> Result<EntityRef, StoreError>;

    fn remove(&mut self, reference: EntityRef) -> Result<Entity, StoreError>;

    fn link(&mut self, owner: EntityRef, field: &str, target: EntityRef) -> Result<(), StoreError>;

    fn unlink(&mut self, owner: EntityRef, field: &str, target: EntityRef)
        -> Result<(), StoreError>;

    /// Commits pending writes.
    fn flush(&mut self) -> Result<(), StoreError>;
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
struct Table {
    next_id: u64,
    rows: BTreeMap<u64, Entity>,
}

#[derive(Serialize, Deserialize, Debug)]
struct StoreFile {
    version: u32,
    /// Keyed by table name
    tables: BTreeMap<String, Table>,
}

#[derive(Debug, Default)]
pub struct JsonFileStore {
    path: Option<PathBuf>,
    tables: BTreeMap<EntityKind, Table>,
    dirty: bool,
}

fn unknown_relation(kind: EntityKind, field: &str) -> StoreError {
    StoreError::UnknownRelation {
        kind: kind.to_string(),
        field: field.to_string(),
    }
}

impl JsonFileStore {
    /// Opens the store file at `path`. A missing file yields an empty store
    /// that will be created on the first flush.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            info!(path = %path.display(), "Store file not found, starting empty");
            return Ok(Self {
                path: Some(path),
                ..Self::default()
            });
        }

        let text = fs::read_to_string(&path)?;
        let file: StoreFile = serde_json::from_str(&text)?;
        if file.version != STORE_VERSION {
            return Err(StoreError::VersionMismatch {
                found: file.version,
                expected: STORE_VERSION,
            });
        }

        let mut tables = BTreeMap::new();
        for (name, table) in file.tables {
            match EntityKind::from_table_name(&name) {
                Some(kind) => {
                    tables.insert(kind, table);
                }
                None => debug!(table = %name, "Ignoring unknown table in store file"),
            }
        }

        let rows: usize = tables.values().map(|t: &Table| t.rows.len()).sum();
        info!(path = %path.display(), rows, "Loaded entity store");

        Ok(Self {
            path: Some(path),
            tables,
            dirty: false,
        })
    }

    /// A store that lives only in memory; `flush` is a no-op.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.tables.get(&kind).map_or(0, |t| t.rows.len())
    }

    fn entity_mut(&mut self, reference: EntityRef) -> Result<&mut Entity, StoreError> {
        self.tables
            .get_mut(&reference.kind)
            .and_then(|t| t.rows.get_mut(&reference.id))
            .ok_or_else(|| StoreError::NotFound(reference.to_string()))
    }

    fn require(&self, reference: EntityRef) -> Result<&Entity, StoreError> {
        self.get(reference)
            .ok_or_else(|| StoreError::NotFound(reference.to_string()))
    }

    fn relation(kind: EntityKind, field: &str) -> Result<&'static RelationSpec, StoreError> {
        kind.spec()
            .relation(field)
            .ok_or_else(|| unknown_relation(kind, field))
    }

    fn check_target(
        kind: EntityKind,
        relation: &RelationSpec,
        target: EntityRef,
    ) -> Result<(), StoreError> {
        if target.kind != relation.target {
            return Err(StoreError::WrongTarget {
                kind: kind.to_string(),
                field: relation.field.to_string(),
                expected: relation.target.to_string(),
                actual: target.kind.to_string(),
            });
        }
        Ok(())
    }

    /// Records `target` on one side of a relation. When a to-one field gets
    /// replaced, the previously linked entity drops its inverse link.
    fn attach_side(
        &mut self,
        owner: EntityRef,
        relation: &RelationSpec,
        target: EntityRef,
    ) -> Result<(), StoreError> {
        let single = relation.cardinality == Cardinality::One;
        let previous = self.entity_mut(owner)?.attach(relation.field, target, single);
        if let Some(previous) = previous {
            self.entity_mut(previous)?.detach(relation.inverse, owner);
        }
        Ok(())
    }

    fn validate(&self, entity: &Entity) -> Result<(), StoreError> {
        if let Some(reference) = entity.reference() {
            self.require(reference)?;
        }
        for (field, targets) in &entity.relations {
            let relation = Self::relation(entity.kind, field)?;
            if relation.cardinality == Cardinality::One && targets.len() > 1 {
                return Err(StoreError::TooManyTargets {
                    kind: entity.kind.to_string(),
                    field: field.clone(),
                    count: targets.len(),
                });
            }
            for target in targets {
                Self::check_target(entity.kind, relation, *target)?;
                self.require(*target)?;
            }
        }
        Ok(())
    }
}

impl EntityStore for JsonFileStore {
    fn find_one_by(&self, kind: EntityKind, criteria: &Record) -> Option<&Entity> {
        self.tables
            .get(&kind)?
            .rows
            .values()
            .find(|entity| entity.matches(criteria))
    }

    fn find_all(&self, kind: EntityKind) -> Vec<&Entity> {
        self.tables
            .get(&kind)
            .map(|t| t.rows.values().collect())
            .unwrap_or_default()
    }

    fn get(&self, reference: EntityRef) -> Option<&Entity> {
        self.tables.get(&reference.kind)?.rows.get(&reference.id)
    }

    fn persist(&mut self, mut entity: Entity) -> Result<EntityRef, StoreError> {
        self.validate(&entity)?;

        let desired = std::mem::take(&mut entity.relations);
        let table = self.tables.entry(entity.kind).or_default();
        let reference = match entity.id {
            Some(id) => {
                // Keep current links so reconciliation below sees the diff
                if let Some(stored) = table.rows.get(&id) {
                    entity.relations = stored.relations.clone();
                }
                EntityRef {
                    kind: entity.kind,
                    id,
                }
            }
            None => {
                table.next_id += 1;
                entity.id = Some(table.next_id);
                EntityRef {
                    kind: entity.kind,
                    id: table.next_id,
                }
            }
        };
        let current = entity.relations.clone();
        table.rows.insert(reference.id, entity);

        for relation in reference.kind.spec().relations {
            let wanted = desired.get(relation.field).map(Vec::as_slice).unwrap_or(&[]);
            let held = current.get(relation.field).map(Vec::as_slice).unwrap_or(&[]);

            for stale in held.iter().filter(|r| !wanted.contains(r)) {
                self.unlink(reference, relation.field, *stale)?;
            }
            for target in wanted {
                self.link(reference, relation.field, *target)?;
            }
            if !wanted.is_empty() {
                let mut ordered = wanted.to_vec();
                ordered.dedup();
                self.entity_mut(reference)?
                    .relations
                    .insert(relation.field.to_string(), ordered);
            }
        }

        self.dirty = true;
        debug!(entity = %reference, "Persisted entity");
        Ok(reference)
    }

    fn remove(&mut self, reference: EntityRef) -> Result<Entity, StoreError> {
        let links: Vec<(String, EntityRef)> = self
            .require(reference)?
            .relations
            .iter()
            .flat_map(|(field, targets)| targets.iter().map(move |t| (field.clone(), *t)))
            .collect();
        for (field, target) in links {
            self.unlink(reference, &field, target)?;
        }

        let removed = self
            .tables
            .get_mut(&reference.kind)
            .and_then(|t| t.rows.remove(&reference.id))
            .ok_or_else(|| StoreError::NotFound(reference.to_string()))?;
        self.dirty = true;
        Ok(removed)
    }

    fn link(&mut self, owner: EntityRef, field: &str, target: EntityRef) -> Result<(), StoreError> {
        let relation = Self::relation(owner.kind, field)?;
        Self::check_target(owner.kind, relation, target)?;
        self.require(owner)?;
        self.require(target)?;

        self.attach_side(owner, relation, target)?;
        self.attach_side(target, relation.inverse_spec(), owner)?;
        self.dirty = true;
        Ok(())
    }

    fn unlink(
        &mut self,
        owner: EntityRef,
        field: &str,
        target: EntityRef,
    ) -> Result<(), StoreError> {
        let relation = Self::relation(owner.kind, field)?;
        self.entity_mut(owner)?.detach(field, target);
        if let Ok(other) = self.entity_mut(target) {
            other.detach(relation.inverse, owner);
        }
        self.dirty = true;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !self.dirty && path.exists() {
            return Ok(());
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = StoreFile {
            version: STORE_VERSION,
            tables: self
                .tables
                .iter()
                .map(|(kind, table)| (kind.spec().table_name.to_string(), table.clone()))
                .collect(),
        };
        let text = serde_json::to_string_pretty(&file)?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, text)?;
        fs::rename(&tmp_path, path)?;

        self.dirty = false;
        debug!(path = %path.display(), "Store flushed");
        Ok(())
    }
}

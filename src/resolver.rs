//! Replaces natural-key fragments in a record with canonical references.
//!
//! Resolution is best-effort: a fragment that cannot be fetched or created
//! becomes a null reference and the failure is logged. Only malformed calls
//! (empty record, missing key, wrong shape) surface as errors.

use crate::error::{FactoryError, StoreError, TransformError};
use crate::factory::EntityFactory;
use crate::iri::IriConverter;
use crate::record;
use crate::store::EntityStore;
use crate::transform::{require_key, require_key_and_property};
use crate::value::{Record, Value};
use tracing::error;

#[derive(Debug, Default, Clone, Copy)]
pub struct RelationshipResolver {
    iri: IriConverter,
}

impl RelationshipResolver {
    pub fn new(iri: IriConverter) -> Self {
        Self { iri }
    }

    /// Resolves one fragment to a canonical reference. A reference that
    /// already points at a stored entity of the right kind is returned as is.
    pub fn resolve(
        &self,
        fragment: &Value,
        factory: &dyn EntityFactory,
        store: &mut dyn EntityStore,
    ) -> Result<String, FactoryError> {
        if let Value::Str(text) = fragment {
            if self.iri.is_reference(text) {
                let reference = self.iri.from_reference(text)?;
                if reference.kind != factory.kind() {
                    return Err(FactoryError::InvalidFragment {
                        kind: factory.kind().spec().class_name,
                        found: text.clone(),
                    });
                }
                if store.get(reference).is_none() {
                    return Err(StoreError::NotFound(reference.to_string()).into());
                }
                return Ok(self.iri.to_reference(reference));
            }
        }
        let reference = factory.create(store, fragment)?;
        Ok(self.iri.to_reference(reference))
    }

    fn resolve_or_null(
        &self,
        key: &str,
        fragment: &Value,
        factory: &dyn EntityFactory,
        store: &mut dyn EntityStore,
    ) -> Value {
        match self.resolve(fragment, factory, store) {
            Ok(reference) => Value::Str(reference),
            Err(e) => {
                error!(
                    field = key,
                    kind = %factory.kind(),
                    error = %e,
                    "Failed to resolve relationship"
                );
                Value::Null
            }
        }
    }

    /// Treats the field's value as one fragment and replaces it with the
    /// resolved reference, or null when resolution fails.
    pub fn fix_relationship(
        &self,
        record: &mut Record,
        key: &str,
        factory: &dyn EntityFactory,
        store: &mut dyn EntityStore,
    ) -> Result<(), TransformError> {
        let fragment = require_key(record, key)?.clone();
        let resolved = self.resolve_or_null(key, &fragment, factory, store);
        record.insert(key.to_string(), resolved);
        Ok(())
    }

    /// Like [`fix_relationship`](Self::fix_relationship) for a sequence of
    /// fragments. Bare strings are read as `{property: string}`. Each element
    /// resolves independently; a failed one leaves a null in its slot.
    pub fn fix_relationships(
        &self,
        record: &mut Record,
        key: &str,
        property: &str,
        factory: &dyn EntityFactory,
        store: &mut dyn EntityStore,
    ) -> Result<(), TransformError> {
        let Value::Seq(fragments) = require_key_and_property(record, key, property)? else {
            return Err(TransformError::InvalidItem(key.to_string()));
        };
        let fragments = fragments.clone();

        let resolved = fragments
            .iter()
            .map(|fragment| match fragment {
                Value::Str(text) if !self.iri.is_reference(text) => {
                    let wrapped = Value::from(record! { property => text.as_str() });
                    self.resolve_or_null(key, &wrapped, factory, store)
                }
                other => self.resolve_or_null(key, other, factory, store),
            })
            .collect();
        record.insert(key.to_string(), Value::Seq(resolved));
        Ok(())
    }
}

use crate::config::REFERENCE_PREFIX;
use crate::error::ReferenceError;
use crate::models::EntityRef;
use crate::schema::EntityKind;
use once_cell::sync::Lazy;
use regex::Regex;

static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^{}/([a-z][a-z0-9_]*)/([1-9][0-9]*)$",
        regex::escape(REFERENCE_PREFIX)
    ))
    .unwrap()
});

/// Converts between store identities and canonical reference strings
/// (`/api/people/3`).
#[derive(Debug, Default, Clone, Copy)]
pub struct IriConverter;

impl IriConverter {
    pub fn to_reference(&self, reference: EntityRef) -> String {
        format!(
            "{REFERENCE_PREFIX}/{}/{}",
            reference.kind.spec().collection,
            reference.id
        )
    }

    pub fn from_reference(&self, text: &str) -> Result<EntityRef, ReferenceError> {
        let caps = REFERENCE_RE
            .captures(text.trim())
            .ok_or_else(|| ReferenceError::Malformed(text.to_string()))?;
        let collection = &caps[1];
        let kind = EntityKind::from_collection(collection).ok_or_else(|| {
            ReferenceError::UnknownCollection {
                collection: collection.to_string(),
                reference: text.to_string(),
            }
        })?;
        let id = caps[2]
            .parse()
            .map_err(|_| ReferenceError::Malformed(text.to_string()))?;
        Ok(EntityRef { kind, id })
    }

    /// True when `text` has the shape of a canonical reference.
    pub fn is_reference(&self, text: &str) -> bool {
        REFERENCE_RE.is_match(text.trim())
    }
}

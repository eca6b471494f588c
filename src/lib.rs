//! Charon: CSV/JSON exchange for a media catalogue entity store
//!
//! This crate moves clips, episodes, people and tags between flat files and a
//! persistent entity store:
//!
//! 1. **Export** -- Normalize every entity of one kind, reshape each record for
//!    the target format and write `<plural>.<ext>` to the export directory
//! 2. **Import** -- Locate the source file, decode its rows, resolve every
//!    relationship fragment to a canonical reference (creating missing
//!    targets on the fly) and insert one entity per row
//! 3. **Update** -- Like import, but match each row to a stored entity by a
//!    unique property and merge the two, optionally letting the file win
//!
//! # Architecture
//!
//! - **Records, not entities, cross format boundaries** -- Encoders only see
//!   ordered maps of [`value::Value`]; [`normalizer`] converts between records
//!   and stored [`models::Entity`] values
//! - **Per-kind encoders** -- Each `<kind>:<csv|json>` encoder applies an
//!   ordered list of field transforms; a failing step is logged and skipped
//! - **Find-or-create factories** -- Relationship fragments are looked up by
//!   natural key before anything new is created, so repeated names collapse
//!   onto one entity
//! - **Bidirectional relations** -- The store keeps both sides of every
//!   relation in sync and rewrites its JSON file atomically on flush
//!
//! # Key Modules
//!
//! - [`export`] -- Export run
//! - [`import`] -- Import and update runs
//! - [`options`] -- Class, encoder and file name inference
//! - [`encoders`] -- Per-kind record encoders and the serializer registry
//! - [`codec`] -- Raw CSV and JSON encoding with dotted-key flattening
//! - [`transform`] -- Field transforms shared by the encoders
//! - [`datetime`] -- Date and duration parsing for clip fields
//! - [`resolver`] -- Relationship fragment to reference resolution
//! - [`factory`] -- Natural-key find-or-create for each kind
//! - [`normalizer`] -- Entity to record conversion and back
//! - [`merge`] -- Record merging for updates
//! - [`store`] -- Entity store trait and its JSON file implementation
//! - [`iri`] -- Canonical reference strings (`/api/people/3`)
//! - [`schema`] -- Static description of each entity kind
//! - [`inflector`] -- Pluralization and case conversion
//! - [`files`] -- Source file lookup and output writing
//! - [`stats`] -- Run summaries
//! - [`config`] -- Defaults
//!
//! # Example Usage
//!
//! ```bash
//! # Import people, inferring class and encoder from the file name
//! charon import -f people.csv
//!
//! # Merge clip rows into existing clips matched by name, file values winning
//! charon update -f clips.json -p name -o
//!
//! # Export tags as CSV
//! charon export -x tag:csv
//! ```

pub mod codec;
pub mod config;
pub mod datetime;
pub mod encoders;
pub mod error;
pub mod export;
pub mod factory;
pub mod files;
pub mod import;
pub mod inflector;
pub mod iri;
pub mod merge;
pub mod models;
pub mod normalizer;
pub mod options;
pub mod resolver;
pub mod schema;
pub mod stats;
pub mod store;
pub mod transform;
pub mod value;

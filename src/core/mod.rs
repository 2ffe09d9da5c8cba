//! Core exchange logic
//!
//! This module contains the import/export components:
//! - `traits` - Record, tabular source/sink and store abstractions
//! - `schema` - Runtime field and association descriptors
//! - `coerce` - Default string coercion and formatting of field values
//! - `importer` - Decode, merge and upsert of tabular rows
//! - `exporter` - Batched read and tabular output of stored records
//! - `memory_store` - Vec-backed store adapter
//! - `batching` - Statement sizing helpers

pub mod batching;
pub mod coerce;
pub mod exporter;
pub mod importer;
pub mod memory_store;
pub mod schema;
pub mod traits;

#[cfg(test)]
pub(crate) mod fixtures;

pub use coerce::{format_value, set_value_from_string, Field, Kind};
pub use exporter::Exporter;
pub use importer::Importer;
pub use memory_store::MemoryStore;
pub use schema::{to_snake_case, AssociationAccessor, FieldAccessor, Schema};
pub use traits::{KeyFilter, OnConflict, Query, Reader, Resource, Store, Writer};

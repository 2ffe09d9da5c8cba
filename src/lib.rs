//! Record Exchange Library
//! # Overview
//!
//! This library moves records between tabular files and a record store. An
//! [`Importer`] decodes rows, merges them into stored records matched by
//! primary key and writes them back with a batched upsert; an [`Exporter`]
//! reads every stored record and writes one row per record.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Metas, options, summaries and errors
//! - [`core`] - Business logic components:
//!   - [`core::schema`] - Named field accessors registered by a [`Resource`]
//!   - [`core::coerce`] - Default string coercion per field kind
//!   - [`core::importer`] - Import pipeline
//!   - [`core::exporter`] - Export pipeline
//!   - [`core::memory_store`] - In-memory store adapter
//! - [`io`] - CSV reader and writer
//!
//! # Metas
//!
//! Each [`Meta`] binds one field to one column:
//!
//! - **field**: logical field name registered in the record's schema
//! - **header**: column label, defaults to the field name
//! - **primary key**: part of the identity used to match stored records
//! - **setter / valuer**: custom conversion replacing default coercion
//!
//! # Logging
//!
//! Import and export phases emit `tracing` events; no subscriber is
//! installed by the library.

pub mod core;
pub mod io;
pub mod types;

pub use core::{
    Exporter, Field, Importer, KeyFilter, Kind, MemoryStore, OnConflict, Query, Reader, Resource,
    Schema, Store, Writer,
};
pub use types::{
    BoxError, CoercionError, ExchangeError, ExecOptions, ExportSummary, ImportSummary, Meta,
    MetaValues,
};

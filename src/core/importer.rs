//! Tabular import into a record store
//!
//! This module provides the Importer that decodes rows from a [`Reader`],
//! merges them into existing records matched by primary key, and writes the
//! result back with one batched upsert.
//!
//! # Phases
//!
//! 1. **Decode**: bind every meta to a header column, build one
//!    [`MetaValues`] per row, run the row validators
//! 2. **Preload**: fetch the stored records matching the decoded keys
//! 3. **Merge**: apply every meta to either a working copy of the stored
//!    record or a fresh record
//! 4. **Write**: upsert created and changed records; unchanged records are
//!    skipped
//!
//! Any error aborts the import. Decode, validation and coercion failures are
//! detected before the store is written.
//!
//! # Identity
//!
//! A row's key is the tuple of its primary-key values. Rows with no
//! primary-key metas, or whose key values are all empty, always create a new
//! record. Only complete keys are preloaded, but a partial key still matches
//! a stored record loaded by a full scan.
//!
//! Every declared column is authoritative: an empty cell zeroes its field
//! even on a stored record.

use crate::core::batching::{per_statement, upsert_batch_size};
use crate::core::schema::{FieldAccessor, Schema};
use crate::core::traits::{KeyFilter, OnConflict, Query, Reader, Resource, Store};
use crate::types::{
    BoxError, ExchangeError, ExecOptions, ImportSummary, Meta, MetaValues, Validator,
};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Identity tuple of a record
type Key = Vec<String>;

/// Rows decoded from a reader
struct Decoded {
    rows: Vec<MetaValues>,
    /// Distinct complete keys, in first-seen order
    keys: Vec<Key>,
}

/// A record produced by the merge phase
struct Merged<R> {
    record: R,
    /// State of the stored record before any row was applied
    original: Option<R>,
}

/// Importer for one record type
///
/// Configured once with metas, associations and validators; `exec` can then
/// run any number of imports.
///
/// # Examples
///
/// ```
/// use record_exchange::io::CsvReader;
/// use record_exchange::{ExecOptions, Importer, MemoryStore, Meta, Resource, Schema};
///
/// #[derive(Debug, Clone, Default, PartialEq)]
/// struct Person {
///     id: u64,
///     name: String,
/// }
///
/// impl Resource for Person {
///     fn describe(schema: &mut Schema<Self>) {
///         schema
///             .field("ID", |p| &p.id, |p| &mut p.id)
///             .field("Name", |p| &p.name, |p| &mut p.name);
///     }
/// }
///
/// let importer = Importer::<Person>::new().metas(vec![
///     Meta::new("ID").primary_key(true),
///     Meta::new("Name").header("Full name"),
/// ]);
///
/// let mut store = MemoryStore::new();
/// let mut reader = CsvReader::new("ID,Full name\n1,Tom\n".as_bytes()).unwrap();
/// let summary = importer
///     .exec(&mut store, &mut reader, &ExecOptions::default())
///     .unwrap();
///
/// assert_eq!(summary.created, 1);
/// assert_eq!(store.records()[0].name, "Tom");
/// ```
pub struct Importer<R> {
    schema: Schema<R>,
    metas: Vec<Meta<R>>,
    associations: Vec<String>,
    validators: Vec<Validator>,
}

impl<R: Resource> Importer<R> {
    /// Create an importer with no metas
    pub fn new() -> Self {
        Importer {
            schema: Schema::of(),
            metas: Vec::new(),
            associations: Vec::new(),
            validators: Vec::new(),
        }
    }

    /// Replace the meta set
    pub fn metas(mut self, metas: impl IntoIterator<Item = Meta<R>>) -> Self {
        self.metas = metas.into_iter().collect();
        self
    }

    /// Replace the associations preloaded and saved with each record
    pub fn associations<S: Into<String>>(mut self, associations: impl IntoIterator<Item = S>) -> Self {
        self.associations = associations.into_iter().map(Into::into).collect();
        self
    }

    /// Add a row validator; validators run in registration order
    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&MetaValues) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Replace the validator list
    pub fn validators(mut self, validators: impl IntoIterator<Item = Validator>) -> Self {
        self.validators = validators.into_iter().collect();
        self
    }

    /// Run one import
    ///
    /// # Arguments
    ///
    /// * `store` - Store holding the existing records and receiving the writes
    /// * `reader` - Tabular source positioned before its first row
    /// * `options` - Statement sizing options
    ///
    /// # Returns
    ///
    /// * `Ok(ImportSummary)` - Counts of decoded rows and written records
    /// * `Err(ExchangeError)` - The first failure; see the module docs
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The meta set or association list is invalid for the record type
    /// - A meta's column is missing from the reader header
    /// - The reader fails, or a validator rejects a row
    /// - A value cannot be coerced or a setter fails
    /// - The store fails to count, query or upsert
    #[instrument(skip_all, fields(resource = std::any::type_name::<R>()))]
    pub fn exec<S, Rd>(
        &self,
        store: &mut S,
        reader: &mut Rd,
        options: &ExecOptions,
    ) -> Result<ImportSummary, ExchangeError>
    where
        S: Store<R> + ?Sized,
        Rd: Reader + ?Sized,
    {
        let primary_keys = self.validate()?;
        let max_params = options.effective_max_params();

        let pk_fields: Vec<&str> = primary_keys
            .iter()
            .map(|&i| self.metas[i].field())
            .collect();
        let pk_accessors = pk_fields
            .iter()
            .map(|field| {
                self.schema
                    .field_named(field)
                    .ok_or_else(|| ExchangeError::field_not_found(field))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let pk_columns: Vec<String> = pk_accessors.iter().map(|a| a.column().to_string()).collect();

        let decoded = self.decode(reader, &pk_fields)?;
        debug!(
            rows = decoded.rows.len(),
            keys = decoded.keys.len(),
            "Decoded rows"
        );

        let stored = self.preload(&*store, decoded.keys, &pk_accessors, &pk_columns, max_params)?;
        debug!(stored = stored.len(), "Preloaded stored records");

        let merged = self.merge(&decoded.rows, stored, &pk_fields)?;

        let mut summary = ImportSummary {
            rows: decoded.rows.len(),
            ..ImportSummary::default()
        };
        let mut records = Vec::with_capacity(merged.len());
        for entry in merged {
            match entry.original {
                Some(original) if original == entry.record => summary.unchanged += 1,
                Some(_) => {
                    summary.updated += 1;
                    records.push(entry.record);
                }
                None => {
                    summary.created += 1;
                    records.push(entry.record);
                }
            }
        }

        if records.is_empty() {
            debug!(unchanged = summary.unchanged, "Nothing to write");
            return Ok(summary);
        }

        let on_conflict = OnConflict {
            columns: pk_columns,
            update_all: true,
        };
        let batch_size = upsert_batch_size(max_params, self.schema.field_count());
        store.upsert_in_batches(records, &on_conflict, &self.associations, batch_size)?;

        debug!(
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            batch_size,
            "Import finished"
        );
        Ok(summary)
    }

    /// Validate the configuration and return the primary-key meta indices
    fn validate(&self) -> Result<Vec<usize>, ExchangeError> {
        let primary_keys = self.schema.validate_metas(&self.metas, &self.associations)?;

        // valuer-only metas still need a field to import into
        if let Some(meta) = self
            .metas
            .iter()
            .find(|m| !m.has_setter() && self.schema.field_named(m.field()).is_none())
        {
            return Err(ExchangeError::field_not_found(meta.field()));
        }

        Ok(primary_keys)
    }

    fn decode<Rd: Reader + ?Sized>(
        &self,
        reader: &mut Rd,
        pk_fields: &[&str],
    ) -> Result<Decoded, ExchangeError> {
        let header = reader.header();
        let mut columns = Vec::with_capacity(self.metas.len());
        for meta in &self.metas {
            let index = header
                .iter()
                .position(|h| h == meta.column_header())
                .ok_or_else(|| ExchangeError::column_not_found(meta.field(), meta.column_header()))?;
            columns.push((index, meta.field()));
        }

        let mut rows = Vec::with_capacity(reader.total());
        let mut keys = Vec::new();
        let mut seen = HashSet::new();
        let mut row_number = 0;
        while reader.next() {
            row_number += 1;
            let cells = reader.read_row()?;

            let mut values = MetaValues::new();
            for &(index, field) in &columns {
                values.set(field, cells.get(index).map(String::as_str).unwrap_or(""));
            }

            if let Some(key) = identity(&values, pk_fields).filter(|key| is_complete(key)) {
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }

            for validator in &self.validators {
                validator(&values).map_err(|e| ExchangeError::validation_failed(row_number, e))?;
            }

            rows.push(values);
        }

        Ok(Decoded { rows, keys })
    }

    /// Fetch the stored records matching `keys`, indexed by identity
    ///
    /// Small key sets relative to the table are looked up directly; otherwise
    /// the whole table is scanned.
    fn preload<S: Store<R> + ?Sized>(
        &self,
        store: &S,
        keys: Vec<Key>,
        pk_accessors: &[&FieldAccessor<R>],
        pk_columns: &[String],
        max_params: usize,
    ) -> Result<HashMap<Key, R>, ExchangeError> {
        let mut stored = HashMap::new();
        if keys.is_empty() {
            return Ok(stored);
        }

        let batch_size = per_statement(max_params, pk_columns.len());
        let total = store.count()?;
        let base = Query::all().preload(&self.associations);

        let mut collect = |records: Vec<R>| -> Result<(), ExchangeError> {
            for record in records {
                let key: Key = pk_accessors.iter().map(|a| a.format(&record)).collect();
                stored.insert(key, record);
            }
            Ok(())
        };

        if keys.len().saturating_mul(100) < total {
            debug!(keys = keys.len(), total, "Looking up stored records by key");
            for group in keys.chunks(batch_size) {
                let query = base.clone().with_keys(KeyFilter {
                    columns: pk_columns.to_vec(),
                    values: group.to_vec(),
                });
                store.find_in_batches(&query, batch_size, &mut collect)?;
            }
        } else {
            debug!(keys = keys.len(), total, "Scanning stored records");
            store.find_in_batches(&base, batch_size, &mut collect)?;
        }

        Ok(stored)
    }

    fn merge(
        &self,
        rows: &[MetaValues],
        mut stored: HashMap<Key, R>,
        pk_fields: &[&str],
    ) -> Result<Vec<Merged<R>>, ExchangeError> {
        let mut merged: Vec<Merged<R>> = Vec::with_capacity(rows.len());
        let mut slots: HashMap<Key, usize> = HashMap::new();

        for (i, values) in rows.iter().enumerate() {
            let slot = match identity(values, pk_fields) {
                Some(key) => match slots.get(&key) {
                    Some(&slot) => {
                        // a repeated new key starts over; stored matches keep accumulating
                        if merged[slot].original.is_none() {
                            merged[slot].record = R::default();
                        }
                        slot
                    }
                    None => {
                        let entry = match stored.remove(&key) {
                            Some(record) => Merged {
                                original: Some(record.clone()),
                                record,
                            },
                            None => Merged {
                                record: R::default(),
                                original: None,
                            },
                        };
                        merged.push(entry);
                        slots.insert(key, merged.len() - 1);
                        merged.len() - 1
                    }
                },
                None => {
                    merged.push(Merged {
                        record: R::default(),
                        original: None,
                    });
                    merged.len() - 1
                }
            };

            self.apply(&mut merged[slot].record, values, i + 1)?;
        }

        Ok(merged)
    }

    /// Apply every meta to `record` in declaration order
    fn apply(&self, record: &mut R, values: &MetaValues, row: usize) -> Result<(), ExchangeError> {
        for meta in &self.metas {
            let raw = values.get(meta.field());

            if let Some(setter) = meta.setter_fn() {
                setter(record, raw, values)
                    .map_err(|e| ExchangeError::setter_failed(meta.field(), row, e))?;
                continue;
            }

            let accessor = self
                .schema
                .field_named(meta.field())
                .ok_or_else(|| ExchangeError::field_not_found(meta.field()))?;
            accessor
                .set(record, raw)
                .map_err(|source| ExchangeError::invalid_value(meta.field(), row, source))?;
        }
        Ok(())
    }
}

/// Identity of a decoded row, if it has one
///
/// Rows with no primary-key metas, or whose key components are all empty,
/// have no identity and always create a record.
fn identity(values: &MetaValues, pk_fields: &[&str]) -> Option<Key> {
    let key: Key = pk_fields
        .iter()
        .map(|field| values.get(field).to_string())
        .collect();
    if key.iter().all(String::is_empty) {
        None
    } else {
        Some(key)
    }
}

/// Whether every component of `key` is set; only such keys drive the preload
fn is_complete(key: &[String]) -> bool {
    key.iter().all(|part| !part.is_empty())
}

impl<R: Resource> Default for Importer<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for Importer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Importer")
            .field("metas", &self.metas)
            .field("associations", &self.associations)
            .field("validators", &self.validators.len())
            .finish()
    }
}

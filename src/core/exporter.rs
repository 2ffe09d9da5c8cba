//! Tabular export from a record store
//!
//! The Exporter reads every stored record in batches, then writes one header
//! row and one data row per record through a [`Writer`]. Records are fully
//! materialized before the first write.

use crate::core::batching::per_statement;
use crate::core::schema::Schema;
use crate::core::traits::{Query, Resource, Store, Writer};
use crate::types::{ExchangeError, ExecOptions, ExportSummary, Meta};
use std::fmt;
use tracing::{debug, instrument};

/// Exporter for one record type
pub struct Exporter<R> {
    schema: Schema<R>,
    metas: Vec<Meta<R>>,
    associations: Vec<String>,
}

impl<R: Resource> Exporter<R> {
    /// Create an exporter with no metas
    pub fn new() -> Self {
        Exporter {
            schema: Schema::of(),
            metas: Vec::new(),
            associations: Vec::new(),
        }
    }

    /// Replace the meta set; column order follows meta order
    pub fn metas(mut self, metas: impl IntoIterator<Item = Meta<R>>) -> Self {
        self.metas = metas.into_iter().collect();
        self
    }

    /// Replace the associations eager-loaded for valuers
    pub fn associations<S: Into<String>>(mut self, associations: impl IntoIterator<Item = S>) -> Self {
        self.associations = associations.into_iter().map(Into::into).collect();
        self
    }

    /// Run one export
    ///
    /// # Returns
    ///
    /// * `Ok(ExportSummary)` - Number of data rows written
    /// * `Err(ExchangeError)` - Invalid configuration, a store or writer
    ///   failure, or a failing valuer
    #[instrument(skip_all, fields(resource = std::any::type_name::<R>()))]
    pub fn exec<S, W>(
        &self,
        store: &S,
        writer: &mut W,
        options: &ExecOptions,
    ) -> Result<ExportSummary, ExchangeError>
    where
        S: Store<R> + ?Sized,
        W: Writer + ?Sized,
    {
        let primary_keys = self.validate()?;
        let batch_size = per_statement(options.effective_max_params(), primary_keys.len());

        let mut records = Vec::new();
        store.find_in_batches(
            &Query::all().preload(&self.associations),
            batch_size,
            &mut |batch| {
                records.extend(batch);
                Ok(())
            },
        )?;
        debug!(records = records.len(), batch_size, "Loaded records");

        let header: Vec<String> = self
            .metas
            .iter()
            .map(|m| m.column_header().to_string())
            .collect();
        writer.write_header(&header)?;

        for record in &records {
            let row = self.row(record)?;
            writer.write_row(&row)?;
        }
        writer.flush()?;

        Ok(ExportSummary {
            rows: records.len(),
        })
    }

    /// Validate the configuration and return the primary-key meta indices
    fn validate(&self) -> Result<Vec<usize>, ExchangeError> {
        let primary_keys = self.schema.validate_metas(&self.metas, &self.associations)?;

        // columns without a valuer are formatted from a schema field
        if let Some(meta) = self
            .metas
            .iter()
            .find(|m| !m.has_valuer() && self.schema.field_named(m.field()).is_none())
        {
            return Err(ExchangeError::field_not_found(meta.field()));
        }

        Ok(primary_keys)
    }

    fn row(&self, record: &R) -> Result<Vec<String>, ExchangeError> {
        self.metas
            .iter()
            .map(|meta| match meta.valuer_fn() {
                Some(valuer) => {
                    valuer(record).map_err(|e| ExchangeError::valuer_failed(meta.field(), e))
                }
                None => self
                    .schema
                    .field_named(meta.field())
                    .map(|accessor| accessor.format(record))
                    .ok_or_else(|| ExchangeError::field_not_found(meta.field())),
            })
            .collect()
    }
}

impl<R: Resource> Default for Exporter<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for Exporter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exporter")
            .field("metas", &self.metas)
            .field("associations", &self.associations)
            .finish()
    }
}

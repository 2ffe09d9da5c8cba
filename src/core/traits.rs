//! Core traits for record types, tabular sources/sinks, and persistence
//!
//! The importer and exporter are written against these abstractions so any
//! tabular format and any store with upsert support can be plugged in.

use crate::core::schema::Schema;
use crate::types::ExchangeError;
use std::fmt;

/// A record type the engine can import into and export from
///
/// `Default` provides fresh records for new rows, `Clone` the working copies
/// of stored records, and `PartialEq` the unchanged-record detection.
pub trait Resource: Default + Clone + PartialEq + fmt::Debug + 'static {
    /// Register the named fields and associations of this type
    fn describe(schema: &mut Schema<Self>);
}

/// Row-oriented tabular source
pub trait Reader {
    /// Column labels of the source
    fn header(&self) -> &[String];

    /// Advance to the next data row; `false` once exhausted
    fn next(&mut self) -> bool;

    /// Cells of the current row
    fn read_row(&mut self) -> Result<Vec<String>, ExchangeError>;

    /// Number of data rows
    fn total(&self) -> usize;
}

/// Row-oriented tabular sink
pub trait Writer {
    /// Write the column labels; called exactly once before any row
    fn write_header(&mut self, header: &[String]) -> Result<(), ExchangeError>;

    /// Write one data row
    fn write_row(&mut self, row: &[String]) -> Result<(), ExchangeError>;

    /// Flush buffered output
    fn flush(&mut self) -> Result<(), ExchangeError>;
}

/// Restricts a query to records whose columns match one of the key tuples
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyFilter {
    /// DB-style column names, in key order
    pub columns: Vec<String>,
    /// Key tuples; each has one value per column
    pub values: Vec<Vec<String>>,
}

/// Read query issued by the importer and exporter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Associations to eager-load with every record
    pub preload: Vec<String>,
    /// Optional identity filter; `None` scans everything
    pub keys: Option<KeyFilter>,
}

impl Query {
    /// Query every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Eager-load the named associations
    pub fn preload(mut self, associations: &[String]) -> Self {
        self.preload = associations.to_vec();
        self
    }

    /// Restrict the query to the given identity tuples
    pub fn with_keys(mut self, filter: KeyFilter) -> Self {
        self.keys = Some(filter);
        self
    }
}

/// Conflict resolution for batched upserts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnConflict {
    /// Conflict target columns; empty means plain insert
    pub columns: Vec<String>,
    /// Overwrite every column of a conflicting record
    pub update_all: bool,
}

/// Persistence layer the engine reads from and writes to
///
/// Implementations decide transactionality; the engine issues one
/// `upsert_in_batches` call per import.
pub trait Store<R> {
    /// Number of stored records
    fn count(&self) -> Result<usize, ExchangeError>;

    /// Stream query results to `on_batch` in chunks of at most `batch_size`
    ///
    /// An error returned by `on_batch` stops the scan and is returned as is.
    fn find_in_batches(
        &self,
        query: &Query,
        batch_size: usize,
        on_batch: &mut dyn FnMut(Vec<R>) -> Result<(), ExchangeError>,
    ) -> Result<(), ExchangeError>;

    /// Insert or update `records` in statements of at most `batch_size`
    ///
    /// `associations` lists the associations saved together with each record.
    fn upsert_in_batches(
        &mut self,
        records: Vec<R>,
        on_conflict: &OnConflict,
        associations: &[String],
        batch_size: usize,
    ) -> Result<(), ExchangeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builders() {
        let filter = KeyFilter {
            columns: vec!["id".to_string()],
            values: vec![vec!["1".to_string()], vec!["2".to_string()]],
        };
        let query = Query::all()
            .preload(&["Hobbies".to_string()])
            .with_keys(filter.clone());

        assert_eq!(query.preload, vec!["Hobbies".to_string()]);
        assert_eq!(query.keys, Some(filter));
        assert_eq!(Query::all().keys, None);
    }
}

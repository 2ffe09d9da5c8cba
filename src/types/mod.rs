//! Types module
//!
//! Contains the data structures shared by the importer and exporter:
//! - `error`: Error types for the exchange engine
//! - `meta`: Column descriptors and decoded row values
//! - `options`: Execution options
//! - `summary`: Outcome counters

pub mod error;
pub mod meta;
pub mod options;
pub mod summary;

pub use error::{BoxError, CoercionError, ExchangeError};
pub use meta::{Meta, MetaValues, Setter, Validator, Valuer};
pub use options::{ExecOptions, DEFAULT_MAX_PARAMS_PER_SQL, MAX_PARAMS_PER_SQL_ENV};
pub use summary::{ExportSummary, ImportSummary};

//! I/O module
//!
//! CSV adapters for the [`Reader`](crate::Reader) and
//! [`Writer`](crate::Writer) contracts.
//!
//! # Components
//!
//! - `csv_reader` - Materialized CSV source with a row cursor
//! - `csv_writer` - CSV sink enforcing header-first output

pub mod csv_reader;
pub mod csv_writer;

pub use csv_reader::CsvReader;
pub use csv_writer::CsvWriter;

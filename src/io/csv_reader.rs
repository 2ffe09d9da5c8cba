//! CSV implementation of the [`Reader`] contract
//!
//! # Design
//!
//! The CsvReader reads the whole input up front using csv::Reader, so
//! `total()` is exact and the cursor can be driven independently of the
//! underlying stream. Every cell is whitespace-trimmed and rows may be
//! shorter or longer than the header.
//!
//! ```no_run
//! use record_exchange::io::CsvReader;
//! use record_exchange::Reader;
//! use std::path::Path;
//!
//! let mut reader = CsvReader::from_path(Path::new("people.csv")).unwrap();
//! println!("columns: {:?}", reader.header());
//! while reader.next() {
//!     println!("{:?}", reader.read_row().unwrap());
//! }
//! ```
//!
//! # Error Handling
//!
//! - Missing files and I/O failures are returned from the constructors
//! - Malformed CSV is reported with the offending line number
//! - Calling `read_row` without a current row is a `ReaderState` error

use crate::core::traits::Reader;
use crate::types::ExchangeError;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io;
use std::path::Path;

/// Materialized CSV source with a 1-based row cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvReader {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    /// 0 before the first `next()`, then the 1-based index of the current row
    cursor: usize,
}

impl CsvReader {
    /// Read CSV data from any byte source
    ///
    /// The CSV reader is configured to:
    /// - Trim whitespace from all fields
    /// - Allow flexible field counts
    /// - Use an 8KB buffer
    ///
    /// # Returns
    ///
    /// * `Ok(CsvReader)` with every row loaded
    /// * `Err(ExchangeError)` on malformed CSV or an I/O failure
    pub fn new<R: io::Read>(source: R) -> Result<Self, ExchangeError> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(source);

        let header = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self {
            header,
            rows,
            cursor: 0,
        })
    }

    /// Open and read a CSV file
    pub fn from_path(path: &Path) -> Result<Self, ExchangeError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ExchangeError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => ExchangeError::from(e),
        })?;

        Self::new(file)
    }
}

impl Reader for CsvReader {
    fn header(&self) -> &[String] {
        &self.header
    }

    fn next(&mut self) -> bool {
        if self.cursor < self.rows.len() {
            self.cursor += 1;
            true
        } else {
            self.cursor = self.rows.len() + 1;
            false
        }
    }

    /// Cells of the current row, padded with `""` up to the header width
    fn read_row(&mut self) -> Result<Vec<String>, ExchangeError> {
        if self.cursor == 0 {
            return Err(ExchangeError::reader_state("read_row called before next"));
        }
        let row = self
            .rows
            .get(self.cursor - 1)
            .ok_or_else(|| ExchangeError::reader_state("no current row, reader is exhausted"))?;

        let mut cells = row.clone();
        if cells.len() < self.header.len() {
            cells.resize(self.header.len(), String::new());
        }
        Ok(cells)
    }

    fn total(&self) -> usize {
        self.rows.len()
    }
}

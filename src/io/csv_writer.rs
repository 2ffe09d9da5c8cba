//! CSV implementation of the [`Writer`] contract
//!
//! Wraps csv::Writer. The header is written through the same path as the
//! data rows, so the csv crate's own header handling is disabled.

use crate::core::traits::Writer;
use crate::types::ExchangeError;
use csv::WriterBuilder;
use std::io;

/// CSV sink enforcing header-first output
pub struct CsvWriter<W: io::Write> {
    writer: csv::Writer<W>,
    header_written: bool,
}

impl<W: io::Write> CsvWriter<W> {
    /// Create a writer over any byte sink
    pub fn new(sink: W) -> Self {
        let writer = WriterBuilder::new().has_headers(false).from_writer(sink);

        Self {
            writer,
            header_written: false,
        }
    }

    /// Flush and return the underlying sink
    pub fn into_inner(self) -> Result<W, ExchangeError> {
        self.writer
            .into_inner()
            .map_err(|e| ExchangeError::from(e.into_error()))
    }
}

impl<W: io::Write> Writer for CsvWriter<W> {
    fn write_header(&mut self, header: &[String]) -> Result<(), ExchangeError> {
        if self.header_written {
            return Err(ExchangeError::writer_state("header already written"));
        }
        self.writer.write_record(header)?;
        self.header_written = true;
        Ok(())
    }

    fn write_row(&mut self, row: &[String]) -> Result<(), ExchangeError> {
        if !self.header_written {
            return Err(ExchangeError::writer_state("row written before header"));
        }
        self.writer.write_record(row)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ExchangeError> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_header_then_rows() {
        let mut writer = CsvWriter::new(Vec::new());

        writer.write_header(&strings(&["ID", "Name"])).unwrap();
        writer.write_row(&strings(&["1", "Tom"])).unwrap();
        writer.write_row(&strings(&["2", ""])).unwrap();
        writer.flush().unwrap();

        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(output, "ID,Name\n1,Tom\n2,\n");
    }

    #[test]
    fn test_cells_are_quoted_when_needed() {
        let mut writer = CsvWriter::new(Vec::new());

        writer.write_header(&strings(&["Name"])).unwrap();
        writer.write_row(&strings(&["Tom, Jr."])).unwrap();

        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(output, "Name\n\"Tom, Jr.\"\n");
    }

    #[test]
    fn test_row_before_header() {
        let mut writer = CsvWriter::new(Vec::new());

        assert_eq!(
            writer.write_row(&strings(&["1"])),
            Err(ExchangeError::writer_state("row written before header"))
        );
    }

    #[test]
    fn test_second_header() {
        let mut writer = CsvWriter::new(Vec::new());

        writer.write_header(&strings(&["ID"])).unwrap();
        assert_eq!(
            writer.write_header(&strings(&["ID"])),
            Err(ExchangeError::writer_state("header already written"))
        );
    }
}

//! Error types for the exchange engine
//!
//! This module defines all error types that can occur while importing or
//! exporting records. Every error aborts the running `exec` call; there is no
//! recoverable per-row error in this engine.
//!
//! # Error Categories
//!
//! - **Configuration Errors**: Empty meta list, empty field/header, unknown field or association
//! - **Decode Errors**: Missing header column, malformed CSV, file not found
//! - **Validation Errors**: A row validator rejected a row
//! - **Coercion Errors**: Numeric overflow, unparseable value, unsupported field kind
//! - **Store Errors**: Failures reported by the backing store adapter

use thiserror::Error;

/// Boxed error returned by user supplied setters, valuers and validators
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for the exchange engine
///
/// Each variant includes the context needed to attribute the failure to a
/// field, a row or a collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExchangeError {
    /// No metas were configured on the importer/exporter
    #[error("no metas")]
    NoMetas,

    /// A meta was declared with an empty field name
    #[error("field name is empty")]
    EmptyField,

    /// A meta was declared with an empty column header
    #[error("header is empty")]
    EmptyHeader,

    /// A meta without setter/valuer names a field the record type does not have
    #[error("field {field} not found")]
    FieldNotFound {
        /// The unknown field name
        field: String,
    },

    /// Primary key metas must use default coercion
    #[error("can not set setter/valuer on primaryKey meta {field}")]
    PrimaryKeySetter {
        /// The offending primary key field
        field: String,
    },

    /// An association name is not registered on the record type
    #[error("association {name} not found")]
    AssociationNotFound {
        /// The unknown association name
        name: String,
    },

    /// The tabular header does not contain a declared column
    #[error("column {field} not found")]
    ColumnNotFound {
        /// Logical field of the meta
        field: String,
        /// Header label that was searched for
        header: String,
    },

    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// The reader cursor was used out of protocol
    #[error("Reader error: {message}")]
    ReaderState {
        /// Description of the misuse
        message: String,
    },

    /// The writer was used out of protocol
    #[error("Writer error: {message}")]
    WriterState {
        /// Description of the misuse
        message: String,
    },

    /// A row validator rejected a row
    #[error("Validation failed at row {row}: {message}")]
    ValidationFailed {
        /// 1-based data row number
        row: usize,
        /// Message returned by the validator
        message: String,
    },

    /// Default coercion of a raw value failed
    #[error("Invalid value for field '{field}' at row {row}: {source}")]
    InvalidValue {
        /// Field being assigned
        field: String,
        /// 1-based data row number
        row: usize,
        /// Underlying coercion failure
        #[source]
        source: CoercionError,
    },

    /// A custom setter returned an error
    #[error("Setter for field '{field}' failed at row {row}: {message}")]
    SetterFailed {
        /// Field of the meta owning the setter
        field: String,
        /// 1-based data row number
        row: usize,
        /// Message returned by the setter
        message: String,
    },

    /// A custom valuer returned an error
    #[error("Valuer for field '{field}' failed: {message}")]
    ValuerFailed {
        /// Field of the meta owning the valuer
        field: String,
        /// Message returned by the valuer
        message: String,
    },

    /// The backing store reported a failure
    #[error("Store error: {message}")]
    StoreError {
        /// Description reported by the store adapter
        message: String,
    },
}

/// Failure to convert a raw string into a typed field value
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    /// Not a valid signed integer literal
    #[error("invalid integer '{value}'")]
    InvalidInt {
        /// The raw value
        value: String,
    },

    /// Not a valid unsigned integer literal
    #[error("invalid unsigned integer '{value}'")]
    InvalidUint {
        /// The raw value
        value: String,
    },

    /// Signed value does not fit the destination width
    #[error("Int value too big: {value}")]
    IntTooBig {
        /// The raw value
        value: String,
    },

    /// Unsigned value does not fit the destination width
    #[error("UInt value too big: {value}")]
    UintTooBig {
        /// The raw value
        value: String,
    },

    /// Not a valid floating point literal
    #[error("invalid float '{value}'")]
    InvalidFloat {
        /// The raw value
        value: String,
    },

    /// Not a valid boolean literal
    #[error("invalid bool '{value}'")]
    InvalidBool {
        /// The raw value
        value: String,
    },

    /// Not a valid decimal literal
    #[error("invalid decimal '{value}'")]
    InvalidDecimal {
        /// The raw value
        value: String,
    },

    /// The field kind has no default coercion; a setter is required
    #[error("Unsupported kind: {kind}")]
    UnsupportedKind {
        /// Name of the field kind
        kind: String,
    },
}

// Conversion from io::Error to ExchangeError
impl From<std::io::Error> for ExchangeError {
    fn from(error: std::io::Error) -> Self {
        ExchangeError::IoError {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error to ExchangeError
impl From<csv::Error> for ExchangeError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        ExchangeError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl ExchangeError {
    /// Create a FieldNotFound error
    pub fn field_not_found(field: &str) -> Self {
        ExchangeError::FieldNotFound {
            field: field.to_string(),
        }
    }

    /// Create a ColumnNotFound error
    pub fn column_not_found(field: &str, header: &str) -> Self {
        ExchangeError::ColumnNotFound {
            field: field.to_string(),
            header: header.to_string(),
        }
    }

    /// Create a ValidationFailed error
    pub fn validation_failed(row: usize, message: impl ToString) -> Self {
        ExchangeError::ValidationFailed {
            row,
            message: message.to_string(),
        }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(field: &str, row: usize, source: CoercionError) -> Self {
        ExchangeError::InvalidValue {
            field: field.to_string(),
            row,
            source,
        }
    }

    /// Create a SetterFailed error
    pub fn setter_failed(field: &str, row: usize, message: impl ToString) -> Self {
        ExchangeError::SetterFailed {
            field: field.to_string(),
            row,
            message: message.to_string(),
        }
    }

    /// Create a ValuerFailed error
    pub fn valuer_failed(field: &str, message: impl ToString) -> Self {
        ExchangeError::ValuerFailed {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a StoreError
    pub fn store(message: impl ToString) -> Self {
        ExchangeError::StoreError {
            message: message.to_string(),
        }
    }

    /// Create a ReaderState error
    pub fn reader_state(message: &str) -> Self {
        ExchangeError::ReaderState {
            message: message.to_string(),
        }
    }

    /// Create a WriterState error
    pub fn writer_state(message: &str) -> Self {
        ExchangeError::WriterState {
            message: message.to_string(),
        }
    }
}

impl CoercionError {
    /// Create an UnsupportedKind error
    pub fn unsupported(kind: impl ToString) -> Self {
        CoercionError::UnsupportedKind {
            kind: kind.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::no_metas(ExchangeError::NoMetas, "no metas")]
    #[case::empty_field(ExchangeError::EmptyField, "field name is empty")]
    #[case::empty_header(ExchangeError::EmptyHeader, "header is empty")]
    #[case::field_not_found(ExchangeError::field_not_found("Age"), "field Age not found")]
    #[case::column_not_found(
        ExchangeError::column_not_found("Name", "Nameeee"),
        "column Name not found"
    )]
    #[case::file_not_found(
        ExchangeError::FileNotFound { path: "test.csv".to_string() },
        "File not found: test.csv"
    )]
    #[case::parse_error_with_line(
        ExchangeError::ParseError { line: Some(42), message: "Invalid field".to_string() },
        "CSV parse error at line 42: Invalid field"
    )]
    #[case::parse_error_without_line(
        ExchangeError::ParseError { line: None, message: "Invalid field".to_string() },
        "CSV parse error: Invalid field"
    )]
    #[case::validation_failed(
        ExchangeError::validation_failed(2, "name cannot be empty"),
        "Validation failed at row 2: name cannot be empty"
    )]
    #[case::invalid_value(
        ExchangeError::invalid_value("Age", 3, CoercionError::IntTooBig { value: "300".to_string() }),
        "Invalid value for field 'Age' at row 3: Int value too big: 300"
    )]
    #[case::unsupported_kind(
        ExchangeError::invalid_value("Tags", 1, CoercionError::unsupported("slice")),
        "Invalid value for field 'Tags' at row 1: Unsupported kind: slice"
    )]
    #[case::store(ExchangeError::store("disk full"), "Store error: disk full")]
    fn test_error_display(#[case] error: ExchangeError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: ExchangeError = io_error.into();
        assert!(matches!(error, ExchangeError::IoError { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
    }

    #[test]
    fn test_invalid_value_exposes_source() {
        use std::error::Error as _;

        let error = ExchangeError::invalid_value(
            "Flag",
            1,
            CoercionError::InvalidBool {
                value: "yes".to_string(),
            },
        );
        let source = error.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("invalid bool 'yes'"));
    }
}

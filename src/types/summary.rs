//! Outcome counters returned by a successful `exec`

use serde::Serialize;

/// Result of an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Data rows decoded from the reader
    pub rows: usize,
    /// Records written that did not exist in the store
    pub created: usize,
    /// Stored records that changed and were written back
    pub updated: usize,
    /// Stored records left untouched because the rows did not change them
    pub unchanged: usize,
}

impl ImportSummary {
    /// Number of records handed to the store
    pub fn written(&self) -> usize {
        self.created + self.updated
    }
}

/// Result of an export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Data rows written after the header
    pub rows: usize,
}

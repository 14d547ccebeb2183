//! Decoding and validation of uploaded rate sheets.
//!
//! - [`sheet`]: bytes to a header row plus cell matrix (XLSX/XLS/CSV)
//! - [`columns`]: fuzzy header resolution to logical columns
//! - [`rows`]: row-by-row validation into structured [`rows::RateRow`]s

use thiserror::Error;

pub mod columns;
pub mod rows;
pub mod sheet;

pub use columns::{resolve_columns, ColumnMap, LogicalColumn};
pub use rows::{parse_rows, ParsedBatch, RateRow, RowError};
pub use sheet::{decode_sheet, Sheet};

/// Errors decoding raw bytes into a sheet at all.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unsupported file format{}", .0.as_ref().map(|f| format!(": {f}")).unwrap_or_default())]
    UnsupportedFormat(Option<String>),

    #[error("Failed to decode spreadsheet: {0}")]
    Decode(String),

    #[error("Uploaded file is empty or has no data rows")]
    EmptySheet,

    #[error("File exceeds the maximum size of {max} bytes")]
    FileTooLarge { max: usize },

    #[error("Sheet has too many rows (limit {limit})")]
    TooManyRows { limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Batch-fatal validation failures. The whole upload is rejected; nothing is
/// committed.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required logical column could not be resolved from the header row.
    /// Carries the headers that were actually present so the uploader can see
    /// what we saw.
    #[error("Required column '{column}' not found; headers present: [{}]", seen.join(", "))]
    MissingColumn {
        column: LogicalColumn,
        seen: Vec<String>,
    },

    /// One or more data rows failed validation. Every problem in the file is
    /// reported together.
    #[error("{} row(s) failed validation", errors.len())]
    RowErrors { errors: Vec<RowError> },
}

impl ValidationError {
    /// Flatten to the wire shape used in 400 responses.
    #[must_use]
    pub fn row_errors(&self) -> Vec<RowError> {
        match self {
            Self::MissingColumn { .. } => Vec::new(),
            Self::RowErrors { errors } => errors.clone(),
        }
    }
}

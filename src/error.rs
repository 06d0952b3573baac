use std::path::PathBuf;
use thiserror::Error;

/// Failure that makes a whole table unusable.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Nothing beyond the header/spacer rows.
    #[error("insufficient data: table has {rows} rows, need more than 2")]
    InsufficientData { rows: usize },

    /// The bytes could not be decoded as a spreadsheet.
    #[error("unreadable spreadsheet {name}: {source}")]
    Unreadable {
        name: String,
        #[source]
        source: calamine::Error,
    },

    #[error("spreadsheet {0} contains no worksheets")]
    NoWorksheet(String),
}

/// Failure local to a single row. The row is logged and dropped.
#[derive(Error, Debug, PartialEq)]
pub enum RowError {
    #[error("malformed cell in column {column}: {detail}")]
    MalformedCell { column: usize, detail: String },
}

/// Errors surfaced to the interactive session.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("{name} must be a spreadsheet ({accepted})")]
    UnsupportedFile { name: String, accepted: String },

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error processing {label} file: {source}")]
    Extraction {
        label: String,
        #[source]
        source: ExtractionError,
    },

    /// Extraction succeeded but retained no classified records.
    #[error("No valid data found in {0} file")]
    EmptyResult(String),

    #[error("No data loaded. Load both files first")]
    NoData,

    #[error("No dashboard data found. Generate a dashboard first")]
    NoSnapshot,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to encode/decode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DashboardError>;

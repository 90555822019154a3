use thiserror::Error;

/// Errors produced while loading tables and rendering charts.
#[derive(Error, Debug)]
pub enum ChartError {
    /// The requested chart kind is not one the renderer knows.
    #[error("Unknown chart kind '{0}' (expected one of: scatter, distribution, line, bar, histogram, box, violin, heatmap)")]
    InvalidKind(String),

    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    #[error("Column '{column}' is not numeric (row {row}: '{value}')")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Column '{column}' has {found} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("{0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    Param(String),

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Drawing backend error: {0}")]
    Backend(String),

    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, ChartError>;

//! Error types for the specsplit conversion pipeline.
//!
//! - [`LoadError`] - reading and typing the input table
//! - [`LabelError`] - identifier normalization
//! - [`ExportError`] - writing the output tables
//! - [`PipelineError`] - top-level orchestration errors
//! - [`ServerError`] - HTTP adapter errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Load Errors
// =============================================================================

/// Errors while loading a specification table.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode the file contents.
    #[error("Failed to decode content: {0}")]
    Encoding(String),

    /// Invalid delimited text.
    #[error("Invalid CSV format at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// A required column is absent from the header row.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// The same column name appears twice in the header row.
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    /// A segment cell is neither empty nor a number.
    #[error("Line {line}, column '{column}' (value '{value}'): not a numeric value")]
    MalformedNumericCell {
        line: usize,
        column: String,
        value: String,
    },
}

// =============================================================================
// Label Errors
// =============================================================================

/// Errors from the identifier normalizer.
#[derive(Debug, Error, PartialEq)]
pub enum LabelError {
    /// The argument was not a sequence, or an element was not text.
    #[error("Invalid input kind: {0}")]
    InvalidInputKind(String),

    /// Two (label, segment) pairs map to the same coefficient name.
    #[error("Coefficient name '{0}' is produced by more than one cell")]
    DuplicateCoefficientName(String),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing output tables.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to write file.
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error.
    #[error("CSV writer error: {0}")]
    Csv(#[from] csv::Error),

    /// Writer produced non UTF-8 output.
    #[error("Output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by
/// [`crate::transform::pipeline::convert_csv`] and friends.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input table could not be loaded.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Labels could not be derived.
    #[error("Label error: {0}")]
    Label(#[from] LabelError),

    /// Outputs could not be written.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

impl PipelineError {
    /// Whether the failure is caused by the input rather than the environment.
    pub fn is_input_error(&self) -> bool {
        match self {
            PipelineError::Label(_) => true,
            PipelineError::Load(LoadError::Io(_)) => false,
            PipelineError::Load(_) => true,
            PipelineError::Export(_) => false,
        }
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for label operations.
pub type LabelResult<T> = Result<T, LabelError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

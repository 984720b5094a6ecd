//! # specsplit - coefficient extraction for utility specification tables
//!
//! specsplit takes a utility specification whose segment columns hold literal
//! coefficients and splits it into a specification that references
//! coefficients by name and a coefficients table holding the values.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌──────────────────┐
//! │  Spec CSV   │────▶│   Parser    │────▶│  Transform  │────▶│ spec.csv         │
//! │ (literals)  │     │ (auto-enc)  │     │ (label +    │     │ coefficients.csv │
//! └─────────────┘     └─────────────┘     │  reshape)   │     └──────────────────┘
//!                                         └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use specsplit::{convert_csv, ConvertOptions};
//! use std::path::Path;
//!
//! let result = convert_csv(Path::new("spec.csv"), &ConvertOptions::default()).unwrap();
//! println!("Extracted {} coefficients", result.coefficients.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Input and output tables
//! - [`parser`] - CSV loading with auto-detection
//! - [`transform`] - Labels, reshape, coefficients and pipeline
//! - [`export`] - CSV writers for both outputs
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Output
pub mod export;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ExportError, LabelError, LoadError, PipelineError, ServerError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    CoefficientRecord, CoefficientValue, Constrain, FinalSpecRow, FinalSpecTable, RawRow,
    SpecTable,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes, parse_bytes_auto,
    parse_csv_file, parse_csv_file_auto, parse_table, ParseResult,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    labels_from_cells, labels_from_json, normalize_description, normalize_labels,
    ConstraintRule,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    convert_bytes, convert_csv, convert_table, convert_to_files, ConversionResult,
    ConvertOptions, CsvInfo,
};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{
    coefficients_to_csv, spec_to_csv, write_outputs, COEFFICIENTS_FILE_NAME, SPEC_FILE_NAME,
};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, ConvertResponse, LabelsResponse};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}

//! Transformation module.
//!
//! This module turns a loaded specification table into its two outputs:
//! - Labels: description normalization and deduplication
//! - Reshape: unpivot of segment columns and symbolic specification rebuild
//! - Coefficients: coefficients table and constrain flags
//! - Pipeline: main conversion pipeline

pub mod coefficients;
pub mod labels;
pub mod pipeline;
pub mod reshape;

pub use coefficients::{
    constrained_count, ensure_unique_names, extract_coefficients, ConstraintRule,
};
pub use labels::{labels_from_cells, labels_from_json, normalize_description, normalize_labels};
pub use pipeline::*;
pub use reshape::{attach_labels, build_final_spec, coefficient_name, unpivot, LabeledTable, LongEntry};

//! High-level pipeline API: load, label, reshape, extract.
//!
//! # Example
//!
//! ```rust,ignore
//! use specsplit::{convert_csv, ConvertOptions};
//! use std::path::Path;
//!
//! let result = convert_csv(Path::new("tour_mode_choice.csv"), &ConvertOptions::default())?;
//! println!("{} coefficients", result.coefficients.len());
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::coefficients::{
    constrained_count, ensure_unique_names, extract_coefficients, ConstraintRule,
};
use super::labels::labels_from_cells;
use super::reshape::{attach_labels, build_final_spec, unpivot};
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::error::PipelineResult;
use crate::export::write_outputs;
use crate::models::{CoefficientRecord, FinalSpecTable, SpecTable};
use crate::parser::{parse_bytes, parse_csv_file, ParseResult};

/// Options for the conversion pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Force the input delimiter instead of detecting it
    pub delimiter: Option<char>,

    /// Prepended to every normalized description to form the label
    pub label_prefix: String,

    /// Values whose coefficients are flagged `T`
    pub constrained_values: Vec<f64>,

    /// Labels containing this are flagged `T` whatever their value
    pub calibration_marker: String,

    /// Keep rows without any coefficient in the specification output
    pub keep_rows_without_coefficients: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        let rule = ConstraintRule::default();
        Self {
            delimiter: None,
            label_prefix: "util_".to_string(),
            constrained_values: rule.constrained_values,
            calibration_marker: rule.calibration_marker,
            keep_rows_without_coefficients: false,
        }
    }
}

impl ConvertOptions {
    pub fn constraint_rule(&self) -> ConstraintRule {
        ConstraintRule::new(self.constrained_values.clone(), self.calibration_marker.clone())
    }
}

/// Input file information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub segment_columns: Vec<String>,
    pub row_count: usize,
}

impl CsvInfo {
    fn from_table(table: &SpecTable, encoding: &str, delimiter: char) -> Self {
        Self {
            encoding: encoding.to_string(),
            delimiter,
            headers: table.headers.clone(),
            segment_columns: table.segment_columns.clone(),
            row_count: table.rows.len(),
        }
    }
}

/// Both output tables of one run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    /// Specification with coefficient names in the segment cells
    pub spec: FinalSpecTable,

    /// Coefficient names with their literal values and constrain flags
    pub coefficients: Vec<CoefficientRecord>,

    /// Number of coefficients flagged `T`
    pub constrained_count: usize,

    /// Input metadata
    pub csv_info: CsvInfo,
}

/// Convert a specification file.
pub fn convert_csv(path: &Path, options: &ConvertOptions) -> PipelineResult<ConversionResult> {
    log_info(format!("📖 Reading {}", path.display()));
    let parsed = parse_csv_file(path, options.delimiter)?;
    convert_parsed(parsed, options)
}

/// Convert a specification file and write both output tables.
///
/// Nothing is written unless the conversion succeeds, and the two files are
/// either both replaced or both left alone.
pub fn convert_to_files(
    input: &Path,
    options: &ConvertOptions,
    spec_path: &Path,
    coefficients_path: &Path,
) -> PipelineResult<ConversionResult> {
    let result = convert_csv(input, options)?;
    write_outputs(&result.spec, &result.coefficients, spec_path, coefficients_path)?;
    Ok(result)
}

/// Convert raw file contents.
pub fn convert_bytes(bytes: &[u8], options: &ConvertOptions) -> PipelineResult<ConversionResult> {
    let parsed = parse_bytes(bytes, options.delimiter)?;
    convert_parsed(parsed, options)
}

/// Convert an already loaded table.
pub fn convert_table(
    table: &SpecTable,
    options: &ConvertOptions,
) -> PipelineResult<ConversionResult> {
    let csv_info = CsvInfo::from_table(table, "utf-8", options.delimiter.unwrap_or(','));
    convert_with_info(table, csv_info, options)
}

fn convert_parsed(parsed: ParseResult, options: &ConvertOptions) -> PipelineResult<ConversionResult> {
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(parsed.delimiter)));

    let csv_info = CsvInfo::from_table(&parsed.table, &parsed.encoding, parsed.delimiter);
    convert_with_info(&parsed.table, csv_info, options)
}

fn convert_with_info(
    table: &SpecTable,
    csv_info: CsvInfo,
    options: &ConvertOptions,
) -> PipelineResult<ConversionResult> {
    log_success(format!("Read {} rows", table.rows.len()));
    log_info(format!("📋 {} segment column(s):", table.segment_columns.len()));
    for (i, col) in table.segment_columns.iter().enumerate() {
        log_info_indent(format!("[{:2}] {}", i + 1, col), 1);
    }
    if table.segment_columns.is_empty() {
        log_warning("No segment columns, coefficients table will be empty");
    }

    log_info("🏷️  Deriving labels...");
    let labels = labels_from_cells(&table.descriptions())?;
    let labeled = attach_labels(table, &labels, &options.label_prefix);

    log_info("🔄 Reshaping segment columns...");
    let long = unpivot(&labeled);
    let spec = build_final_spec(&labeled, &long, options.keep_rows_without_coefficients);
    if spec.rows.len() < table.rows.len() {
        log_warning(format!(
            "{} row(s) without coefficients left out",
            table.rows.len() - spec.rows.len()
        ));
    }

    let coefficients = extract_coefficients(&long, &options.constraint_rule());
    ensure_unique_names(&coefficients)?;
    let constrained = constrained_count(&coefficients);
    log_success(format!(
        "{} coefficients ({} constrained)",
        coefficients.len(),
        constrained
    ));

    Ok(ConversionResult {
        spec,
        coefficients,
        constrained_count: constrained,
        csv_info,
    })
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LabelError, LoadError, PipelineError};
    use crate::models::Constrain;

    const SAMPLE: &str = "Description,Expression,M,N,H\n\
        Full-time worker alternative-specific constants,ptype == 1,0.885080091,0.531583624,\n\
        Other,ptype == 2,-999,0,\n\
        Other,ptype == 3,1.5,,\n\
        Walk calibration constant,walk,2.25,,\n";

    #[test]
    fn test_default_options() {
        let opts = ConvertOptions::default();
        assert_eq!(opts.label_prefix, "util_");
        assert_eq!(opts.constrained_values, vec![0.0, -999.0]);
        assert_eq!(opts.calibration_marker, "calibration_constant");
        assert!(!opts.keep_rows_without_coefficients);
        assert!(opts.delimiter.is_none());
    }

    #[test]
    fn test_options_from_partial_json() {
        let opts: ConvertOptions =
            serde_json::from_str(r#"{"keep_rows_without_coefficients": true}"#).unwrap();
        assert!(opts.keep_rows_without_coefficients);
        assert_eq!(opts.label_prefix, "util_");
    }

    #[test]
    fn test_full_time_worker_scenario() {
        let result = convert_bytes(SAMPLE.as_bytes(), &ConvertOptions::default()).unwrap();
        let label = "util_full_time_worker_alternative_specific_constants";

        assert_eq!(result.spec.rows[0].label, label);
        assert_eq!(
            result.spec.cell(label, "M"),
            Some("util_full_time_worker_alternative_specific_constants_M")
        );
        assert_eq!(result.spec.cell(label, "H"), None);

        let first: Vec<_> = result
            .coefficients
            .iter()
            .filter(|r| r.coefficient_name.starts_with(label))
            .map(|r| (r.coefficient_name.as_str(), r.value.as_str(), r.constrain))
            .collect();
        assert_eq!(
            first,
            vec![
                (
                    "util_full_time_worker_alternative_specific_constants_M",
                    "0.885080091",
                    Constrain::Free
                ),
                (
                    "util_full_time_worker_alternative_specific_constants_N",
                    "0.531583624",
                    Constrain::Free
                ),
            ]
        );
    }

    #[test]
    fn test_duplicate_descriptions() {
        let result = convert_bytes(SAMPLE.as_bytes(), &ConvertOptions::default()).unwrap();

        assert_eq!(result.spec.rows[1].label, "util_other_1");
        assert_eq!(result.spec.rows[2].label, "util_other_2");
        assert_eq!(result.spec.cell("util_other_2", "M"), Some("util_other_2_M"));
        assert_eq!(result.spec.cell("util_other_2", "N"), None);
    }

    #[test]
    fn test_constrain_flags() {
        let result = convert_bytes(SAMPLE.as_bytes(), &ConvertOptions::default()).unwrap();
        let flag = |name: &str| {
            result
                .coefficients
                .iter()
                .find(|r| r.coefficient_name == name)
                .map(|r| r.constrain)
        };

        assert_eq!(flag("util_other_1_M"), Some(Constrain::Fixed));
        assert_eq!(flag("util_other_1_N"), Some(Constrain::Fixed));
        assert_eq!(flag("util_other_2_M"), Some(Constrain::Free));
        assert_eq!(flag("util_walk_calibration_constant_M"), Some(Constrain::Fixed));
        assert_eq!(result.constrained_count, 3);
    }

    #[test]
    fn test_coefficients_in_row_order() {
        let result = convert_bytes(SAMPLE.as_bytes(), &ConvertOptions::default()).unwrap();
        let names: Vec<_> = result
            .coefficients
            .iter()
            .map(|r| r.coefficient_name.as_str())
            .collect();

        assert_eq!(
            names,
            vec![
                "util_full_time_worker_alternative_specific_constants_M",
                "util_full_time_worker_alternative_specific_constants_N",
                "util_other_1_M",
                "util_other_1_N",
                "util_other_2_M",
                "util_walk_calibration_constant_M",
            ]
        );
    }

    #[test]
    fn test_csv_info() {
        let result = convert_bytes(SAMPLE.as_bytes(), &ConvertOptions::default()).unwrap();

        assert_eq!(result.csv_info.row_count, 4);
        assert_eq!(result.csv_info.delimiter, ',');
        assert_eq!(result.csv_info.segment_columns, vec!["M", "N", "H"]);
    }

    #[test]
    fn test_missing_description_aborts() {
        let csv = "Description,Expression,M\nA,x,1\n,y,2\n";
        let err = convert_bytes(csv.as_bytes(), &ConvertOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Label(LabelError::InvalidInputKind(_))));
    }

    #[test]
    fn test_missing_column_aborts() {
        let csv = "Description,M\nA,1\n";
        let err = convert_bytes(csv.as_bytes(), &ConvertOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Load(LoadError::MissingColumn(_))));
    }

    #[test]
    fn test_custom_prefix_and_rule() {
        let options = ConvertOptions {
            label_prefix: "coef_".into(),
            constrained_values: vec![1.5],
            calibration_marker: String::new(),
            ..ConvertOptions::default()
        };
        let result = convert_bytes(SAMPLE.as_bytes(), &options).unwrap();

        assert_eq!(result.spec.rows[2].label, "coef_other_2");
        assert_eq!(result.constrained_count, 1);
    }

    #[test]
    fn test_rows_without_coefficients_dropped() {
        let csv = "Description,Expression,M,N\nA,x,1,\nB,y,,\n";
        let result = convert_bytes(csv.as_bytes(), &ConvertOptions::default()).unwrap();

        let labels: Vec<_> = result.spec.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["util_a"]);
        assert_eq!(result.csv_info.row_count, 2);
    }

    #[test]
    fn test_keep_rows_without_coefficients() {
        let csv = "Description,Expression,M,N\nA,x,1,\nB,y,,\n";
        let options = ConvertOptions {
            keep_rows_without_coefficients: true,
            ..ConvertOptions::default()
        };
        let result = convert_bytes(csv.as_bytes(), &options).unwrap();

        assert_eq!(result.spec.rows.len(), 2);
        assert_eq!(result.spec.rows[1].cells, vec![None, None]);
    }

    #[test]
    fn test_row_of_empty_cells_aborts() {
        let csv = "Description,Expression,M\nA,x,1\n,,\nB,y,2\n";
        let err = convert_bytes(csv.as_bytes(), &ConvertOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Label(LabelError::InvalidInputKind(_))));
    }

    #[test]
    fn test_coefficient_name_clash_aborts() {
        let csv = "Description,Expression,m_n,n\nX,a,1,\nX M,b,,2\n";
        let err = convert_bytes(csv.as_bytes(), &ConvertOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Label(LabelError::DuplicateCoefficientName(ref name)) if name == "util_x_m_n"
        ));
    }

    #[test]
    fn test_convert_table_without_segments() {
        let table = crate::parser::parse_table("Description,Expression\nA,x\n", ',').unwrap();
        let options = ConvertOptions {
            keep_rows_without_coefficients: true,
            ..ConvertOptions::default()
        };
        let result = convert_table(&table, &options).unwrap();

        assert_eq!(result.spec.rows.len(), 1);
        assert!(result.coefficients.is_empty());
        assert_eq!(result.spec.header(), vec!["Label", "Description", "Expression"]);
    }

    #[test]
    fn test_convert_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let result = convert_csv(&path, &ConvertOptions::default()).unwrap();
        assert_eq!(result.coefficients.len(), 6);
    }

    #[test]
    fn test_convert_to_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.csv");
        std::fs::write(&input, SAMPLE).unwrap();
        let spec_path = dir.path().join("spec.csv");
        let coefficients_path = dir.path().join("coefficients.csv");

        let result =
            convert_to_files(&input, &ConvertOptions::default(), &spec_path, &coefficients_path)
                .unwrap();

        assert_eq!(result.spec.rows.len(), 4);
        assert!(spec_path.exists());
        assert!(coefficients_path.exists());
    }

    #[test]
    fn test_convert_to_files_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.csv");
        std::fs::write(&input, SAMPLE).unwrap();
        let spec_path = dir.path().join("spec.csv");
        let coefficients_path = dir.path().join("missing").join("coefficients.csv");

        let err =
            convert_to_files(&input, &ConvertOptions::default(), &spec_path, &coefficients_path)
                .unwrap_err();

        assert!(matches!(err, PipelineError::Export(_)));
        assert!(!err.is_input_error());
        assert!(!spec_path.exists());
    }
}

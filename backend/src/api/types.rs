//! REST API types.
//!
//! The conversion response carries both tables twice: as structured JSON for
//! display, and as CSV text ready to be saved.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ExportResult;
use crate::export::{coefficients_to_csv, spec_to_csv};
use crate::models::{CoefficientRecord, FinalSpecTable};
use crate::transform::pipeline::{format_delimiter, ConversionResult};

/// Response sent after a specification upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    /// Unique job identifier
    pub job_id: String,

    /// Uploaded file name, if the client sent one
    pub file_name: Option<String>,

    /// Specification with coefficient names
    pub spec: FinalSpecTable,

    /// Coefficients table
    pub coefficients: Vec<CoefficientRecord>,

    /// `spec.csv` contents
    pub spec_csv: String,

    /// `coefficients.csv` contents
    pub coefficients_csv: String,

    /// Metadata about the conversion
    pub metadata: ResponseMetadata,
}

/// Metadata about the conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub row_count: usize,
    pub coefficient_count: usize,
    pub constrained_count: usize,
    pub csv_info: CsvMetadata,
}

/// Input file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub delimiter: String,
    pub columns: Vec<String>,
    pub segment_columns: Vec<String>,
}

impl ConvertResponse {
    pub fn new(result: ConversionResult, file_name: Option<String>) -> ExportResult<Self> {
        let spec_csv = spec_to_csv(&result.spec)?;
        let coefficients_csv = coefficients_to_csv(&result.coefficients)?;

        Ok(ConvertResponse {
            job_id: Uuid::new_v4().to_string(),
            file_name,
            metadata: ResponseMetadata {
                row_count: result.spec.rows.len(),
                coefficient_count: result.coefficients.len(),
                constrained_count: result.constrained_count,
                csv_info: CsvMetadata {
                    encoding: result.csv_info.encoding,
                    delimiter: format_delimiter(result.csv_info.delimiter),
                    columns: result.csv_info.headers,
                    segment_columns: result.csv_info.segment_columns,
                },
            },
            spec: result.spec,
            coefficients: result.coefficients,
            spec_csv,
            coefficients_csv,
        })
    }
}

/// Response of the label endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelsResponse {
    pub labels: Vec<String>,
}

/// Create an error response
pub fn error_response(message: &str) -> Value {
    json!({
        "status": "error",
        "error": message
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::pipeline::{convert_bytes, ConvertOptions};

    #[test]
    fn test_convert_response() {
        let csv = "Description\tExpression\tM\nOther\tx\t-999\n";
        let result = convert_bytes(csv.as_bytes(), &ConvertOptions::default()).unwrap();
        let response = ConvertResponse::new(result, Some("spec.csv".into())).unwrap();

        assert_eq!(response.metadata.coefficient_count, 1);
        assert_eq!(response.metadata.constrained_count, 1);
        assert_eq!(response.metadata.csv_info.delimiter, "TAB");
        assert_eq!(response.coefficients_csv, "coefficient_name,value,constrain\nutil_other_M,-999,T\n");
        assert!(Uuid::parse_str(&response.job_id).is_ok());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["fileName"], "spec.csv");
        assert_eq!(json["spec"]["rows"][0]["cells"][0], "util_other_M");
    }

    #[test]
    fn test_error_response() {
        let json = error_response("bad input");
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "bad input");
    }
}

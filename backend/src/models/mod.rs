//! Domain models for the specsplit conversion pipeline.
//!
//! - [`SpecTable`] / [`RawRow`] - the loaded input table
//! - [`CoefficientValue`] - a literal coefficient, kept verbatim
//! - [`FinalSpecTable`] / [`FinalSpecRow`] - the symbolic specification output
//! - [`CoefficientRecord`] / [`Constrain`] - the coefficients output

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Free-text description column, source of the labels.
pub const DESCRIPTION_COLUMN: &str = "Description";
/// Model expression column, carried through untouched.
pub const EXPRESSION_COLUMN: &str = "Expression";
/// Derived label column of the output specification.
pub const LABEL_COLUMN: &str = "Label";
/// Name of the row index column of the intermediate table.
pub const INDEX_COLUMN: &str = "index";

/// Columns that never become segment columns.
pub const RESERVED_COLUMNS: [&str; 4] =
    [LABEL_COLUMN, DESCRIPTION_COLUMN, EXPRESSION_COLUMN, INDEX_COLUMN];

// =============================================================================
// Coefficient Value
// =============================================================================

/// A literal coefficient as it appeared in the input.
///
/// The original text is what gets written back out, so `0.885080091` stays
/// `0.885080091` and `-999` stays `-999`. The parsed number is only used for
/// comparisons.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientValue {
    text: String,
    number: f64,
}

impl CoefficientValue {
    /// Parse a trimmed cell. Returns `None` unless it is a finite number.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let number: f64 = text.parse().ok()?;
        if !number.is_finite() {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            number,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_f64(&self) -> f64 {
        self.number
    }
}

impl fmt::Display for CoefficientValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for CoefficientValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for CoefficientValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        CoefficientValue::parse(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("not a numeric value: '{}'", text)))
    }
}

// =============================================================================
// Input Table
// =============================================================================

/// One data row of the input table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRow {
    /// Zero-based position in the file, blank lines excluded.
    pub index: usize,
    /// `None` when the cell was empty.
    pub description: Option<String>,
    pub expression: Option<String>,
    /// One entry per segment column, in [`SpecTable::segment_columns`] order.
    pub values: Vec<Option<CoefficientValue>>,
}

/// A loaded specification table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecTable {
    /// All header names as read.
    pub headers: Vec<String>,
    /// Names of the coefficient-bearing columns, in header order.
    pub segment_columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl SpecTable {
    /// Description cells in row order.
    pub fn descriptions(&self) -> Vec<Option<&str>> {
        self.rows.iter().map(|r| r.description.as_deref()).collect()
    }

    /// Number of non-empty segment cells.
    pub fn value_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.values.iter().filter(|v| v.is_some()).count())
            .sum()
    }
}

// =============================================================================
// Outputs
// =============================================================================

/// Whether a coefficient is fixed for estimation.
///
/// Written as `T` / `F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constrain {
    #[serde(rename = "T")]
    Fixed,
    #[serde(rename = "F")]
    Free,
}

impl Constrain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Constrain::Fixed => "T",
            Constrain::Free => "F",
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Constrain::Fixed)
    }
}

impl From<bool> for Constrain {
    fn from(fixed: bool) -> Self {
        if fixed {
            Constrain::Fixed
        } else {
            Constrain::Free
        }
    }
}

impl fmt::Display for Constrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the coefficients table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientRecord {
    pub coefficient_name: String,
    pub value: CoefficientValue,
    pub constrain: Constrain,
}

/// One line of the symbolic specification table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalSpecRow {
    pub label: String,
    pub description: Option<String>,
    pub expression: Option<String>,
    /// Coefficient names, one per segment column; `None` where the input cell was empty.
    pub cells: Vec<Option<String>>,
}

/// The symbolic specification table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalSpecTable {
    pub segment_columns: Vec<String>,
    pub rows: Vec<FinalSpecRow>,
}

impl FinalSpecTable {
    /// Output header: `Label`, `Description`, `Expression`, then the segments.
    pub fn header(&self) -> Vec<String> {
        [LABEL_COLUMN, DESCRIPTION_COLUMN, EXPRESSION_COLUMN]
            .iter()
            .map(|s| s.to_string())
            .chain(self.segment_columns.iter().cloned())
            .collect()
    }

    /// Row cells in header order, empty strings for empty cells.
    pub fn row_cells<'a>(&self, row: &'a FinalSpecRow) -> Vec<&'a str> {
        let mut out = Vec::with_capacity(3 + row.cells.len());
        out.push(row.label.as_str());
        out.push(row.description.as_deref().unwrap_or(""));
        out.push(row.expression.as_deref().unwrap_or(""));
        out.extend(row.cells.iter().map(|c| c.as_deref().unwrap_or("")));
        out
    }

    /// Find a row by label.
    pub fn row(&self, label: &str) -> Option<&FinalSpecRow> {
        self.rows.iter().find(|r| r.label == label)
    }

    /// Cell of `label` under segment column `segment`.
    pub fn cell(&self, label: &str, segment: &str) -> Option<&str> {
        let col = self.segment_columns.iter().position(|s| s == segment)?;
        self.row(label)?.cells.get(col)?.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coefficient_value_keeps_text() {
        let v = CoefficientValue::parse(" 0.885080091 ").unwrap();
        assert_eq!(v.as_str(), "0.885080091");
        assert_eq!(v.as_f64(), 0.885080091);

        let v = CoefficientValue::parse("-999").unwrap();
        assert_eq!(v.to_string(), "-999");
        assert_eq!(v.as_f64(), -999.0);
    }

    #[test]
    fn test_coefficient_value_rejects_non_numbers() {
        assert!(CoefficientValue::parse("abc").is_none());
        assert!(CoefficientValue::parse("").is_none());
        assert!(CoefficientValue::parse("NaN").is_none());
        assert!(CoefficientValue::parse("inf").is_none());
        assert!(CoefficientValue::parse("1e-3").is_some());
    }

    #[test]
    fn test_constrain_serializes_as_flag() {
        assert_eq!(serde_json::to_string(&Constrain::Fixed).unwrap(), "\"T\"");
        assert_eq!(serde_json::to_string(&Constrain::Free).unwrap(), "\"F\"");
        assert_eq!(Constrain::from(true), Constrain::Fixed);
    }

    #[test]
    fn test_record_json_shape() {
        let record = CoefficientRecord {
            coefficient_name: "util_x_M".into(),
            value: CoefficientValue::parse("0.5").unwrap(),
            constrain: Constrain::Free,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["coefficient_name"], "util_x_M");
        assert_eq!(json["value"], "0.5");
        assert_eq!(json["constrain"], "F");
    }

    #[test]
    fn test_final_spec_header_and_cells() {
        let table = FinalSpecTable {
            segment_columns: vec!["M".into(), "H".into()],
            rows: vec![FinalSpecRow {
                label: "util_a".into(),
                description: Some("A".into()),
                expression: None,
                cells: vec![Some("util_a_M".into()), None],
            }],
        };
        assert_eq!(table.header(), vec!["Label", "Description", "Expression", "M", "H"]);
        assert_eq!(
            table.row_cells(&table.rows[0]),
            vec!["util_a", "A", "", "util_a_M", ""]
        );
        assert_eq!(table.cell("util_a", "M"), Some("util_a_M"));
        assert_eq!(table.cell("util_a", "H"), None);
        assert_eq!(table.cell("util_b", "M"), None);
    }
}

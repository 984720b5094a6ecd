//! Coefficients table extraction and the constrain rule.

use std::collections::HashSet;

use super::reshape::LongEntry;
use crate::error::{LabelError, LabelResult};
use crate::models::{CoefficientRecord, Constrain};

/// Decides which coefficients are fixed during estimation.
///
/// A coefficient is constrained when its value equals one of
/// `constrained_values`, or when its label contains `calibration_marker`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRule {
    pub constrained_values: Vec<f64>,
    pub calibration_marker: String,
}

impl ConstraintRule {
    pub fn new(constrained_values: Vec<f64>, calibration_marker: impl Into<String>) -> Self {
        Self {
            constrained_values,
            calibration_marker: calibration_marker.into(),
        }
    }

    pub fn constrain(&self, label: &str, value: f64) -> Constrain {
        let sentinel = self.constrained_values.iter().any(|v| *v == value);
        let calibration =
            !self.calibration_marker.is_empty() && label.contains(&self.calibration_marker);
        Constrain::from(sentinel || calibration)
    }
}

impl Default for ConstraintRule {
    fn default() -> Self {
        Self::new(vec![0.0, -999.0], "calibration_constant")
    }
}

/// One record per non-empty cell, ordered by row then segment column.
pub fn extract_coefficients(long: &[LongEntry], rule: &ConstraintRule) -> Vec<CoefficientRecord> {
    let mut present: Vec<&LongEntry> = long.iter().filter(|e| e.value.is_some()).collect();
    present.sort_by_key(|e| (e.index, e.column));

    present
        .into_iter()
        .filter_map(|entry| {
            let value = entry.value.clone()?;
            Some(CoefficientRecord {
                coefficient_name: entry.coefficient_name(),
                constrain: rule.constrain(&entry.label, value.as_f64()),
                value,
            })
        })
        .collect()
}

/// Fail on the first coefficient name shared by two records.
///
/// Names are `<label>_<segment>`, so `util_x` under `M_N` and `util_x_M` under
/// `N` both give `util_x_M_N`.
pub fn ensure_unique_names(records: &[CoefficientRecord]) -> LabelResult<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.coefficient_name.as_str()) {
            return Err(LabelError::DuplicateCoefficientName(
                record.coefficient_name.clone(),
            ));
        }
    }
    Ok(())
}

/// Number of records flagged `T`.
pub fn constrained_count(records: &[CoefficientRecord]) -> usize {
    records.iter().filter(|r| r.constrain.is_fixed()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CoefficientValue;

    fn entry(index: usize, label: &str, column: usize, segment: &str, v: Option<&str>) -> LongEntry {
        LongEntry {
            index,
            label: label.into(),
            column,
            segment: segment.into(),
            value: v.and_then(CoefficientValue::parse),
        }
    }

    #[test]
    fn test_constrain_rule() {
        let rule = ConstraintRule::default();
        assert_eq!(rule.constrain("util_a", -999.0), Constrain::Fixed);
        assert_eq!(rule.constrain("util_a", 0.0), Constrain::Fixed);
        assert_eq!(rule.constrain("util_a", -0.0), Constrain::Fixed);
        assert_eq!(rule.constrain("util_a", 0.5318), Constrain::Free);
        assert_eq!(
            rule.constrain("util_walk_calibration_constant", 1.25),
            Constrain::Fixed
        );
    }

    #[test]
    fn test_custom_rule() {
        let rule = ConstraintRule::new(vec![1.0], "");
        assert_eq!(rule.constrain("util_a", 1.0), Constrain::Fixed);
        assert_eq!(rule.constrain("util_a", 0.0), Constrain::Free);
        assert_eq!(rule.constrain("util_calibration_constant", 2.0), Constrain::Free);
    }

    #[test]
    fn test_extract_skips_nulls_and_orders() {
        let long = vec![
            entry(1, "util_b", 0, "M", Some("0")),
            entry(0, "util_a", 1, "N", Some("0.531583624")),
            entry(0, "util_a", 0, "M", Some("0.885080091")),
            entry(0, "util_a", 2, "H", None),
        ];
        let records = extract_coefficients(&long, &ConstraintRule::default());

        let names: Vec<_> = records.iter().map(|r| r.coefficient_name.as_str()).collect();
        assert_eq!(names, vec!["util_a_M", "util_a_N", "util_b_M"]);
        assert_eq!(records[0].value.as_str(), "0.885080091");
        assert_eq!(records[0].constrain, Constrain::Free);
        assert_eq!(records[2].constrain, Constrain::Fixed);
        assert_eq!(constrained_count(&records), 1);
        assert!(ensure_unique_names(&records).is_ok());
    }

    #[test]
    fn test_clashing_names_rejected() {
        let long = vec![
            entry(0, "util_x", 0, "M_N", Some("1")),
            entry(1, "util_x_M", 0, "N", Some("2")),
        ];
        let records = extract_coefficients(&long, &ConstraintRule::default());

        assert_eq!(
            ensure_unique_names(&records),
            Err(LabelError::DuplicateCoefficientName("util_x_M_N".into()))
        );
    }
}

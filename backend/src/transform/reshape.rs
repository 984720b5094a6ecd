//! Wide-to-long reshape of segment columns and reconstruction of the
//! symbolic specification table.
//!
//! ```text
//! Labeled rows (wide)                   Long form                       Final spec
//! ┌───────────────────────────┐   ┌──────────────────────────┐   ┌──────────────────────────┐
//! │ 0 util_a │ M=0.5 │ H=     │ → │ 0 util_a  M  0.5         │ → │ util_a │ util_a_M │      │
//! │ 1 util_b │ M=    │ H=-999 │   │ 0 util_a  H  (null)      │   │ util_b │          │ ..._H│
//! └───────────────────────────┘   │ 1 util_b  M  (null)      │   └──────────────────────────┘
//!                                 │ 1 util_b  H  -999        │
//!                                 └──────────────────────────┘
//! ```

use serde::Serialize;

use crate::models::{CoefficientValue, FinalSpecRow, FinalSpecTable, SpecTable};

/// A raw row with its label attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabeledRow {
    /// Original row index.
    pub index: usize,
    pub label: String,
    pub description: Option<String>,
    pub expression: Option<String>,
    pub values: Vec<Option<CoefficientValue>>,
}

/// The input table with labels and explicit row indices.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabeledTable {
    pub segment_columns: Vec<String>,
    pub rows: Vec<LabeledRow>,
}

/// One (row, segment) cell of the unpivoted table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LongEntry {
    /// Original row index.
    pub index: usize,
    pub label: String,
    /// Position of the segment column.
    pub column: usize,
    pub segment: String,
    pub value: Option<CoefficientValue>,
}

impl LongEntry {
    /// Symbolic name for this cell.
    pub fn coefficient_name(&self) -> String {
        coefficient_name(&self.label, &self.segment)
    }
}

/// `<label>_<segment>`
pub fn coefficient_name(label: &str, segment: &str) -> String {
    format!("{}_{}", label, segment)
}

/// Attach `prefix + label` to every row.
///
/// `labels` comes from the normalizer and has one entry per row.
pub fn attach_labels(table: &SpecTable, labels: &[String], prefix: &str) -> LabeledTable {
    debug_assert_eq!(table.rows.len(), labels.len());

    let rows = table
        .rows
        .iter()
        .zip(labels)
        .map(|(row, label)| LabeledRow {
            index: row.index,
            label: format!("{}{}", prefix, label),
            description: row.description.clone(),
            expression: row.expression.clone(),
            values: row.values.clone(),
        })
        .collect();

    LabeledTable {
        segment_columns: table.segment_columns.clone(),
        rows,
    }
}

/// Unpivot every segment cell, empty ones included.
///
/// Entries are ordered by row, then by segment column.
pub fn unpivot(table: &LabeledTable) -> Vec<LongEntry> {
    let mut entries = Vec::with_capacity(table.rows.len() * table.segment_columns.len());

    for row in &table.rows {
        for (column, segment) in table.segment_columns.iter().enumerate() {
            entries.push(LongEntry {
                index: row.index,
                label: row.label.clone(),
                column,
                segment: segment.clone(),
                value: row.values.get(column).cloned().flatten(),
            });
        }
    }

    entries
}

/// Rebuild the specification with coefficient names in place of values.
///
/// Rows that have no coefficient at all are left out unless `keep_empty_rows`
/// is set. Every segment column is kept in the output, even if all its cells
/// are empty.
pub fn build_final_spec(
    table: &LabeledTable,
    long: &[LongEntry],
    keep_empty_rows: bool,
) -> FinalSpecTable {
    let width = table.segment_columns.len();
    let mut rows: Vec<(usize, FinalSpecRow)> = table
        .rows
        .iter()
        .map(|row| {
            (
                row.index,
                FinalSpecRow {
                    label: row.label.clone(),
                    description: row.description.clone(),
                    expression: row.expression.clone(),
                    cells: vec![None; width],
                },
            )
        })
        .collect();

    // Row indices are positions, but look them up rather than assume it.
    rows.sort_by_key(|(index, _)| *index);
    for entry in long.iter().filter(|e| e.value.is_some()) {
        if let Ok(pos) = rows.binary_search_by_key(&entry.index, |(index, _)| *index) {
            if let Some(cell) = rows[pos].1.cells.get_mut(entry.column) {
                *cell = Some(entry.coefficient_name());
            }
        }
    }

    let rows = rows
        .into_iter()
        .map(|(_, row)| row)
        .filter(|row| keep_empty_rows || row.cells.iter().any(Option::is_some))
        .collect();

    FinalSpecTable {
        segment_columns: table.segment_columns.clone(),
        rows,
    }
}

//! CSV writers for the two output tables.

use csv::{Writer, WriterBuilder};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::ExportResult;
use crate::models::{CoefficientRecord, FinalSpecTable};

/// Default file name of the specification output.
pub const SPEC_FILE_NAME: &str = "spec.csv";
/// Default file name of the coefficients output.
pub const COEFFICIENTS_FILE_NAME: &str = "coefficients.csv";

const COEFFICIENTS_HEADER: [&str; 3] = ["coefficient_name", "value", "constrain"];

fn writer<W: Write>(inner: W) -> Writer<W> {
    WriterBuilder::new().has_headers(false).from_writer(inner)
}

/// Write the specification table.
pub fn write_spec<W: Write>(spec: &FinalSpecTable, out: W) -> ExportResult<()> {
    let mut wtr = writer(out);
    wtr.write_record(spec.header())?;
    for row in &spec.rows {
        wtr.write_record(spec.row_cells(row))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the coefficients table. The header is written even when empty.
pub fn write_coefficients<W: Write>(records: &[CoefficientRecord], out: W) -> ExportResult<()> {
    let mut wtr = writer(out);
    wtr.write_record(COEFFICIENTS_HEADER)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Specification table as CSV text.
pub fn spec_to_csv(spec: &FinalSpecTable) -> ExportResult<String> {
    let mut buf = Vec::new();
    write_spec(spec, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

/// Coefficients table as CSV text.
pub fn coefficients_to_csv(records: &[CoefficientRecord]) -> ExportResult<String> {
    let mut buf = Vec::new();
    write_coefficients(records, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

/// Write both tables to files.
///
/// Both tables are staged in temporary files next to their targets before
/// either target is touched. If the second rename fails, the first target is
/// removed again.
pub fn write_outputs(
    spec: &FinalSpecTable,
    records: &[CoefficientRecord],
    spec_path: &Path,
    coefficients_path: &Path,
) -> ExportResult<()> {
    let spec_tmp = stage(spec_path, &spec_to_csv(spec)?)?;
    let coefficients_tmp = stage(coefficients_path, &coefficients_to_csv(records)?)?;

    spec_tmp.persist(spec_path).map_err(|e| e.error)?;
    if let Err(e) = coefficients_tmp.persist(coefficients_path) {
        let _ = fs::remove_file(spec_path);
        return Err(e.error.into());
    }
    Ok(())
}

fn stage(target: &Path, content: &str) -> ExportResult<NamedTempFile> {
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    Ok(tmp)
}

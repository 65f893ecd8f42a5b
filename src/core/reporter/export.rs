//! Export of comparison results.
//!
//! CSV columns: original, altered, difference, status

use crate::core::scheduler::ComparisonResult;
use std::io::Write;

use super::status_label;

/// Write `results` as CSV, one row per pair
pub fn export_csv<W: Write>(results: &[ComparisonResult], mut writer: W) -> std::io::Result<()> {
    writeln!(writer, "original,altered,difference,status")?;

    for result in results {
        writeln!(
            writer,
            "{},{},{},{}",
            csv_field(&result.original.display().to_string()),
            csv_field(&result.altered.display().to_string()),
            result.difference,
            status_label(result.is_abnormal)
        )?;
    }

    Ok(())
}

/// Quote a field if it contains a delimiter, quote or newline
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

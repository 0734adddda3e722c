//! Histogram data export.
//!
//! The size histogram is handed to an external plotter as plain
//! `size count` lines, one allocation size per line, ascending.

use super::json::prepare_output_path;
use super::schema::Report;
use crate::utils::error::OutputError;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// `(size, count)` pairs of a report, ascending by size
pub fn histogram_pairs(report: &Report) -> Vec<(u64, u64)> {
    report
        .histogram
        .iter()
        .map(|bin| (bin.size, bin.count))
        .collect()
}

/// Write the histogram of a report as `size count` lines
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::InvalidPath` - Path is invalid
pub fn write_histogram(report: &Report, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing histogram to: {}", output_path.display());
    prepare_output_path(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "# size count")?;
    for (size, count) in histogram_pairs(report) {
        writeln!(writer, "{} {}", size, count)?;
    }
    writer.flush()?;

    info!("Histogram written ({} sizes)", report.histogram.len());
    Ok(())
}

use crate::report::read_report;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Validate a report JSON file
pub fn validate_report_file(file_path: PathBuf) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let report = read_report(&file_path)
        .with_context(|| format!("{} is not a valid report", file_path.display()))?;

    if report.version != SCHEMA_VERSION {
        anyhow::bail!(
            "Report schema v{} does not match supported v{}",
            report.version,
            SCHEMA_VERSION
        );
    }

    println!("✓ Valid report JSON");
    println!("  Version: {}", report.version);
    println!("  Source: {}", report.source);
    println!(
        "  Window: {} ({:?})",
        report.window.as_deref().unwrap_or("-"),
        report.outcome
    );
    println!("  Live bytes: {}", report.total_size);
    println!("  High-water mark: {}", report.high_water_mark);
    println!("  Leaks: {}", report.leak_count());
    println!("  Anomalies: {}", report.anomalies.len());

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("Memtrace Analyzer Report Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string           - Schema version (e.g., '1.0.0')");
        println!("  source: string            - Trace file the report was built from");
        println!("  target_level: number      - Level of the analyzed window");
        println!("  window: string?           - Message of the opening Start record");
        println!("  outcome: string           - completed | unterminated | not_found");
        println!("  events_decoded: number    - Records decoded by the session");
        println!("  counts: object            - mallocs, frees, reallocs applied");
        println!("  total_size: number        - Bytes live at window end");
        println!("  high_water_mark: number   - Peak live bytes");
        println!("  histogram: array          - Lifetime allocation sizes");
        println!("    size: number            - Allocation size in bytes");
        println!("    count: number           - Allocations made with that size");
        println!("  leaks: object?            - Allocations live at window end");
        println!("    leaked_bytes: number    - Sum of leaked sizes");
        println!("    allocations: array      - ptr, size, frames per allocation");
        println!("  anomalies: array          - Protocol anomalies by record");
        println!("  watch_hits: array?        - Allocations of watched sizes");
        println!("  generated_at: string      - ISO 8601 timestamp");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("Memtrace Analyzer v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Leak and allocation-size analysis for instrumented allocator traces.");
}

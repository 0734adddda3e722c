//! Analyze command implementation.
//!
//! The analyze command:
//! 1. Reads the trace file
//! 2. Loads the firmware symbols (if an ELF image was given)
//! 3. Runs a session over the selected window
//! 4. Builds the report
//! 5. Writes output files

use crate::report::{build_report, format_summary, write_histogram, write_report, Report, ReportOptions};
use crate::session::{analyze_window, SessionConfig, SessionOutcome};
use crate::symbols::SymbolResolver;
use crate::utils::config::{DEFAULT_MAX_FRAMES, DEFAULT_TARGET_LEVEL, LEVEL_MASK};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    /// Raw trace captured from the target
    pub trace_path: PathBuf,

    /// Firmware ELF image used to resolve frames (optional)
    pub elf_path: Option<PathBuf>,

    /// Level of the window to analyze
    pub target_level: u8,

    /// Which window at that level, counting from 1
    pub window: usize,

    /// Output path for JSON report (optional)
    pub output_json: Option<PathBuf>,

    /// Output path for histogram data (optional)
    pub output_histogram: Option<PathBuf>,

    /// Allocation sizes whose traces are reported
    pub watch_sizes: Vec<u64>,

    /// List allocations still live at window end
    pub include_leaks: bool,

    /// Frames printed per trace in the summary
    pub max_frames: usize,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            trace_path: PathBuf::new(),
            elf_path: None,
            target_level: DEFAULT_TARGET_LEVEL,
            window: 1,
            output_json: None,
            output_histogram: None,
            watch_sizes: Vec::new(),
            include_leaks: true,
            max_frames: DEFAULT_MAX_FRAMES,
            print_summary: true,
        }
    }
}

/// Execute the analyze command
///
/// **Public** - main entry point called from main.rs
///
/// # Returns
/// The report that was printed and written
///
/// # Errors
/// * Unreadable trace or ELF file
/// * Malformed trace stream (unknown opcode, truncated record)
/// * File write errors
pub fn execute_analyze(args: AnalyzeArgs) -> Result<Report> {
    let start_time = Instant::now();

    info!("Analyzing trace: {}", args.trace_path.display());

    // Step 1: Read trace
    info!("Step 1/5: Reading trace file...");
    let data = std::fs::read(&args.trace_path)
        .with_context(|| format!("Failed to read trace file {}", args.trace_path.display()))?;
    debug!("Trace holds {} bytes", data.len());

    // Step 2: Load symbols
    let resolver = match &args.elf_path {
        Some(elf_path) => {
            info!("Step 2/5: Loading firmware symbols...");
            SymbolResolver::from_elf_file(elf_path)
                .with_context(|| format!("Failed to load symbols from {}", elf_path.display()))?
        }
        None => {
            info!("Step 2/5: Skipping symbol loading (no ELF image given)");
            SymbolResolver::empty()
        }
    };

    // Step 3: Run session
    info!(
        "Step 3/5: Tracking window {} at level {}...",
        args.window, args.target_level
    );
    let config = SessionConfig {
        target_level: args.target_level,
        watch_sizes: args.watch_sizes.iter().copied().collect(),
    };
    let session = analyze_window(&data, config, args.window)
        .context("Failed to decode trace stream")?;

    if session.outcome == SessionOutcome::NotFound {
        warn!(
            "Window {} at level {} not found in trace",
            args.window, args.target_level
        );
    }
    if !session.diagnostics.is_empty() {
        warn!("{} protocol anomalies detected", session.diagnostics.len());
    }

    // Step 4: Build report
    info!("Step 4/5: Building report...");
    let options = ReportOptions {
        source: args.trace_path.display().to_string(),
        include_leaks: args.include_leaks,
    };
    let report = build_report(&session, &resolver, &options);

    // Step 5: Write outputs
    info!("Step 5/5: Writing output files...");
    if let Some(json_path) = &args.output_json {
        write_report(&report, json_path).context("Failed to write report JSON")?;
        info!("✓ Report written to: {}", json_path.display());
    }
    if let Some(histogram_path) = &args.output_histogram {
        write_histogram(&report, histogram_path).context("Failed to write histogram data")?;
        info!("✓ Histogram written to: {}", histogram_path.display());
    }

    if args.print_summary {
        println!("{}", format_summary(&report, args.max_frames));
    }

    let elapsed = start_time.elapsed();
    info!("Analysis completed in {:.2}s", elapsed.as_secs_f64());

    Ok(report)
}

/// Validate analyze arguments
///
/// **Public** - can be called before execute_analyze for early validation
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    if args.trace_path.as_os_str().is_empty() {
        anyhow::bail!("Trace path cannot be empty");
    }

    if args.target_level > LEVEL_MASK {
        anyhow::bail!("Level must be between 0 and {}", LEVEL_MASK);
    }

    if args.window == 0 {
        anyhow::bail!("Window numbering starts at 1");
    }

    if args.max_frames == 0 {
        anyhow::bail!("max_frames must be greater than 0");
    }

    if args.watch_sizes.contains(&0) {
        anyhow::bail!("Watched sizes must be greater than 0");
    }

    Ok(())
}

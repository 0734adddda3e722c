//! Memtrace Analyzer CLI
//!
//! Replays allocator traces captured on an embedded target and reports
//! leaks, peak usage and allocation sizes.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use memtrace_analyzer::commands::{
    display_schema, display_version, execute_analyze, execute_dump, validate_args,
    validate_report_file, AnalyzeArgs, DumpArgs,
};
use memtrace_analyzer::utils::config::{DEFAULT_MAX_FRAMES, DEFAULT_TARGET_LEVEL, LEVEL_ENV_VAR};

/// Memtrace Analyzer - allocation tracking for embedded traces
#[derive(Parser, Debug)]
#[command(name = "memtrace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze one trace window and report leaks
    Analyze {
        /// Raw trace file captured from the target
        #[arg(short, long)]
        trace: PathBuf,

        /// Firmware ELF image for symbol resolution
        #[arg(short, long)]
        elf: Option<PathBuf>,

        /// Level of the Start/Stop window to analyze
        #[arg(short, long, env = LEVEL_ENV_VAR, default_value_t = DEFAULT_TARGET_LEVEL)]
        level: u8,

        /// Which window at that level to analyze, counting from 1
        #[arg(short, long, default_value = "1")]
        window: usize,

        /// Output path for JSON report (optional)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output path for histogram data (optional)
        #[arg(long)]
        histogram: Option<PathBuf>,

        /// Print the stack trace of every allocation of this size
        #[arg(long = "watch-size")]
        watch_sizes: Vec<u64>,

        /// Skip the listing of allocations live at window end
        #[arg(long)]
        no_leaks: bool,

        /// Frames printed per stack trace
        #[arg(long, default_value_t = DEFAULT_MAX_FRAMES)]
        max_frames: usize,

        /// Do not print the text summary
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print every decoded record of a trace
    Dump {
        /// Raw trace file captured from the target
        #[arg(short, long)]
        trace: PathBuf,

        /// Firmware ELF image for symbol resolution
        #[arg(short, long)]
        elf: Option<PathBuf>,

        /// Stop after this many records
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Validate a report JSON file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Analyze {
            trace,
            elf,
            level,
            window,
            output,
            histogram,
            watch_sizes,
            no_leaks,
            max_frames,
            quiet,
        } => {
            let args = AnalyzeArgs {
                trace_path: trace,
                elf_path: elf,
                target_level: level,
                window,
                output_json: output,
                output_histogram: histogram,
                watch_sizes,
                include_leaks: !no_leaks,
                max_frames,
                print_summary: !quiet,
            };

            // Validate args first
            validate_args(&args)?;

            execute_analyze(args)?;
        }

        Commands::Dump { trace, elf, limit } => {
            execute_dump(DumpArgs {
                trace_path: trace,
                elf_path: elf,
                limit,
            })?;
        }

        Commands::Validate { file } => {
            validate_report_file(file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}

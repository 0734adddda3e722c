//! Reports built from finished sessions.
//!
//! This module handles:
//! - Resolving captured traces against the symbol table
//! - The serializable report schema
//! - Text summaries, JSON files and histogram data files

pub mod builder;
pub mod histogram;
pub mod json;
pub mod schema;
pub mod text;

// Re-export main types and functions
pub use builder::{build_report, resolve_trace, ReportOptions};
pub use histogram::{histogram_pairs, write_histogram};
pub use json::{read_report, report_to_string, validate_path, write_report};
pub use schema::{
    AnomalyEntry, HistogramBin, LeakEntry, LeakSummary, Report, ResolvedFrame, WatchEntry,
};
pub use text::{format_event, format_frames, format_summary};

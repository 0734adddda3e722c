//! Memtrace Analyzer
//!
//! Leak and allocation-size analysis for traces captured from an
//! instrumented allocator on an embedded target.
//!
//! The target emits a binary record for every allocator call. This crate
//! decodes that stream, replays the records of one Start/Stop window into
//! an allocation tracker and reports what is still live at the end,
//! with stack frames resolved against the firmware's ELF symbols.
//!
//! ## Getting Started
//!
//! ```bash
//! memtrace analyze --trace capture.bin --elf firmware.elf --level 2
//! memtrace dump --trace capture.bin --limit 50
//! ```
//!
//! As a library:
//!
//! ```no_run
//! use memtrace_analyzer::report::{build_report, format_summary, ReportOptions};
//! use memtrace_analyzer::session::{analyze, SessionConfig};
//! use memtrace_analyzer::symbols::SymbolResolver;
//!
//! let data = std::fs::read("capture.bin").unwrap();
//! let session = analyze(&data, SessionConfig::new(2)).unwrap();
//! let report = build_report(&session, &SymbolResolver::empty(), &ReportOptions::default());
//! println!("{}", format_summary(&report, 16));
//! ```

pub mod commands;
pub mod decoder;
pub mod report;
pub mod session;
pub mod symbols;
pub mod tracker;
pub mod utils;

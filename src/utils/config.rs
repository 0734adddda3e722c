//! Configuration and constants for the analyzer.

/// Current report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

// Level byte layout: bit 7 flags a captured stack trace, bits 0-6 carry the level
pub const STACK_TRACE_MASK: u8 = 0x80;
pub const LEVEL_MASK: u8 = 0x7F;

/// Level of the window analyzed when none is given.
/// The tracer starts at level 1, so the first `mt_start` opens level 2.
pub const DEFAULT_TARGET_LEVEL: u8 = 2;

/// Name of the fallback range returned for unresolved addresses
pub const SENTINEL_NAME: &str = "<0>";

/// Frames printed per captured trace in text output
pub const DEFAULT_MAX_FRAMES: usize = 32;

/// Histogram bins shown in the text summary
pub const SUMMARY_HISTOGRAM_BINS: usize = 20;

/// Width of the widest histogram bar in the text summary
pub const HISTOGRAM_BAR_WIDTH: usize = 50;

/// Environment variable consulted for the target level
pub const LEVEL_ENV_VAR: &str = "MEMTRACE_LEVEL";

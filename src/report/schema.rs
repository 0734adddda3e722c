//! Report JSON schema definitions.
//!
//! This module defines the structure of report files we write to disk.
//! Schema is versioned to allow future evolution.

use crate::session::SessionOutcome;
use crate::tracker::{EventCounts, ProtocolAnomaly};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level report structure written to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Schema version for compatibility checking
    pub version: String,

    /// Trace file (or other label) the report was built from
    pub source: String,

    /// Level whose window was analyzed
    pub target_level: u8,

    /// Message of the Start record that opened the window
    pub window: Option<String>,

    pub outcome: SessionOutcome,

    /// Records decoded from the start of the trace until the window closed,
    /// counting skipped earlier windows
    pub events_decoded: usize,

    pub counts: EventCounts,

    /// Bytes still live at the end of the window
    pub total_size: u64,

    /// Peak of live bytes inside the window
    pub high_water_mark: u64,

    /// Lifetime allocation sizes, ascending
    pub histogram: Vec<HistogramBin>,

    /// Remaining live allocations; absent when leak listing was disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaks: Option<LeakSummary>,

    pub anomalies: Vec<AnomalyEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub watch_hits: Vec<WatchEntry>,

    /// Timestamp when report was generated
    pub generated_at: String,
}

/// Number of allocations made with one size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub size: u64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeakSummary {
    pub leaked_bytes: u64,
    pub allocations: Vec<LeakEntry>,
}

/// An allocation still live at window end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeakEntry {
    pub ptr: u32,
    pub size: u64,
    pub frames: Vec<ResolvedFrame>,
}

/// A protocol anomaly and the record that raised it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyEntry {
    pub event_index: usize,
    pub offset: usize,
    #[serde(flatten)]
    pub anomaly: ProtocolAnomaly,
}

/// An allocation of a watched size
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEntry {
    pub event_index: usize,
    pub ptr: u32,
    pub size: u64,
    pub frames: Vec<ResolvedFrame>,
}

/// A captured frame with both addresses resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFrame {
    /// Position counted from the outermost frame; the innermost frame has the highest index
    pub index: usize,

    /// Callee address and the function containing it
    pub to: u32,
    pub function: String,

    /// Call site address, its function and the distance from that function's start
    pub from: u32,
    pub caller: String,
    pub caller_offset: u64,
}

impl fmt::Display for ResolvedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:02}] {} ({:08X}) [from {} + 0x{:X} ({:08X})]",
            self.index, self.function, self.to, self.caller, self.caller_offset, self.from
        )
    }
}

impl Report {
    /// Number of leaked allocations, zero when leak listing was disabled
    pub fn leak_count(&self) -> usize {
        self.leaks
            .as_ref()
            .map_or(0, |leaks| leaks.allocations.len())
    }
}

//! Reconstruction of the live-allocation set.
//!
//! This module turns allocator events into:
//! - The set of live allocations, keyed by address
//! - Running and peak totals of live bytes
//! - A lifetime histogram of allocation sizes
//! - A log of protocol anomalies

pub mod allocation;
pub mod anomaly;

// Re-export main types
pub use allocation::{AllocationRecord, AllocationTracker, EventCounts, LeakSnapshot};
pub use anomaly::ProtocolAnomaly;

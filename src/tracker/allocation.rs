//! Allocation tracker state machine.
//!
//! One tracker is created per analysis session and owns every piece of
//! allocation state for that session.

use super::anomaly::ProtocolAnomaly;
use crate::decoder::Frame;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A live allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub ptr: u32,
    pub size: u64,

    /// Stack captured with the allocating event, innermost frame first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<Frame>>,
}

/// Number of allocator events applied, by kind
///
/// Calloc events count as mallocs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCounts {
    pub mallocs: u64,
    pub frees: u64,
    pub reallocs: u64,
}

/// Allocations still live at the time of the snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeakSnapshot {
    /// Live records sorted by address
    pub allocations: Vec<AllocationRecord>,

    /// Sum of the live sizes
    pub total_size: u64,
}

/// Live-allocation set plus aggregate statistics
#[derive(Debug, Clone, Default)]
pub struct AllocationTracker {
    live: HashMap<u32, AllocationRecord>,
    total_size: u64,
    high_water_mark: u64,
    histogram: BTreeMap<u64, u64>,
    counts: EventCounts,
    anomalies: Vec<ProtocolAnomaly>,
}

impl AllocationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a malloc event
    pub fn handle_malloc(&mut self, ptr: u32, len: u64, trace: Option<Vec<Frame>>) {
        self.counts.mallocs += 1;
        self.allocate(ptr, len, trace);
    }

    /// Apply a calloc event as a malloc of `block_size * n_blocks` bytes
    pub fn handle_calloc(
        &mut self,
        ptr: u32,
        block_size: u32,
        n_blocks: u32,
        trace: Option<Vec<Frame>>,
    ) {
        let len = u64::from(block_size) * u64::from(n_blocks);
        self.handle_malloc(ptr, len, trace);
    }

    /// Apply a free event; `free(0)` is a no-op
    pub fn handle_free(&mut self, ptr: u32) {
        self.counts.frees += 1;
        self.release(ptr);
    }

    /// Apply a realloc event
    ///
    /// A zero length frees `oldptr` even when `oldptr` is null. Otherwise a
    /// null `oldptr` is a plain malloc, and anything else is a free of
    /// `oldptr` followed by a malloc of `newptr`, which makes resizing in
    /// place (`oldptr == newptr`) a valid update.
    pub fn handle_realloc(
        &mut self,
        oldptr: u32,
        newptr: u32,
        len: u64,
        trace: Option<Vec<Frame>>,
    ) {
        self.counts.reallocs += 1;
        if len == 0 {
            self.release(oldptr);
        } else if oldptr == 0 {
            self.allocate(newptr, len, trace);
        } else {
            self.release(oldptr);
            self.allocate(newptr, len, trace);
        }
    }

    fn allocate(&mut self, ptr: u32, len: u64, trace: Option<Vec<Frame>>) {
        if let Some(previous) = self.live.remove(&ptr) {
            debug!(
                "Address {:08X} allocated while live ({} bytes)",
                ptr, previous.size
            );
            self.anomalies.push(ProtocolAnomaly::DoubleAlloc {
                ptr,
                previous_size: previous.size,
                size: len,
            });
            // The overwritten record no longer counts as live
            self.total_size -= previous.size;
        }

        self.live.insert(
            ptr,
            AllocationRecord {
                ptr,
                size: len,
                trace,
            },
        );
        *self.histogram.entry(len).or_insert(0) += 1;
        self.total_size += len;
        self.high_water_mark = self.high_water_mark.max(self.total_size);
    }

    fn release(&mut self, ptr: u32) {
        if ptr == 0 {
            return;
        }
        match self.live.remove(&ptr) {
            Some(record) => self.total_size -= record.size,
            None => {
                debug!("Free of untracked address {:08X}", ptr);
                self.anomalies
                    .push(ProtocolAnomaly::FreeOfUnknownAddress { ptr });
            }
        }
    }

    /// Every still-live allocation plus their total size
    pub fn snapshot_leaks(&self) -> LeakSnapshot {
        let mut allocations: Vec<AllocationRecord> = self.live.values().cloned().collect();
        allocations.sort_by_key(|record| record.ptr);
        let total_size = allocations.iter().map(|record| record.size).sum();

        LeakSnapshot {
            allocations,
            total_size,
        }
    }

    pub fn is_live(&self, ptr: u32) -> bool {
        self.live.contains_key(&ptr)
    }

    /// Size of the live allocation at `ptr`, if any
    pub fn live_size(&self, ptr: u32) -> Option<u64> {
        self.live.get(&ptr).map(|record| record.size)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Bytes currently live
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Peak of `total_size` over the tracker's lifetime
    pub fn high_water_mark(&self) -> u64 {
        self.high_water_mark
    }

    /// Allocation size -> number of allocations ever made with that size
    pub fn histogram(&self) -> &BTreeMap<u64, u64> {
        &self.histogram
    }

    pub fn counts(&self) -> EventCounts {
        self.counts
    }

    pub fn anomalies(&self) -> &[ProtocolAnomaly] {
        &self.anomalies
    }
}

//! Recoverable inconsistencies in the allocator event stream.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Event that contradicts the tracked state
///
/// Anomalies never stop processing; the tracker keeps converging over the
/// rest of the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProtocolAnomaly {
    /// An allocation was reported at an address that is already live
    DoubleAlloc {
        ptr: u32,
        previous_size: u64,
        size: u64,
    },

    /// A non-null address was freed without being live
    FreeOfUnknownAddress { ptr: u32 },
}

impl ProtocolAnomaly {
    pub fn ptr(&self) -> u32 {
        match self {
            ProtocolAnomaly::DoubleAlloc { ptr, .. } => *ptr,
            ProtocolAnomaly::FreeOfUnknownAddress { ptr } => *ptr,
        }
    }
}

impl fmt::Display for ProtocolAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolAnomaly::DoubleAlloc {
                ptr,
                previous_size,
                size,
            } => write!(
                f,
                "double allocation at {:08X} ({} bytes replaced by {} bytes)",
                ptr, previous_size, size
            ),
            ProtocolAnomaly::FreeOfUnknownAddress { ptr } => {
                write!(f, "free of unknown address {:08X}", ptr)
            }
        }
    }
}

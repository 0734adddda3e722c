//! Event model for the memory tracer stream.
//!
//! Each record on the wire starts with an opcode byte that selects the
//! payload. Decoded records become an [`Event`] whose [`Operation`] carries
//! only the fields that opcode defines.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opcodes emitted by the instrumented allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Start = 0,
    Malloc = 1,
    Free = 2,
    Realloc = 3,
    Calloc = 4,
    Stop = 5,
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Opcode::Start),
            1 => Ok(Opcode::Malloc),
            2 => Ok(Opcode::Free),
            3 => Ok(Opcode::Realloc),
            4 => Ok(Opcode::Calloc),
            5 => Ok(Opcode::Stop),
            other => Err(other),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::Start => "START",
            Opcode::Malloc => "MALLOC",
            Opcode::Free => "FREE",
            Opcode::Realloc => "REALLOC",
            Opcode::Calloc => "CALLOC",
            Opcode::Stop => "STOP",
        };
        f.write_str(name)
    }
}

/// One captured stack level: the call site (`from`) and the callee (`to`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frame {
    pub from: u32,
    pub to: u32,
}

impl Frame {
    pub fn new(from: u32, to: u32) -> Self {
        Self { from, to }
    }
}

/// Opcode-specific payload of a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Opens a trace window labelled with `msg`
    Start { msg: String },

    Malloc { ptr: u32, len: u32 },

    Free { ptr: u32 },

    Realloc { newptr: u32, oldptr: u32, len: u32 },

    /// Raw calloc fields; the product is computed by the tracker
    Calloc {
        ptr: u32,
        block_size: u32,
        n_blocks: u32,
    },

    /// Closes the trace window at the record's level
    Stop,
}

impl Operation {
    pub fn opcode(&self) -> Opcode {
        match self {
            Operation::Start { .. } => Opcode::Start,
            Operation::Malloc { .. } => Opcode::Malloc,
            Operation::Free { .. } => Opcode::Free,
            Operation::Realloc { .. } => Opcode::Realloc,
            Operation::Calloc { .. } => Opcode::Calloc,
            Operation::Stop => Opcode::Stop,
        }
    }

    /// True for the operations the allocation tracker consumes
    pub fn is_allocation(&self) -> bool {
        matches!(
            self,
            Operation::Malloc { .. }
                | Operation::Free { .. }
                | Operation::Realloc { .. }
                | Operation::Calloc { .. }
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Start { msg } => write!(f, "START '{}'", msg),
            Operation::Malloc { ptr, len } => write!(f, "MALLOC ptr={:08X} len={}", ptr, len),
            Operation::Free { ptr } => write!(f, "FREE ptr={:08X}", ptr),
            Operation::Realloc { newptr, oldptr, len } => write!(
                f,
                "REALLOC newptr={:08X} oldptr={:08X} len={}",
                newptr, oldptr, len
            ),
            Operation::Calloc {
                ptr,
                block_size,
                n_blocks,
            } => write!(
                f,
                "CALLOC ptr={:08X} block_size={} n_blocks={}",
                ptr, block_size, n_blocks
            ),
            Operation::Stop => f.write_str("STOP"),
        }
    }
}

/// A decoded record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Ordinal of the record since the decoder was created or rewound
    pub index: usize,

    /// Byte offset of the record's opcode in the buffer
    pub offset: usize,

    /// Nesting level, 0..=127
    pub level: u8,

    /// Stack captured at emission time, innermost frame first
    pub trace: Option<Vec<Frame>>,

    pub op: Operation,
}

impl Event {
    pub fn opcode(&self) -> Opcode {
        self.op.opcode()
    }

    pub fn frames(&self) -> &[Frame] {
        self.trace.as_deref().unwrap_or(&[])
    }
}

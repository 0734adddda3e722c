//! Decoding of the memory tracer byte stream.
//!
//! This module handles:
//! - The typed event model (one variant per tracer opcode)
//! - Decoding big-endian records from a fully loaded buffer
//! - Encoding synthetic streams in the same wire layout

pub mod event;
pub mod stream;
pub mod writer;

// Re-export main types
pub use event::{Event, Frame, Opcode, Operation};
pub use stream::Decoder;
pub use writer::TraceWriter;

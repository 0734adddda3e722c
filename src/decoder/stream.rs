//! Record decoder for the memory tracer stream.
//!
//! Wire layout (all integers big-endian):
//!
//! ```text
//! opcode:u8  level:u8  [count:u16 (from:u32 to:u32)*count]  payload
//! ```
//!
//! Bit 7 of the level byte announces the optional stack trace. There is no
//! stream header; the stream ends when the buffer is exhausted.
//!
//! Calloc carries three `u32` fields in the order `ptr`, `block_size`,
//! `n_blocks`. The pointer comes first, as it does for malloc.

use super::event::{Event, Frame, Opcode, Operation};
use crate::utils::config::{LEVEL_MASK, STACK_TRACE_MASK};
use crate::utils::error::DecodeError;
use log::debug;

/// Cursor over a fully loaded trace buffer
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    index: usize,
    failed: bool,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            index: 0,
            failed: false,
        }
    }

    /// Move the cursor to `pos` and restart record numbering.
    ///
    /// The next decoded event gets `index` 0 whatever `pos` is, so indices
    /// taken before a rewind do not carry over. `offset` stays absolute.
    /// Positions past the end of the buffer are clamped to its length.
    pub fn rewind(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
        self.index = 0;
        self.failed = false;
    }

    /// Byte offset of the next record
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the cursor
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Decode the record under the cursor
    ///
    /// # Returns
    /// `Ok(None)` when the cursor sits exactly at the end of the buffer
    ///
    /// # Errors
    /// * `DecodeError::UnknownOpcode` - opcode outside the tracer's set
    /// * `DecodeError::InputTruncated` - buffer ends inside the record
    ///
    /// On error the cursor is left at the start of the offending record.
    pub fn decode_next(&mut self) -> Result<Option<Event>, DecodeError> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }

        let offset = self.pos;
        match self.decode_record(offset) {
            Ok(event) => {
                self.index += 1;
                Ok(Some(event))
            }
            Err(e) => {
                debug!("Decoding stopped at offset {:#x}: {}", offset, e);
                self.pos = offset;
                Err(e)
            }
        }
    }

    fn decode_record(&mut self, offset: usize) -> Result<Event, DecodeError> {
        let opcode_byte = self.read_u8("opcode")?;
        let opcode = Opcode::try_from(opcode_byte).map_err(|opcode| {
            DecodeError::UnknownOpcode { opcode, offset }
        })?;

        let level_byte = self.read_u8("level")?;
        let level = level_byte & LEVEL_MASK;
        let trace = if level_byte & STACK_TRACE_MASK != 0 {
            Some(self.read_trace()?)
        } else {
            None
        };

        let op = match opcode {
            Opcode::Start => Operation::Start {
                msg: self.read_string()?,
            },
            Opcode::Malloc => Operation::Malloc {
                ptr: self.read_u32("malloc ptr")?,
                len: self.read_u32("malloc len")?,
            },
            Opcode::Free => Operation::Free {
                ptr: self.read_u32("free ptr")?,
            },
            Opcode::Realloc => Operation::Realloc {
                newptr: self.read_u32("realloc newptr")?,
                oldptr: self.read_u32("realloc oldptr")?,
                len: self.read_u32("realloc len")?,
            },
            Opcode::Calloc => Operation::Calloc {
                ptr: self.read_u32("calloc ptr")?,
                block_size: self.read_u32("calloc block size")?,
                n_blocks: self.read_u32("calloc block count")?,
            },
            Opcode::Stop => Operation::Stop,
        };

        Ok(Event {
            index: self.index,
            offset,
            level,
            trace,
            op,
        })
    }

    fn read_trace(&mut self) -> Result<Vec<Frame>, DecodeError> {
        let count = self.read_u16("trace count")? as usize;
        // Cap the preallocation by what the buffer can actually hold
        let mut frames = Vec::with_capacity(count.min(self.remaining() / 8));
        for _ in 0..count {
            let from = self.read_u32("trace from")?;
            let to = self.read_u32("trace to")?;
            frames.push(Frame { from, to });
        }
        Ok(frames)
    }

    fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_u16("message length")? as usize;
        let bytes = self.take(len, "message")?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn read_u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        let [byte] = self.take_array::<1>(field)?;
        Ok(byte)
    }

    fn read_u16(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.take_array(field)?))
    }

    fn read_u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.take_array(field)?))
    }

    fn take_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, field)?);
        Ok(out)
    }

    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        let available = self.remaining();
        if available < n {
            return Err(DecodeError::InputTruncated {
                offset: self.pos,
                field,
                needed: n,
                available,
            });
        }
        let data: &'a [u8] = self.data;
        let bytes = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }
}

/// Yields decoded events; stops after end-of-stream or the first error
impl Iterator for Decoder<'_> {
    type Item = Result<Event, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.decode_next() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

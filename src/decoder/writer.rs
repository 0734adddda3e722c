//! Encoder producing streams in the tracer's wire layout.
//!
//! Mirrors what the instrumented allocator emits on the target, so that
//! sessions can be replayed on the host without hardware.

use super::event::{Event, Frame, Operation};
use crate::utils::config::{LEVEL_MASK, STACK_TRACE_MASK};

/// Builder for a trace byte stream
#[derive(Debug, Default, Clone)]
pub struct TraceWriter {
    buf: Vec<u8>,
}

impl TraceWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record.
    ///
    /// Levels are masked to 7 bits. Traces longer than `u16::MAX` frames and
    /// messages longer than `u16::MAX` bytes are cut to fit their length field.
    pub fn push(&mut self, level: u8, trace: Option<&[Frame]>, op: &Operation) -> &mut Self {
        self.buf.push(op.opcode() as u8);

        let level = level & LEVEL_MASK;
        match trace {
            Some(frames) => {
                let count = frames.len().min(u16::MAX as usize);
                self.buf.push(level | STACK_TRACE_MASK);
                self.put_u16(count as u16);
                for frame in &frames[..count] {
                    self.put_u32(frame.from);
                    self.put_u32(frame.to);
                }
            }
            None => self.buf.push(level),
        }

        match op {
            Operation::Start { msg } => {
                let bytes = msg.as_bytes();
                let len = bytes.len().min(u16::MAX as usize);
                self.put_u16(len as u16);
                self.buf.extend_from_slice(&bytes[..len]);
            }
            Operation::Malloc { ptr, len } => {
                self.put_u32(*ptr);
                self.put_u32(*len);
            }
            Operation::Free { ptr } => self.put_u32(*ptr),
            Operation::Realloc {
                newptr,
                oldptr,
                len,
            } => {
                self.put_u32(*newptr);
                self.put_u32(*oldptr);
                self.put_u32(*len);
            }
            Operation::Calloc {
                ptr,
                block_size,
                n_blocks,
            } => {
                self.put_u32(*ptr);
                self.put_u32(*block_size);
                self.put_u32(*n_blocks);
            }
            Operation::Stop => {}
        }
        self
    }

    /// Append a previously decoded event
    pub fn event(&mut self, event: &Event) -> &mut Self {
        self.push(event.level, event.trace.as_deref(), &event.op)
    }

    pub fn start(&mut self, level: u8, msg: &str) -> &mut Self {
        self.push(
            level,
            None,
            &Operation::Start {
                msg: msg.to_string(),
            },
        )
    }

    pub fn stop(&mut self, level: u8) -> &mut Self {
        self.push(level, None, &Operation::Stop)
    }

    pub fn malloc(&mut self, level: u8, ptr: u32, len: u32) -> &mut Self {
        self.push(level, None, &Operation::Malloc { ptr, len })
    }

    pub fn free(&mut self, level: u8, ptr: u32) -> &mut Self {
        self.push(level, None, &Operation::Free { ptr })
    }

    pub fn realloc(&mut self, level: u8, newptr: u32, oldptr: u32, len: u32) -> &mut Self {
        self.push(
            level,
            None,
            &Operation::Realloc {
                newptr,
                oldptr,
                len,
            },
        )
    }

    pub fn calloc(&mut self, level: u8, ptr: u32, block_size: u32, n_blocks: u32) -> &mut Self {
        self.push(
            level,
            None,
            &Operation::Calloc {
                ptr,
                block_size,
                n_blocks,
            },
        )
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn put_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_record_layout() {
        let mut writer = TraceWriter::new();
        writer.start(2, "ab");
        assert_eq!(writer.as_bytes(), &[0, 2, 0, 2, b'a', b'b']);
    }

    #[test]
    fn test_trace_sets_flag_bit() {
        let mut writer = TraceWriter::new();
        writer.push(
            1,
            Some(&[Frame::new(0x0102_0304, 0x0A0B_0C0D)]),
            &Operation::Free { ptr: 0 },
        );
        assert_eq!(
            writer.as_bytes(),
            &[2, 0x81, 0, 1, 1, 2, 3, 4, 0x0A, 0x0B, 0x0C, 0x0D, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_level_is_masked() {
        let mut writer = TraceWriter::new();
        writer.stop(0xFF);
        assert_eq!(writer.as_bytes(), &[5, 0x7F]);
    }
}

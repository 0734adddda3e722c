//! Running sessions over a whole trace buffer.

use super::controller::{Session, SessionConfig, SessionController, SessionOutcome};
use crate::decoder::{Decoder, Operation};
use crate::utils::error::DecodeError;
use log::debug;

/// Location of one Start/Stop window in a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSpan {
    pub label: String,
    pub level: u8,
    pub start_index: usize,
    pub start_offset: usize,

    /// Record index of the closing Stop; `None` if the stream ends first
    pub stop_index: Option<usize>,
}

/// Analyze the first window at the configured level
///
/// Uses a fresh decoder and tracker, so repeated calls over the same buffer
/// are independent.
pub fn analyze(data: &[u8], config: SessionConfig) -> Result<Session, DecodeError> {
    analyze_window(data, config, 1)
}

/// Analyze the `window`-th window (1-based) at the configured level
///
/// # Returns
/// The requested session, or the last session run if the stream ends
/// before that window is closed. Its `events_decoded` includes the records
/// of the windows skipped on the way.
pub fn analyze_window(
    data: &[u8],
    config: SessionConfig,
    window: usize,
) -> Result<Session, DecodeError> {
    let mut decoder = Decoder::new(data);
    let mut ordinal = 1;
    let mut skipped_events = 0;

    loop {
        let mut session = SessionController::new(config.clone()).run(&mut decoder)?;
        if ordinal >= window || session.outcome != SessionOutcome::Completed {
            session.events_decoded += skipped_events;
            return Ok(session);
        }
        skipped_events += session.events_decoded;
        debug!(
            "Skipping window {} ('{}')",
            ordinal,
            session.window.as_deref().unwrap_or_default()
        );
        ordinal += 1;
    }
}

/// List every window at `level` in the stream
///
/// The decoder is rewound to the start of the buffer first.
pub fn find_windows(decoder: &mut Decoder<'_>, level: u8) -> Result<Vec<WindowSpan>, DecodeError> {
    decoder.rewind(0);

    let mut windows = Vec::new();
    let mut open: Option<WindowSpan> = None;

    while let Some(event) = decoder.decode_next()? {
        if event.level != level {
            continue;
        }
        match event.op {
            Operation::Start { msg } => {
                if let Some(previous) = open.take() {
                    windows.push(previous);
                }
                open = Some(WindowSpan {
                    label: msg,
                    level,
                    start_index: event.index,
                    start_offset: event.offset,
                    stop_index: None,
                });
            }
            Operation::Stop => {
                if let Some(mut span) = open.take() {
                    span.stop_index = Some(event.index);
                    windows.push(span);
                }
            }
            _ => {}
        }
    }

    windows.extend(open);
    Ok(windows)
}

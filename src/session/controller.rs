//! Session state machine.
//!
//! ```text
//! Idle --Start(target)--> Recording --Stop(target)--> Done
//!                             |
//!                             +--end of stream------> Done (unterminated)
//! ```

use crate::decoder::{Decoder, Event, Frame, Operation};
use crate::tracker::{AllocationTracker, ProtocolAnomaly};
use crate::utils::config::DEFAULT_TARGET_LEVEL;
use crate::utils::error::DecodeError;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Parameters of one analysis session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Level whose Start/Stop pair delimits the window
    pub target_level: u8,

    /// Allocation sizes whose traces are captured while recording
    pub watch_sizes: BTreeSet<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_level: DEFAULT_TARGET_LEVEL,
            watch_sizes: BTreeSet::new(),
        }
    }
}

impl SessionConfig {
    pub fn new(target_level: u8) -> Self {
        Self {
            target_level,
            ..Default::default()
        }
    }

    pub fn with_watch_size(mut self, size: u64) -> Self {
        self.watch_sizes.insert(size);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Done,
}

/// How the window ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Closed by the matching Stop
    Completed,

    /// Stream ended while recording
    Unterminated,

    /// Stream ended before a Start at the target level
    NotFound,
}

/// A protocol anomaly tied to the event that caused it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub event_index: usize,
    pub offset: usize,
    pub anomaly: ProtocolAnomaly,
}

/// An allocation whose size is being watched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchHit {
    pub event_index: usize,
    pub ptr: u32,
    pub len: u64,
    pub trace: Option<Vec<Frame>>,
}

/// Result of a finished session
#[derive(Debug, Clone)]
pub struct Session {
    pub config: SessionConfig,
    pub outcome: SessionOutcome,

    /// Message of the Start record that opened the window
    pub window: Option<String>,

    pub tracker: AllocationTracker,
    pub diagnostics: Vec<Diagnostic>,
    pub watch_hits: Vec<WatchHit>,

    /// Records decoded by this session, inside and outside the window.
    /// `analyze_window` adds the records of the windows it skipped.
    pub events_decoded: usize,
}

/// Gates decoded events into a tracker
#[derive(Debug)]
pub struct SessionController {
    config: SessionConfig,
    state: SessionState,
    window: Option<String>,
    tracker: AllocationTracker,
    diagnostics: Vec<Diagnostic>,
    watch_hits: Vec<WatchHit>,
    events_decoded: usize,
}

impl SessionController {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            window: None,
            tracker: AllocationTracker::new(),
            diagnostics: Vec::new(),
            watch_hits: Vec::new(),
            events_decoded: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn tracker(&self) -> &AllocationTracker {
        &self.tracker
    }

    /// Apply one decoded event and return the resulting state
    pub fn feed(&mut self, event: Event) -> SessionState {
        self.events_decoded += 1;
        let target = self.config.target_level;

        match self.state {
            SessionState::Idle => match event.op {
                Operation::Start { msg } if event.level == target => {
                    info!("Starting analysis for '{}'", msg);
                    self.window = Some(msg);
                    self.state = SessionState::Recording;
                }
                _ => {}
            },
            SessionState::Recording => match event.op {
                Operation::Stop if event.level == target => {
                    debug!("Window closed at record {}", event.index);
                    self.state = SessionState::Done;
                }
                Operation::Start { .. } | Operation::Stop => {
                    debug!(
                        "Ignoring {} at level {} inside window",
                        event.opcode(),
                        event.level
                    );
                }
                _ => self.apply(event),
            },
            SessionState::Done => {}
        }

        self.state
    }

    fn apply(&mut self, event: Event) {
        let seen = self.tracker.anomalies().len();
        let Event {
            index,
            offset,
            trace,
            op,
            ..
        } = event;

        match op {
            Operation::Malloc { ptr, len } => {
                let len = u64::from(len);
                self.watch(index, ptr, len, &trace);
                self.tracker.handle_malloc(ptr, len, trace);
            }
            Operation::Calloc {
                ptr,
                block_size,
                n_blocks,
            } => {
                self.watch(index, ptr, u64::from(block_size) * u64::from(n_blocks), &trace);
                self.tracker.handle_calloc(ptr, block_size, n_blocks, trace);
            }
            Operation::Free { ptr } => self.tracker.handle_free(ptr),
            Operation::Realloc {
                newptr,
                oldptr,
                len,
            } => {
                let len = u64::from(len);
                if len != 0 {
                    self.watch(index, newptr, len, &trace);
                }
                self.tracker.handle_realloc(oldptr, newptr, len, trace);
            }
            Operation::Start { .. } | Operation::Stop => {}
        }

        for anomaly in &self.tracker.anomalies()[seen..] {
            warn!("Record {} (offset {:#x}): {}", index, offset, anomaly);
            self.diagnostics.push(Diagnostic {
                event_index: index,
                offset,
                anomaly: anomaly.clone(),
            });
        }
    }

    fn watch(&mut self, event_index: usize, ptr: u32, len: u64, trace: &Option<Vec<Frame>>) {
        if self.config.watch_sizes.contains(&len) {
            debug!("Watched {} byte allocation at {:08X}", len, ptr);
            self.watch_hits.push(WatchHit {
                event_index,
                ptr,
                len,
                trace: trace.clone(),
            });
        }
    }

    /// Close the session at end of input
    pub fn finish(self) -> Session {
        let outcome = match self.state {
            SessionState::Idle => {
                warn!(
                    "No window found at level {}",
                    self.config.target_level
                );
                SessionOutcome::NotFound
            }
            SessionState::Recording => {
                info!("Stream ended inside the window, reporting what is live");
                SessionOutcome::Unterminated
            }
            SessionState::Done => SessionOutcome::Completed,
        };

        Session {
            config: self.config,
            outcome,
            window: self.window,
            tracker: self.tracker,
            diagnostics: self.diagnostics,
            watch_hits: self.watch_hits,
            events_decoded: self.events_decoded,
        }
    }

    /// Drive the decoder until the window closes or the stream ends
    ///
    /// Decoding starts at the decoder's current position and stops right
    /// after the closing Stop, so a following call can pick up the next
    /// window.
    ///
    /// # Errors
    /// Any `DecodeError`; no partial session is returned.
    pub fn run(mut self, decoder: &mut Decoder<'_>) -> Result<Session, DecodeError> {
        while self.state != SessionState::Done {
            match decoder.decode_next()? {
                Some(event) => {
                    self.feed(event);
                }
                None => break,
            }
        }
        Ok(self.finish())
    }
}

//! Level-tagged windowing of the event stream.
//!
//! A session selects the events between a `Start` and a `Stop` at one target
//! level and feeds the allocator events inside that window to a fresh
//! allocation tracker.

pub mod controller;
pub mod windows;

// Re-export main types and functions
pub use controller::{
    Diagnostic, Session, SessionConfig, SessionController, SessionOutcome, SessionState, WatchHit,
};
pub use windows::{analyze, analyze_window, find_windows, WindowSpan};

//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that abort decoding of a trace stream
///
/// Both variants are fatal: the cursor position can no longer be trusted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown opcode {opcode} at offset {offset:#x}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error(
        "input truncated at offset {offset:#x}: {field} needs {needed} bytes, {available} available"
    )]
    InputTruncated {
        offset: usize,
        field: &'static str,
        needed: usize,
        available: usize,
    },
}

/// Errors that can occur while loading a symbol table
#[derive(Error, Debug)]
pub enum SymbolError {
    #[error("Failed to read symbol file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid ELF image: {0}")]
    InvalidElf(#[from] goblin::error::Error),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

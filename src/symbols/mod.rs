//! Function symbol tables of the traced firmware.
//!
//! Captured stack frames are raw target addresses; this module maps them
//! back to the function that contains them.

pub mod elf;
pub mod resolver;

// Re-export main types
pub use elf::load_function_ranges;
pub use resolver::{FunctionRange, SymbolResolver};

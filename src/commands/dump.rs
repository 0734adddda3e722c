//! Dump command implementation.
//!
//! Prints every decoded record of a trace, one per line, with resolved
//! stack frames underneath. Useful when a report looks wrong and the raw
//! stream needs checking.

use crate::decoder::Decoder;
use crate::report::format_event;
use crate::symbols::SymbolResolver;
use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

/// Arguments for the dump command
#[derive(Debug, Clone, Default)]
pub struct DumpArgs {
    pub trace_path: PathBuf,
    pub elf_path: Option<PathBuf>,

    /// Stop after this many records
    pub limit: Option<usize>,
}

/// Execute the dump command
///
/// # Returns
/// Number of records printed
///
/// # Errors
/// Fails on unreadable input or on the first malformed record. Records
/// before the bad one have already been printed by then.
pub fn execute_dump(args: DumpArgs) -> Result<usize> {
    let data = std::fs::read(&args.trace_path)
        .with_context(|| format!("Failed to read trace file {}", args.trace_path.display()))?;

    let resolver = match &args.elf_path {
        Some(path) => SymbolResolver::from_elf_file(path)
            .with_context(|| format!("Failed to load symbols from {}", path.display()))?,
        None => SymbolResolver::empty(),
    };

    let limit = args.limit.unwrap_or(usize::MAX);
    let mut decoder = Decoder::new(&data);
    let mut printed = 0;
    let mut allocator_records = 0;

    while printed < limit {
        let event = decoder
            .decode_next()
            .with_context(|| format!("Trace is malformed after {} records", printed))?;
        let Some(event) = event else {
            break;
        };
        if event.op.is_allocation() {
            allocator_records += 1;
        }
        println!("{}", format_event(&event, &resolver));
        printed += 1;
    }

    info!(
        "Dumped {} records, {} from the allocator ({} of {} bytes unread)",
        printed,
        allocator_records,
        decoder.remaining(),
        data.len()
    );
    Ok(printed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::TraceWriter;
    use std::io::Write;

    fn trace_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn test_dump_respects_limit() {
        let mut writer = TraceWriter::new();
        writer
            .start(2, "run")
            .malloc(2, 0x10, 4)
            .free(2, 0x10)
            .stop(2);
        let file = trace_file(writer.as_bytes());

        let args = DumpArgs {
            trace_path: file.path().to_path_buf(),
            limit: Some(2),
            ..Default::default()
        };
        assert_eq!(execute_dump(args).unwrap(), 2);
    }

    #[test]
    fn test_dump_fails_on_unknown_opcode() {
        let file = trace_file(&[0x09, 0x02]);
        let args = DumpArgs {
            trace_path: file.path().to_path_buf(),
            ..Default::default()
        };
        assert!(execute_dump(args).is_err());
    }
}

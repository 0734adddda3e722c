//! Function symbol extraction from ELF images.
//!
//! Only `STT_FUNC` symbols defined in the image are kept. Both the static
//! symbol table and the dynamic one are read; entries present in both are
//! reported once.

use super::resolver::FunctionRange;
use crate::utils::error::SymbolError;
use goblin::elf::{header, section_header, sym, Elf};
use goblin::elf::sym::Symtab;
use goblin::strtab::Strtab;
use log::debug;

const SHN_UNDEF: usize = section_header::SHN_UNDEF as usize;

/// Read the function ranges of an ELF image
///
/// # Returns
/// Ranges sorted by start address; empty if the image is stripped
///
/// # Errors
/// * `SymbolError::InvalidElf` - header or tables cannot be parsed
pub fn load_function_ranges(data: &[u8]) -> Result<Vec<FunctionRange>, SymbolError> {
    let elf = Elf::parse(data)?;

    // Thumb code marks function symbols with bit 0; return addresses don't carry it
    let clear_thumb_bit = elf.header.e_machine == header::EM_ARM;

    let mut ranges = Vec::new();
    collect_functions(&elf.syms, &elf.strtab, clear_thumb_bit, &mut ranges);
    collect_functions(&elf.dynsyms, &elf.dynstrtab, clear_thumb_bit, &mut ranges);

    ranges.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.name.cmp(&b.name)));
    ranges.dedup_by(|a, b| a.start == b.start && a.name == b.name);

    debug!("Extracted {} function symbols", ranges.len());
    Ok(ranges)
}

fn collect_functions(
    symbols: &Symtab<'_>,
    strtab: &Strtab<'_>,
    clear_thumb_bit: bool,
    out: &mut Vec<FunctionRange>,
) {
    for symbol in symbols.iter() {
        if symbol.st_type() != sym::STT_FUNC || symbol.st_shndx == SHN_UNDEF {
            continue;
        }

        let name = strtab.get_at(symbol.st_name).unwrap_or("??");
        let start = if clear_thumb_bit {
            symbol.st_value & !1
        } else {
            symbol.st_value
        };
        out.push(FunctionRange::new(name, start, symbol.st_size));
    }
}

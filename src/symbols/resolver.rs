//! Address to function lookup over a sorted range table.

use super::elf::load_function_ranges;
use crate::utils::config::SENTINEL_NAME;
use crate::utils::error::SymbolError;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Address range `[start, end)` covered by one function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRange {
    pub name: String,
    pub start: u64,
    pub end: u64,
}

impl FunctionRange {
    pub fn new(name: impl Into<String>, start: u64, size: u64) -> Self {
        Self {
            name: name.into(),
            start,
            end: start.saturating_add(size),
        }
    }

    /// The zero-sized fallback returned for addresses outside every function
    pub fn sentinel() -> Self {
        Self::new(SENTINEL_NAME, 0, 0)
    }

    pub fn size(&self) -> u64 {
        self.end - self.start
    }

    pub fn contains(&self, address: u64) -> bool {
        self.start <= address && address < self.end
    }
}

/// Function lookup table
///
/// Overlapping ranges are accepted as given; the first range in start order
/// that contains an address wins.
#[derive(Debug, Clone)]
pub struct SymbolResolver {
    ranges: Vec<FunctionRange>,

    /// `max_end[i]` is the highest `end` among `ranges[..=i]`
    max_end: Vec<u64>,
    sentinel: FunctionRange,
}

impl Default for SymbolResolver {
    fn default() -> Self {
        Self::empty()
    }
}

impl SymbolResolver {
    /// Build a resolver from function ranges in any order
    pub fn new(mut ranges: Vec<FunctionRange>) -> Self {
        // Zero-sized entries can never contain an address
        ranges.retain(|range| range.start < range.end);
        ranges.sort_by_key(|range| range.start);
        debug!("Symbol table holds {} function ranges", ranges.len());

        let max_end = ranges
            .iter()
            .scan(0u64, |reach, range: &FunctionRange| {
                *reach = range.end.max(*reach);
                Some(*reach)
            })
            .collect();

        Self {
            ranges,
            max_end,
            sentinel: FunctionRange::sentinel(),
        }
    }

    /// Resolver that maps every address to the sentinel
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Load function symbols from an ELF image in memory
    ///
    /// # Errors
    /// * `SymbolError::InvalidElf` - the bytes are not a parseable ELF image
    pub fn from_elf_bytes(data: &[u8]) -> Result<Self, SymbolError> {
        let ranges = load_function_ranges(data)?;
        if ranges.is_empty() {
            warn!("ELF image has no function symbols, frames will not be resolved");
        }
        Ok(Self::new(ranges))
    }

    /// Load function symbols from an ELF file on disk
    ///
    /// # Errors
    /// * `SymbolError::Io` - file cannot be read
    /// * `SymbolError::InvalidElf` - file is not a parseable ELF image
    pub fn from_elf_file(path: impl AsRef<Path>) -> Result<Self, SymbolError> {
        let path = path.as_ref();
        info!("Loading symbols from: {}", path.display());

        let data = std::fs::read(path)?;
        let resolver = Self::from_elf_bytes(&data)?;

        info!("Loaded {} function symbols", resolver.len());
        Ok(resolver)
    }

    /// Find the function containing `address`
    ///
    /// Never fails: unresolved addresses yield the sentinel range.
    pub fn resolve(&self, address: u64) -> &FunctionRange {
        // Ranges past `upper` start above the address
        let upper = self.ranges.partition_point(|range| range.start <= address);

        let mut found = None;
        for index in (0..upper).rev() {
            // Nothing at or before `index` reaches the address
            if self.max_end[index] <= address {
                break;
            }
            if self.ranges[index].contains(address) {
                found = Some(index);
            }
        }

        found.map_or(&self.sentinel, |index| &self.ranges[index])
    }

    /// Resolve `address` and return its distance from the function start
    pub fn offset_in(&self, address: u64) -> (&FunctionRange, u64) {
        let range = self.resolve(address);
        (range, address.saturating_sub(range.start))
    }

    pub fn sentinel(&self) -> &FunctionRange {
        &self.sentinel
    }

    /// Number of function ranges, not counting the sentinel
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionRange> {
        self.ranges.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SymbolResolver {
        SymbolResolver::new(vec![
            FunctionRange::new("bar", 0x2000, 0x20),
            FunctionRange::new("foo", 0x1000, 0x10),
        ])
    }

    #[test]
    fn test_resolve_inside_ranges() {
        let resolver = sample();
        assert_eq!(resolver.resolve(0x1005).name, "foo");
        assert_eq!(resolver.resolve(0x2010).name, "bar");
        assert_eq!(resolver.resolve(0x1000).name, "foo");
    }

    #[test]
    fn test_resolve_gaps_yield_sentinel() {
        let resolver = sample();
        assert_eq!(resolver.resolve(0x1900).name, "<0>");
        assert_eq!(resolver.resolve(0x10).name, "<0>");
        // End is exclusive
        assert_eq!(resolver.resolve(0x1010).name, "<0>");
        assert_eq!(resolver.resolve(u64::MAX).name, "<0>");
    }

    #[test]
    fn test_empty_resolver() {
        let resolver = SymbolResolver::empty();
        assert!(resolver.is_empty());
        assert_eq!(resolver.resolve(0), resolver.sentinel());
    }

    #[test]
    fn test_zero_sized_ranges_are_dropped() {
        let resolver = SymbolResolver::new(vec![
            FunctionRange::new("foo", 0x1000, 0x10),
            FunctionRange::new("label", 0x1008, 0),
        ]);
        assert_eq!(resolver.len(), 1);
        assert_eq!(resolver.resolve(0x100A).name, "foo");
    }

    #[test]
    fn test_first_range_wins_on_overlap() {
        let resolver = SymbolResolver::new(vec![
            FunctionRange::new("outer", 0x1000, 0x100),
            FunctionRange::new("inner", 0x1000, 0x10),
        ]);
        assert_eq!(resolver.resolve(0x1004).name, "outer");
    }

    #[test]
    fn test_enclosing_range_found_past_nested_ones() {
        let resolver = SymbolResolver::new(vec![
            FunctionRange::new("outer", 0x1000, 0x100),
            FunctionRange::new("inner", 0x1010, 0x10),
            FunctionRange::new("tail", 0x2000, 0x10),
        ]);
        assert_eq!(resolver.resolve(0x1015).name, "outer");
        assert_eq!(resolver.resolve(0x1080).name, "outer");
        assert_eq!(resolver.resolve(0x1100).name, "<0>");
    }

    #[test]
    fn test_offset_in() {
        let resolver = sample();
        let (range, offset) = resolver.offset_in(0x2014);
        assert_eq!(range.name, "bar");
        assert_eq!(offset, 0x14);

        let (range, offset) = resolver.offset_in(0x3000);
        assert_eq!(range.name, "<0>");
        assert_eq!(offset, 0x3000);
    }
}

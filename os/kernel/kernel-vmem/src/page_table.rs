//! # Page Tables
//!
//! - [`PageTableEntry`]: one 64-bit entry, same layout at every level.
//! - [`PageTableFlags`]: the flag bits of an entry.
//! - [`PageTable`]: a 4 KiB-aligned array of 512 entries.
//!
//! A table is the same type at every level; which level it is follows from
//! how it was reached during a walk.

mod entry;
mod flags;

pub use entry::{FrameError, PageTableEntry};
pub use flags::PageTableFlags;

use core::ops::{Index, IndexMut};
use kernel_memory_addresses::{ENTRY_COUNT, PageTableIndex};

/// One page table of any level.
///
/// The MMU reads this as a raw array; it must live in a 4 KiB-aligned,
/// 4 KiB-sized frame.
#[repr(C, align(4096))]
#[derive(Clone)]
pub struct PageTable {
    entries: [PageTableEntry; ENTRY_COUNT],
}

const _: () = assert!(size_of::<PageTable>() == 4096);

impl PageTable {
    /// A table with all entries unused.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: [PageTableEntry::new(); ENTRY_COUNT],
        }
    }

    /// Mark all 512 entries unused.
    #[inline]
    pub fn zero(&mut self) {
        for entry in &mut self.entries {
            entry.set_unused();
        }
    }

    #[inline]
    #[must_use]
    pub const fn entry(&self, index: PageTableIndex) -> &PageTableEntry {
        &self.entries[index.as_usize()]
    }

    #[inline]
    pub const fn entry_at(&mut self, index: PageTableIndex) -> &mut PageTableEntry {
        &mut self.entries[index.as_usize()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageTableEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PageTableEntry> {
        self.entries.iter_mut()
    }
}

impl Default for PageTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<PageTableIndex> for PageTable {
    type Output = PageTableEntry;

    #[inline]
    fn index(&self, index: PageTableIndex) -> &Self::Output {
        self.entry(index)
    }
}

impl IndexMut<PageTableIndex> for PageTable {
    #[inline]
    fn index_mut(&mut self, index: PageTableIndex) -> &mut Self::Output {
        self.entry_at(index)
    }
}

impl Index<usize> for PageTable {
    type Output = PageTableEntry;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.entries[index]
    }
}

impl IndexMut<usize> for PageTable {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.entries[index]
    }
}

impl core::fmt::Debug for PageTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(
                self.entries
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| !e.is_unused()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_memory_addresses::PhysicalAddress;

    #[test]
    fn layout() {
        assert_eq!(size_of::<PageTable>(), 4096);
        assert_eq!(align_of::<PageTable>(), 4096);
    }

    #[test]
    fn zero_clears_every_entry() {
        let mut table = PageTable::new();
        for (i, entry) in table.iter_mut().enumerate() {
            entry.set_address(PhysicalAddress::new((i as u64 + 1) << 12));
            entry.set_flags(PageTableFlags::PRESENT);
        }
        assert!(table.iter().all(|e| !e.is_unused()));

        table.zero();
        assert!(table.iter().all(PageTableEntry::is_unused));
    }

    #[test]
    fn index_forms_agree() {
        let mut table = PageTable::new();
        table[PageTableIndex::new(42)].set_flags(PageTableFlags::PRESENT);
        assert_eq!(table[42].flags(), PageTableFlags::PRESENT);
        assert!(!table.entry_at(PageTableIndex::new(42)).is_unused());
        assert!(table[41].is_unused());
    }
}

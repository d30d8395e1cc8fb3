use crate::mapper::{MappedPageTable, PageTableLocator};
use crate::page_table::PageTable;
use kernel_memory_addresses::{PageTableLevel, PhysicalPage, Size4K, VirtualAddress};

/// Locates tables through a linear mapping of all physical memory.
///
/// Physical address `p` is reachable at virtual address `offset + p`, e.g. a
/// higher-half direct map (HHDM) set up by the loader.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PhysicalOffset {
    offset: VirtualAddress,
}

impl PhysicalOffset {
    /// # Safety
    /// All physical memory must be mapped, readable and writable, at `offset`.
    #[inline]
    #[must_use]
    pub const unsafe fn new(offset: VirtualAddress) -> Self {
        Self { offset }
    }

    #[inline]
    #[must_use]
    pub const fn offset(&self) -> VirtualAddress {
        self.offset
    }
}

unsafe impl PageTableLocator for PhysicalOffset {
    #[inline]
    fn table_ptr(
        &self,
        frame: PhysicalPage<Size4K>,
        _addr: VirtualAddress,
        _level: PageTableLevel,
    ) -> *mut PageTable {
        (self.offset + frame.start_address().as_u64()).as_mut_ptr()
    }
}

/// Page table hierarchy reached through a [`PhysicalOffset`].
pub type OffsetPageTable<'a> = MappedPageTable<'a, PhysicalOffset>;

impl<'a> OffsetPageTable<'a> {
    /// Wrap `level_4_table`, reaching lower tables at `phys_offset + frame`.
    ///
    /// # Safety
    /// All physical memory must be mapped at `phys_offset`, and
    /// `level_4_table` must be a valid level 4 table that is not accessed
    /// through any other reference while this value lives.
    #[inline]
    pub const unsafe fn new(
        level_4_table: &'a mut PageTable,
        phys_offset: VirtualAddress,
    ) -> Self {
        unsafe { Self::with_locator(level_4_table, PhysicalOffset::new(phys_offset)) }
    }

    /// The virtual address physical address 0 is mapped at.
    #[inline]
    #[must_use]
    pub const fn phys_offset(&self) -> VirtualAddress {
        self.locator().offset()
    }
}

//! Single-step descent through the table hierarchy.

use crate::frame_alloc::FrameAllocator;
use crate::page_table::{FrameError, PageTable, PageTableEntry, PageTableFlags};
use kernel_memory_addresses::{PageTableLevel, PhysicalPage, Size4K, VirtualAddress};
use log::trace;

/// Turns the frame of a page table into a pointer the CPU can dereference now.
///
/// This is the only thing that differs between the mapping strategies: a
/// fixed physical-memory offset, or the recursive self-reference trick.
///
/// # Safety
/// For every frame reached while walking a valid hierarchy, the returned
/// pointer must refer to that frame's contents, be valid for reads and
/// writes, and not alias any other live reference.
pub unsafe trait PageTableLocator {
    /// Pointer to the level-`level` table reached on the walk for `addr`,
    /// stored in `frame`.
    fn table_ptr(
        &self,
        frame: PhysicalPage<Size4K>,
        addr: VirtualAddress,
        level: PageTableLevel,
    ) -> *mut PageTable;

    /// Flags every intermediate entry needs for the locator to reach the
    /// table below it, on top of what the caller asked for.
    #[inline]
    fn table_flags(&self) -> PageTableFlags {
        PageTableFlags::empty()
    }

    /// Called after a fresh table has been linked in and before it is zeroed.
    #[inline]
    fn table_created(&self, _table: *mut PageTable) {}
}

/// Why the walk could not descend below an entry.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum PageTableWalkError {
    #[error("entry is not present")]
    NotMapped,
    #[error("entry maps a huge page")]
    MappedToHugePage,
}

/// Why [`PageTableWalker::create_next_table`] could not provide a table.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum PageTableCreateError {
    #[error("entry maps a huge page")]
    MappedToHugePage,
    #[error("no frame available for a new page table")]
    FrameAllocationFailed,
}

impl From<FrameError> for PageTableWalkError {
    fn from(value: FrameError) -> Self {
        match value {
            FrameError::FrameNotPresent => Self::NotMapped,
            FrameError::HugeFrame => Self::MappedToHugePage,
        }
    }
}

/// Resolves entries to the tables they point at, through a [`PageTableLocator`].
#[derive(Debug, Clone)]
pub struct PageTableWalker<L> {
    locator: L,
}

impl<L: PageTableLocator> PageTableWalker<L> {
    /// # Safety
    /// See [`PageTableLocator`].
    #[inline]
    pub const unsafe fn new(locator: L) -> Self {
        Self { locator }
    }

    #[inline]
    pub const fn locator(&self) -> &L {
        &self.locator
    }

    /// The level-`level` table referenced by `entry`.
    ///
    /// # Errors
    /// - [`PageTableWalkError::NotMapped`] if `entry` is not present.
    /// - [`PageTableWalkError::MappedToHugePage`] if `entry` maps a huge page.
    pub fn next_table<'b>(
        &self,
        entry: &'b PageTableEntry,
        addr: VirtualAddress,
        level: PageTableLevel,
    ) -> Result<&'b PageTable, PageTableWalkError> {
        let frame = entry.frame()?;
        let ptr = self.locator.table_ptr(frame, addr, level);
        // SAFETY: the locator contract.
        Ok(unsafe { &*ptr })
    }

    /// Mutable variant of [`next_table`](Self::next_table).
    ///
    /// # Errors
    /// As [`next_table`](Self::next_table).
    pub fn next_table_mut<'b>(
        &self,
        entry: &'b mut PageTableEntry,
        addr: VirtualAddress,
        level: PageTableLevel,
    ) -> Result<&'b mut PageTable, PageTableWalkError> {
        let frame = entry.frame()?;
        let ptr = self.locator.table_ptr(frame, addr, level);
        // SAFETY: the locator contract.
        Ok(unsafe { &mut *ptr })
    }

    /// The level-`level` table referenced by `entry`, creating it if the entry
    /// is unused.
    ///
    /// A new table is allocated, linked with `insert_flags | PRESENT` plus the
    /// locator's [`table_flags`](PageTableLocator::table_flags) and zeroed. An
    /// existing entry gets the same flags OR-ed into its flags; nothing is
    /// ever cleared.
    ///
    /// # Errors
    /// - [`PageTableCreateError::MappedToHugePage`] if `entry` maps a huge page.
    ///   The entry is left untouched.
    /// - [`PageTableCreateError::FrameAllocationFailed`] if `allocator` is empty.
    pub fn create_next_table<'b, A>(
        &self,
        entry: &'b mut PageTableEntry,
        insert_flags: PageTableFlags,
        addr: VirtualAddress,
        level: PageTableLevel,
        allocator: &mut A,
    ) -> Result<&'b mut PageTable, PageTableCreateError>
    where
        A: FrameAllocator<Size4K> + ?Sized,
    {
        let insert_flags = insert_flags | PageTableFlags::PRESENT | self.locator.table_flags();

        if entry.is_unused() {
            let frame = allocator
                .allocate_frame()
                .ok_or(PageTableCreateError::FrameAllocationFailed)?;
            entry.set(frame, insert_flags);

            let ptr = self.locator.table_ptr(frame, addr, level);
            self.locator.table_created(ptr);
            trace!("created {level} table in {frame:?} for {addr:?}");

            // SAFETY: the locator contract; the frame is fresh from the allocator.
            let table = unsafe { &mut *ptr };
            table.zero();
            return Ok(table);
        }

        let flags = entry.flags();
        if flags.contains(PageTableFlags::HUGE_PAGE) {
            return Err(PageTableCreateError::MappedToHugePage);
        }
        if !flags.contains(insert_flags) {
            entry.set_flags(flags | insert_flags);
        }

        self.next_table_mut(entry, addr, level)
            .map_err(|_| PageTableCreateError::MappedToHugePage)
    }
}

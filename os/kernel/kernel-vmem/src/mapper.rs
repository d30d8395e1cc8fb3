//! # Mapping Virtual Pages to Physical Frames
//!
//! [`Mapper`] changes a page table hierarchy, [`Translate`] reads it. Both are
//! implemented once by [`MappedPageTable`], generic over the page size and
//! over a [`PageTableLocator`] that decides how table frames are reached:
//!
//! | Strategy | Locator | Requirement |
//! |----------|---------|-------------|
//! | [`OffsetPageTable`] | [`PhysicalOffset`] | all physical memory mapped at a fixed virtual offset |
//! | [`RecursivePageTable`] | [`RecursiveIndex`] | one level 4 entry points back at the level 4 table |
//!
//! ### Walk depth
//!
//! | Page size | Tables visited | Leaf entry |
//! |-----------|----------------|------------|
//! | 4 KiB | 4 → 3 → 2 → 1 | PTE |
//! | 2 MiB | 4 → 3 → 2 | PDE, `HUGE_PAGE` set |
//! | 1 GiB | 4 → 3 | PDPTE, `HUGE_PAGE` set |
//!
//! ### TLB
//!
//! Every structural change returns a [`MapperFlush`] or [`MapperFlushAll`]
//! token. Nothing is flushed automatically.

mod error;
mod flush;
mod mapped_page_table;
mod offset_page_table;
mod recursive_page_table;
mod walker;

pub use error::{FlagUpdateError, InvalidPageTable, MapToError, TranslateError, UnmapError};
pub use flush::{MapperFlush, MapperFlushAll};
pub use mapped_page_table::MappedPageTable;
pub use offset_page_table::{OffsetPageTable, PhysicalOffset};
pub use recursive_page_table::{RecursiveIndex, RecursivePageTable, recursive_table_address};
pub use walker::{PageTableCreateError, PageTableLocator, PageTableWalkError, PageTableWalker};

use crate::frame_alloc::FrameAllocator;
use crate::page_table::PageTableFlags;
use kernel_memory_addresses::{
    PageSize, PhysicalAddress, PhysicalPage, Size1G, Size2M, Size4K, VirtualAddress, VirtualPage,
};

/// Creates, removes and changes mappings of pages of size `S`.
pub trait Mapper<S: PageSize> {
    /// Map `page` to `frame` with `flags`, creating missing intermediate
    /// tables from `allocator`.
    ///
    /// Intermediate entries receive [`PageTableFlags::parent_table_flags`] of
    /// `flags`, plus whatever the locator needs to reach the tables (`WRITABLE`
    /// for [`RecursiveIndex`]). For huge sizes `HUGE_PAGE` is forced on in the leaf.
    ///
    /// # Safety
    /// The new mapping may alias other memory or break invariants the rest of
    /// the kernel relies on. The caller is responsible for the consequences.
    ///
    /// # Errors
    /// See [`MapToError`]. Intermediate tables created before the error stay
    /// linked in.
    #[inline]
    unsafe fn map_to<A>(
        &mut self,
        page: VirtualPage<S>,
        frame: PhysicalPage<S>,
        flags: PageTableFlags,
        allocator: &mut A,
    ) -> Result<MapperFlush<S>, MapToError<S>>
    where
        A: FrameAllocator<Size4K> + ?Sized,
    {
        let parent_table_flags = flags.parent_table_flags();
        unsafe { self.map_to_with_table_flags(page, frame, flags, parent_table_flags, allocator) }
    }

    /// Like [`map_to`](Self::map_to), with explicit flags for intermediate
    /// entries. They are OR-ed into existing entries and never remove bits.
    ///
    /// # Safety
    /// As [`map_to`](Self::map_to).
    ///
    /// # Errors
    /// See [`MapToError`].
    unsafe fn map_to_with_table_flags<A>(
        &mut self,
        page: VirtualPage<S>,
        frame: PhysicalPage<S>,
        flags: PageTableFlags,
        parent_table_flags: PageTableFlags,
        allocator: &mut A,
    ) -> Result<MapperFlush<S>, MapToError<S>>
    where
        A: FrameAllocator<Size4K> + ?Sized;

    /// Remove the mapping of `page` and return the frame it pointed to.
    ///
    /// Intermediate tables are never freed, and the frame is not given back
    /// to any allocator.
    ///
    /// # Errors
    /// See [`UnmapError`].
    fn unmap(&mut self, page: VirtualPage<S>) -> Result<(PhysicalPage<S>, MapperFlush<S>), UnmapError>;

    /// Replace the flags of the leaf entry mapping `page`.
    ///
    /// # Safety
    /// Changing permissions can break memory safety elsewhere.
    ///
    /// # Errors
    /// See [`FlagUpdateError`].
    unsafe fn update_flags(
        &mut self,
        page: VirtualPage<S>,
        flags: PageTableFlags,
    ) -> Result<MapperFlush<S>, FlagUpdateError>;

    /// Replace the flags of the level 4 entry above `page`.
    ///
    /// # Safety
    /// The entry governs up to 512 GiB of mappings.
    ///
    /// # Errors
    /// [`FlagUpdateError::PageNotMapped`] if the entry is unused.
    unsafe fn set_flags_p4_entry(
        &mut self,
        page: VirtualPage<S>,
        flags: PageTableFlags,
    ) -> Result<MapperFlushAll, FlagUpdateError>;

    /// Replace the flags of the level 3 entry above `page`.
    ///
    /// # Safety
    /// The entry governs up to 1 GiB of mappings.
    ///
    /// # Errors
    /// - [`FlagUpdateError::PageNotMapped`] if the entry or its parent is unused.
    /// - [`FlagUpdateError::ParentEntryHugePage`] for 1 GiB pages, whose leaf
    ///   is the level 3 entry.
    unsafe fn set_flags_p3_entry(
        &mut self,
        page: VirtualPage<S>,
        flags: PageTableFlags,
    ) -> Result<MapperFlushAll, FlagUpdateError>;

    /// Replace the flags of the level 2 entry above `page`.
    ///
    /// # Safety
    /// The entry governs up to 2 MiB of mappings.
    ///
    /// # Errors
    /// - [`FlagUpdateError::PageNotMapped`] if the entry or an ancestor is unused.
    /// - [`FlagUpdateError::ParentEntryHugePage`] for 2 MiB and 1 GiB pages, or
    ///   when a 1 GiB mapping covers `page`.
    unsafe fn set_flags_p2_entry(
        &mut self,
        page: VirtualPage<S>,
        flags: PageTableFlags,
    ) -> Result<MapperFlushAll, FlagUpdateError>;

    /// The frame `page` is mapped to with a mapping of exactly size `S`.
    ///
    /// # Errors
    /// See [`TranslateError`].
    fn translate_page(&self, page: VirtualPage<S>) -> Result<PhysicalPage<S>, TranslateError>;

    /// Map `frame` at the virtual address equal to its physical address.
    ///
    /// # Safety
    /// As [`map_to`](Self::map_to).
    ///
    /// # Errors
    /// See [`MapToError`].
    ///
    /// # Panics
    /// If the frame's address is not a canonical virtual address.
    #[inline]
    unsafe fn identity_map<A>(
        &mut self,
        frame: PhysicalPage<S>,
        flags: PageTableFlags,
        allocator: &mut A,
    ) -> Result<MapperFlush<S>, MapToError<S>>
    where
        A: FrameAllocator<Size4K> + ?Sized,
    {
        let va = match VirtualAddress::try_new(frame.start_address().as_u64()) {
            Ok(va) => va,
            Err(e) => panic!("cannot identity map {frame:?}: {e}"),
        };
        let page = VirtualPage::containing_address(va);
        unsafe { self.map_to(page, frame, flags, allocator) }
    }
}

/// Frame of whichever size ended a translation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MappedFrame {
    /// Mapped by a level 1 entry.
    Size4K(PhysicalPage<Size4K>),
    /// Mapped by a huge level 2 entry.
    Size2M(PhysicalPage<Size2M>),
    /// Mapped by a huge level 3 entry.
    Size1G(PhysicalPage<Size1G>),
}

impl MappedFrame {
    /// First physical address of the frame.
    #[inline]
    #[must_use]
    pub const fn start_address(&self) -> PhysicalAddress {
        match self {
            Self::Size4K(frame) => frame.start_address(),
            Self::Size2M(frame) => frame.start_address(),
            Self::Size1G(frame) => frame.start_address(),
        }
    }

    /// Frame size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u64 {
        match self {
            Self::Size4K(_) => Size4K::SIZE,
            Self::Size2M(_) => Size2M::SIZE,
            Self::Size1G(_) => Size1G::SIZE,
        }
    }
}

/// A successful translation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TranslateResult {
    /// Frame of the leaf mapping, tagged by its size.
    pub frame: MappedFrame,
    /// Offset of the address inside the frame.
    pub offset: u64,
    /// Flags of the leaf entry.
    pub flags: PageTableFlags,
}

impl TranslateResult {
    /// The physical address the translated address resolves to.
    #[inline]
    #[must_use]
    pub const fn address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.frame.start_address().as_u64() + self.offset)
    }
}

/// Reads translations without knowing the page size up front.
pub trait Translate {
    /// Walk the hierarchy for `addr`, stopping at the first leaf.
    ///
    /// # Errors
    /// See [`TranslateError`].
    ///
    /// # Panics
    /// If a level 4 or level 1 entry on the walk has `HUGE_PAGE` set. Neither
    /// can be produced through [`Mapper`], so the tables are corrupt.
    fn translate(&self, addr: VirtualAddress) -> Result<TranslateResult, TranslateError>;

    /// The physical address `addr` maps to, or `None`.
    #[inline]
    fn translate_addr(&self, addr: VirtualAddress) -> Option<PhysicalAddress> {
        self.translate(addr).ok().map(|r| r.address())
    }
}

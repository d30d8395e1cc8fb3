use kernel_memory_addresses::{PageSize, PhysicalAddress, PhysicalPage};

/// Failure of [`Mapper::map_to`](super::Mapper::map_to) and friends.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum MapToError<S: PageSize> {
    /// The allocator had no frame for a missing intermediate table.
    #[error("no frame available for an intermediate page table")]
    FrameAllocationFailed,
    /// An entry above the leaf level maps a huge page, so no table lies below it.
    #[error("an ancestor entry maps a huge page")]
    ParentEntryHugePage,
    /// The leaf entry is in use; carries the frame it currently points to.
    #[error("page is already mapped to {0:?}")]
    PageAlreadyMapped(PhysicalPage<S>),
}

/// Failure of [`Mapper::unmap`](super::Mapper::unmap).
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum UnmapError {
    /// An ancestor or the leaf entry is not present.
    #[error("page is not mapped")]
    PageNotMapped,
    /// An ancestor maps a huge page, or the leaf is not a mapping of the requested size.
    #[error("page is covered by an entry of a different page size")]
    ParentEntryHugePage,
    /// The leaf entry's address is not aligned to the requested page size.
    #[error("leaf entry holds misaligned frame address {0}")]
    InvalidFrameAddress(PhysicalAddress),
}

/// Failure of [`Mapper::update_flags`](super::Mapper::update_flags) and the
/// `set_flags_p*_entry` family.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FlagUpdateError {
    /// The entry to update, or one of its ancestors, is not present.
    #[error("page is not mapped")]
    PageNotMapped,
    /// An ancestor maps a huge page, the leaf is not a mapping of the requested
    /// size, or the requested parent level does not exist above that size.
    #[error("page is covered by an entry of a different page size")]
    ParentEntryHugePage,
}

/// Failure of [`Translate::translate`](super::Translate::translate) and
/// [`Mapper::translate_page`](super::Mapper::translate_page).
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum TranslateError {
    /// No present mapping of the requested kind covers the address.
    #[error("address is not mapped")]
    NotMapped,
    /// The leaf entry's address is not aligned to its page size.
    #[error("leaf entry holds misaligned frame address {0}")]
    InvalidFrameAddress(PhysicalAddress),
}

/// Failure of [`RecursivePageTable::init`](super::RecursivePageTable::init).
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum InvalidPageTable {
    /// The table's own address does not use the same index at all four levels,
    /// or that entry does not point at a table frame.
    #[error("level 4 table is not recursively mapped")]
    NotRecursive,
    /// The recursive entry points somewhere other than the active level 4 table.
    #[error("level 4 table is not the active one")]
    NotActive,
}

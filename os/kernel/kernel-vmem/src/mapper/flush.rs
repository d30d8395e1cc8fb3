use kernel_memory_addresses::{PageSize, VirtualPage};
use kernel_registers::tlb;

/// A single page whose TLB entry is stale after a mapping change.
///
/// Call [`flush`](Self::flush) before relying on the new mapping, or
/// [`ignore`](Self::ignore) when the table is not active (or a full flush
/// follows anyway).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[must_use = "page table changes must be flushed or ignored"]
pub struct MapperFlush<S: PageSize>(VirtualPage<S>);

impl<S: PageSize> MapperFlush<S> {
    /// Token for `page`; for use by [`Mapper`](super::Mapper) implementations.
    #[inline]
    pub const fn new(page: VirtualPage<S>) -> Self {
        Self(page)
    }

    /// Invalidate the TLB entry for the page on this CPU.
    #[inline]
    pub fn flush(self) {
        // SAFETY: `invlpg` has no memory effects; it only drops a cached translation.
        unsafe { tlb::flush(self.0.start_address()) }
    }

    /// Drop the token without flushing.
    #[inline]
    pub fn ignore(self) {}

    /// The page this token refers to.
    #[inline]
    #[must_use]
    pub const fn page(&self) -> VirtualPage<S> {
        self.0
    }
}

/// The whole TLB is stale after a change to a parent entry.
#[derive(Debug, Default)]
#[must_use = "page table changes must be flushed or ignored"]
pub struct MapperFlushAll(());

impl MapperFlushAll {
    /// Token for a change that may affect many pages.
    #[inline]
    pub const fn new() -> Self {
        Self(())
    }

    /// Invalidate all non-global TLB entries on this CPU.
    #[inline]
    pub fn flush_all(self) {
        // SAFETY: reloading CR3 with its own value only drops cached translations.
        unsafe { tlb::flush_all() }
    }

    /// Drop the token without flushing.
    #[inline]
    pub fn ignore(self) {}
}

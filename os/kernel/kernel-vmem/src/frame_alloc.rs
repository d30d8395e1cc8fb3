//! Physical frame allocation interface.
//!
//! The mapper asks for frames only when it has to create an intermediate
//! table, and never gives frames back: [`Mapper::unmap`](crate::mapper::Mapper::unmap)
//! returns the freed frame and the caller decides what to do with it.

use kernel_memory_addresses::{PageSize, PhysicalPage, Size4K};

/// Source of unused physical frames of size `S`.
///
/// The implementation decides where frames come from (bootloader pool,
/// bitmap, etc.). Returns `None` on out-of-memory.
///
/// # Safety
/// Every returned frame must be unused: not referenced by any page table and
/// not handed out before (unless it was deallocated in between).
pub unsafe trait FrameAllocator<S: PageSize = Size4K> {
    /// Take one unused frame out of the pool.
    fn allocate_frame(&mut self) -> Option<PhysicalPage<S>>;
}

/// Sink for frames that are no longer used.
pub trait FrameDeallocator<S: PageSize = Size4K> {
    /// Return `frame` to the pool.
    ///
    /// # Safety
    /// `frame` must have come from the matching allocator and must no longer
    /// be mapped or referenced by any page table.
    unsafe fn deallocate_frame(&mut self, frame: PhysicalPage<S>);
}

unsafe impl<S: PageSize, A> FrameAllocator<S> for &mut A
where
    A: FrameAllocator<S> + ?Sized,
{
    #[inline]
    fn allocate_frame(&mut self) -> Option<PhysicalPage<S>> {
        (**self).allocate_frame()
    }
}

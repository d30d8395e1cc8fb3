use crate::{AddressNotAligned, MemoryAddress, PageSize};
use core::fmt;
use core::marker::PhantomData;

/// A page base address (lower `S::SHIFT` bits are zero).
///
/// Both [`PhysicalPage`](crate::PhysicalPage) and [`VirtualPage`](crate::VirtualPage)
/// are thin wrappers over this type; they only add the rules for which
/// addresses are representable in their address space.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MemoryPage<S: PageSize> {
    value: u64,
    _phantom: PhantomData<S>,
}

impl<S> fmt::Display for MemoryPage<S>
where
    S: PageSize,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}/{}", self.value, S::as_str())
    }
}

impl<S: PageSize> MemoryPage<S> {
    /// Page starting exactly at `addr`.
    ///
    /// # Errors
    /// [`AddressNotAligned`] if `addr` is not a multiple of `S::SIZE`.
    #[inline]
    pub const fn from_start_address(addr: MemoryAddress) -> Result<Self, AddressNotAligned> {
        if !addr.is_aligned::<S>() {
            return Err(AddressNotAligned::new(addr.as_u64(), S::SIZE));
        }
        Ok(Self {
            value: addr.as_u64(),
            _phantom: PhantomData,
        })
    }

    /// Page starting at `addr` without checking alignment.
    ///
    /// # Safety
    /// `addr` must be aligned to `S::SIZE`.
    #[inline]
    #[must_use]
    pub const unsafe fn from_start_address_unchecked(addr: MemoryAddress) -> Self {
        debug_assert!(addr.is_aligned::<S>(), "unaligned page address");
        Self {
            value: addr.as_u64(),
            _phantom: PhantomData,
        }
    }

    /// Page that contains `addr` (aligns down).
    #[inline]
    #[must_use]
    pub const fn containing_address(addr: MemoryAddress) -> Self {
        Self {
            value: addr.align_down::<S>().as_u64(),
            _phantom: PhantomData,
        }
    }

    /// Return the base as `MemoryAddress`.
    #[inline]
    #[must_use]
    pub const fn start_address(self) -> MemoryAddress {
        MemoryAddress::new(self.value)
    }

    /// Page size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(self) -> u64 {
        S::SIZE
    }

    /// Raw start address of the following page, `None` on `u64` overflow.
    #[inline]
    #[must_use]
    pub(crate) const fn next_start(self) -> Option<MemoryAddress> {
        MemoryAddress::new(self.value).checked_add(S::SIZE)
    }

    /// Raw start address of the preceding page, `None` below zero.
    #[inline]
    #[must_use]
    pub(crate) const fn previous_start(self) -> Option<MemoryAddress> {
        MemoryAddress::new(self.value).checked_sub(S::SIZE)
    }
}

impl<S: PageSize> fmt::Debug for MemoryPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryPage<{}>(0x{:016X})", S::as_str(), self.value)
    }
}

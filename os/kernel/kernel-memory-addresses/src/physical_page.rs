use crate::page_range::PageStep;
use crate::sealed::Sealed;
use crate::{
    AddressNotAligned, MemoryPage, PageSize, PhysicalAddress, PhysicalPageRange,
    PhysicalPageRangeInclusive,
};
use core::fmt;

/// Physical memory frame of size `S`.
///
/// A `PhysicalPage<S>` represents the **page-aligned base** of a physical frame
/// (`S::SIZE` bytes). It is a thin wrapper over [`MemoryPage<S>`] with
/// physical-address intent.
///
/// ### Invariants
/// - The low `S::SHIFT` bits of the base are always zero.
/// - The base is a valid [`PhysicalAddress`] (below 2⁵²) when built through
///   [`PhysicalPage::containing_address`] of a validated address or through
///   range iteration.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let pa = PhysicalAddress::new(0x0000_0008_1234_5678);
/// let frame = pa.page::<Size2M>();
/// assert_eq!(frame.start_address().as_u64(), 0x0000_0008_1220_0000);
/// assert!(PhysicalPage::<Size4K>::from_start_address(pa).is_err());
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage<S: PageSize>(pub(crate) MemoryPage<S>);

impl<S: PageSize> PhysicalPage<S> {
    /// Frame starting exactly at `addr`.
    ///
    /// # Errors
    /// [`AddressNotAligned`] if `addr` is not a multiple of `S::SIZE`.
    #[inline]
    pub const fn from_start_address(addr: PhysicalAddress) -> Result<Self, AddressNotAligned> {
        match MemoryPage::from_start_address(addr.0) {
            Ok(page) => Ok(Self(page)),
            Err(e) => Err(e),
        }
    }

    /// Frame starting at `addr` without checking alignment.
    ///
    /// # Safety
    /// `addr` must be aligned to `S::SIZE`.
    #[inline]
    #[must_use]
    pub const unsafe fn from_start_address_unchecked(addr: PhysicalAddress) -> Self {
        Self(unsafe { MemoryPage::from_start_address_unchecked(addr.0) })
    }

    /// Frame containing `addr` (aligns down).
    #[inline]
    #[must_use]
    pub const fn containing_address(addr: PhysicalAddress) -> Self {
        Self(MemoryPage::containing_address(addr.0))
    }

    #[inline]
    #[must_use]
    pub const fn start_address(self) -> PhysicalAddress {
        PhysicalAddress(self.0.start_address())
    }

    #[inline]
    #[must_use]
    pub const fn size(self) -> u64 {
        S::SIZE
    }

    /// Frames from `start` up to but excluding `end`.
    #[inline]
    #[must_use]
    pub const fn range(start: Self, end: Self) -> PhysicalPageRange<S> {
        PhysicalPageRange::new(start, end)
    }

    /// Frames from `start` up to and including `end`.
    #[inline]
    #[must_use]
    pub const fn range_inclusive(start: Self, end: Self) -> PhysicalPageRangeInclusive<S> {
        PhysicalPageRangeInclusive::new(start, end)
    }
}

impl<S: PageSize> Sealed for PhysicalPage<S> {}

impl<S: PageSize> PageStep for PhysicalPage<S> {
    fn forward(self) -> Option<Self> {
        let next = self.0.next_start()?;
        let addr = PhysicalAddress::try_new(next.as_u64()).ok()?;
        Self::from_start_address(addr).ok()
    }

    fn backward(self) -> Option<Self> {
        let prev = self.0.previous_start()?;
        Self::from_start_address(PhysicalAddress(prev)).ok()
    }
}

impl<S> fmt::Display for PhysicalPage<S>
where
    S: PageSize,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<S: PageSize> fmt::Debug for PhysicalPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PhysicalPage<{}>(0x{:016X})",
            S::as_str(),
            self.start_address().as_u64()
        )
    }
}

impl<S: PageSize> TryFrom<PhysicalAddress> for PhysicalPage<S> {
    type Error = AddressNotAligned;

    #[inline]
    fn try_from(value: PhysicalAddress) -> Result<Self, Self::Error> {
        Self::from_start_address(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Size1G, Size2M, Size4K};

    #[test]
    fn containing_address_floors() {
        let pa = PhysicalAddress::new(0x1234_5678);
        assert_eq!(pa.page::<Size4K>().start_address().as_u64(), 0x1234_5000);
        assert_eq!(pa.page::<Size2M>().start_address().as_u64(), 0x1220_0000);
        assert_eq!(pa.page::<Size1G>().start_address().as_u64(), 0);
    }

    #[test]
    fn unaligned_start_is_rejected() {
        let err = PhysicalPage::<Size2M>::from_start_address(PhysicalAddress::new(0x1000))
            .expect_err("not 2 MiB aligned");
        assert_eq!(err, AddressNotAligned::new(0x1000, Size2M::SIZE));
    }

    #[test]
    fn forward_stops_at_physical_limit() {
        let last = PhysicalPage::<Size4K>::containing_address(PhysicalAddress::new(
            0x000F_FFFF_FFFF_F000,
        ));
        assert_eq!(last.forward(), None);
        assert_eq!(
            last.backward().map(PhysicalPage::start_address),
            Some(PhysicalAddress::new(0x000F_FFFF_FFFF_E000))
        );
    }
}

use crate::page_range::PageStep;
use crate::sealed::Sealed;
use crate::{
    AddressNotAligned, MemoryPage, PageSize, PageTableIndex, PageTableLevel, Size1G, Size2M,
    Size4K, VirtualAddress, VirtualPageRange, VirtualPageRangeInclusive,
};
use core::fmt;

/// Virtual memory page of size `S`.
///
/// A `VirtualPage<S>` represents the **page-aligned base** of a virtual page
/// (`S::SIZE` bytes). It is a thin wrapper over [`MemoryPage<S>`] with
/// virtual-address intent.
///
/// ### Stepping
/// Ranges of virtual pages step over the non-canonical hole: the successor of
/// the last lower-half page is the first higher-half page.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let va = VirtualAddress::new(0xFFFF_FFFF_8000_1234);
/// let page = va.page::<Size4K>();
/// assert_eq!(page.start_address().as_u64(), 0xFFFF_FFFF_8000_1000);
/// assert_eq!(page.p4_index(), PageTableIndex::new(511));
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualPage<S: PageSize>(pub(crate) MemoryPage<S>);

impl<S: PageSize> VirtualPage<S> {
    /// Page starting exactly at `addr`.
    ///
    /// # Errors
    /// [`AddressNotAligned`] if `addr` is not a multiple of `S::SIZE`.
    #[inline]
    pub const fn from_start_address(addr: VirtualAddress) -> Result<Self, AddressNotAligned> {
        match MemoryPage::from_start_address(addr.0) {
            Ok(page) => Ok(Self(page)),
            Err(e) => Err(e),
        }
    }

    /// Page starting at `addr` without checking alignment.
    ///
    /// # Safety
    /// `addr` must be aligned to `S::SIZE`.
    #[inline]
    #[must_use]
    pub const unsafe fn from_start_address_unchecked(addr: VirtualAddress) -> Self {
        Self(unsafe { MemoryPage::from_start_address_unchecked(addr.0) })
    }

    /// Page that contains `addr` (aligns down to page boundary).
    #[inline]
    #[must_use]
    pub const fn containing_address(addr: VirtualAddress) -> Self {
        Self(MemoryPage::containing_address(addr.0))
    }

    #[inline]
    #[must_use]
    pub const fn start_address(self) -> VirtualAddress {
        VirtualAddress(self.0.start_address())
    }

    #[inline]
    #[must_use]
    pub const fn size(self) -> u64 {
        S::SIZE
    }

    #[inline]
    #[must_use]
    pub const fn p4_index(self) -> PageTableIndex {
        self.start_address().p4_index()
    }

    #[inline]
    #[must_use]
    pub const fn p3_index(self) -> PageTableIndex {
        self.start_address().p3_index()
    }

    /// Index into the table of `level` for this page.
    ///
    /// Only meaningful for levels above the leaf of `S`; lower indices are zero.
    #[inline]
    #[must_use]
    pub const fn page_table_index(self, level: PageTableLevel) -> PageTableIndex {
        self.start_address().page_table_index(level)
    }

    /// Pages from `start` up to but excluding `end`.
    #[inline]
    #[must_use]
    pub const fn range(start: Self, end: Self) -> VirtualPageRange<S> {
        VirtualPageRange::new(start, end)
    }

    /// Pages from `start` up to and including `end`.
    #[inline]
    #[must_use]
    pub const fn range_inclusive(start: Self, end: Self) -> VirtualPageRangeInclusive<S> {
        VirtualPageRangeInclusive::new(start, end)
    }
}

impl VirtualPage<Size4K> {
    /// 4 KiB page addressed by its four table indices.
    #[inline]
    #[must_use]
    pub const fn from_page_table_indices(
        p4: PageTableIndex,
        p3: PageTableIndex,
        p2: PageTableIndex,
        p1: PageTableIndex,
    ) -> Self {
        let addr = (p4.as_u64() << 39)
            | (p3.as_u64() << 30)
            | (p2.as_u64() << 21)
            | (p1.as_u64() << 12);
        Self(MemoryPage::containing_address(
            VirtualAddress::new_truncate(addr).0,
        ))
    }

    #[inline]
    #[must_use]
    pub const fn p2_index(self) -> PageTableIndex {
        self.start_address().p2_index()
    }

    #[inline]
    #[must_use]
    pub const fn p1_index(self) -> PageTableIndex {
        self.start_address().p1_index()
    }
}

impl VirtualPage<Size2M> {
    /// 2 MiB page addressed by its P4, P3 and P2 indices.
    #[inline]
    #[must_use]
    pub const fn from_page_table_indices_2m(
        p4: PageTableIndex,
        p3: PageTableIndex,
        p2: PageTableIndex,
    ) -> Self {
        let addr = (p4.as_u64() << 39) | (p3.as_u64() << 30) | (p2.as_u64() << 21);
        Self(MemoryPage::containing_address(
            VirtualAddress::new_truncate(addr).0,
        ))
    }

    #[inline]
    #[must_use]
    pub const fn p2_index(self) -> PageTableIndex {
        self.start_address().p2_index()
    }
}

impl VirtualPage<Size1G> {
    /// 1 GiB page addressed by its P4 and P3 indices.
    #[inline]
    #[must_use]
    pub const fn from_page_table_indices_1g(p4: PageTableIndex, p3: PageTableIndex) -> Self {
        let addr = (p4.as_u64() << 39) | (p3.as_u64() << 30);
        Self(MemoryPage::containing_address(
            VirtualAddress::new_truncate(addr).0,
        ))
    }
}

impl<S: PageSize> Sealed for VirtualPage<S> {}

impl<S: PageSize> PageStep for VirtualPage<S> {
    fn forward(self) -> Option<Self> {
        let next = self.0.next_start()?;
        // 0x0000_8000_0000_0000 sign-extends to the first higher-half page
        Self::from_start_address(VirtualAddress::new_truncate(next.as_u64())).ok()
    }

    fn backward(self) -> Option<Self> {
        let prev = self.0.previous_start()?;
        Self::from_start_address(VirtualAddress::new_truncate(prev.as_u64())).ok()
    }
}

impl<S> fmt::Display for VirtualPage<S>
where
    S: PageSize,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<S: PageSize> fmt::Debug for VirtualPage<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VirtualPage<{}>(0x{:016X})",
            S::as_str(),
            self.start_address().as_u64()
        )
    }
}

impl<S: PageSize> TryFrom<VirtualAddress> for VirtualPage<S> {
    type Error = AddressNotAligned;

    #[inline]
    fn try_from(va: VirtualAddress) -> Result<Self, Self::Error> {
        Self::from_start_address(va)
    }
}

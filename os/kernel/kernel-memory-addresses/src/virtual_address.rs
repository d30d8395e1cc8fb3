use crate::{
    MemoryAddress, PageSize, PageTableIndex, PageTableLevel, VirtualAddressNotValid, VirtualPage,
};
use core::fmt;
use core::ops::{Add, AddAssign};
use core::ptr::NonNull;

/// Virtual memory address.
///
/// A thin wrapper around [`MemoryAddress`] that denotes **virtual** addresses.
/// [`VirtualAddress::new`] does not validate canonicality; use
/// [`VirtualAddress::try_new`] or [`VirtualAddress::new_truncate`] when the
/// value comes from arithmetic.
///
/// ### Page-table indices
///
/// ```text
/// | 63‒48 | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
/// | sign  |  P4   |  P3   |  P2   |  P1   | Offset |
/// ```
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let va = VirtualAddress::new(0xFFFF_FFFF_8000_1234);
/// assert_eq!(va.p4_index(), PageTableIndex::new(511));
/// assert_eq!(va.page_offset(), 0x234);
/// assert_eq!(va.page::<Size4K>().start_address().as_u64(), 0xFFFF_FFFF_8000_1000);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(pub(crate) MemoryAddress);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub const fn from_nonnull<T>(ptr: NonNull<T>) -> Self {
        Self::from_ptr(ptr.as_ptr())
    }

    #[inline]
    #[must_use]
    pub const fn from_ptr<T>(ptr: *const T) -> Self {
        Self(MemoryAddress::from_ptr(ptr))
    }

    /// Wrap a raw value without validation.
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(MemoryAddress::new(v))
    }

    /// Wrap a raw value, rejecting non-canonical addresses.
    ///
    /// # Errors
    /// [`VirtualAddressNotValid`] unless bits 48..=63 are copies of bit 47.
    #[inline]
    pub const fn try_new(v: u64) -> Result<Self, VirtualAddressNotValid> {
        match v >> 47 {
            0 | 0x1_FFFF => Ok(Self::new(v)),
            _ => Err(VirtualAddressNotValid(v)),
        }
    }

    /// Wrap a raw value, sign-extending bit 47 into bits 48..=63.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub const fn new_truncate(v: u64) -> Self {
        Self::new(((v << 16) as i64 >> 16) as u64)
    }

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0.as_u64()
    }

    #[inline]
    #[must_use]
    pub const fn as_ptr<T>(self) -> *const T {
        self.as_u64() as *const T
    }

    #[inline]
    #[must_use]
    pub const fn as_mut_ptr<T>(self) -> *mut T {
        self.as_u64() as *mut T
    }

    /// The page of size `S` containing this address.
    #[inline]
    #[must_use]
    pub const fn page<S: PageSize>(self) -> VirtualPage<S> {
        VirtualPage::<S>::containing_address(self)
    }

    #[inline]
    #[must_use]
    pub const fn offset<S: PageSize>(self) -> u64 {
        self.0.offset::<S>()
    }

    #[inline]
    #[must_use]
    pub const fn align_down<S: PageSize>(self) -> Self {
        Self(self.0.align_down::<S>())
    }

    #[inline]
    #[must_use]
    pub const fn is_aligned<S: PageSize>(self) -> bool {
        self.0.is_aligned::<S>()
    }

    /// Byte offset inside the 4 KiB page (bits 11..0).
    #[inline]
    #[must_use]
    pub const fn page_offset(self) -> u64 {
        self.as_u64() & 0xFFF
    }

    /// Index into the table of the given `level` (1 = PT … 4 = PML4).
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn page_table_index(self, level: PageTableLevel) -> PageTableIndex {
        let shift = 12 + 9 * (level.as_u8() as u32 - 1);
        PageTableIndex::new_truncate((self.as_u64() >> shift) as u16)
    }

    /// PML4 index, bits 47..39.
    #[inline]
    #[must_use]
    pub const fn p4_index(self) -> PageTableIndex {
        self.page_table_index(PageTableLevel::Four)
    }

    /// PDPT index, bits 38..30.
    #[inline]
    #[must_use]
    pub const fn p3_index(self) -> PageTableIndex {
        self.page_table_index(PageTableLevel::Three)
    }

    /// PD index, bits 29..21.
    #[inline]
    #[must_use]
    pub const fn p2_index(self) -> PageTableIndex {
        self.page_table_index(PageTableLevel::Two)
    }

    /// PT index, bits 20..12.
    #[inline]
    #[must_use]
    pub const fn p1_index(self) -> PageTableIndex {
        self.page_table_index(PageTableLevel::One)
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:016X})", self.as_u64())
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.as_u64())
    }
}

impl From<u64> for VirtualAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl<S> From<VirtualPage<S>> for VirtualAddress
where
    S: PageSize,
{
    fn from(value: VirtualPage<S>) -> Self {
        value.start_address()
    }
}

impl Add<u64> for VirtualAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self::new(self.as_u64() + rhs)
    }
}

impl AddAssign<u64> for VirtualAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u64) {
        *self = *self + rhs;
    }
}

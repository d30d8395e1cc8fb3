use crate::{MemoryAddress, PageSize, PhysicalAddressNotValid, PhysicalPage};
use core::fmt;
use core::ops::{Add, AddAssign};
use core::ptr::NonNull;

/// Width of the physical address space supported by the page-table format.
const PHYSICAL_ADDRESS_BITS: u32 = 52;

/// Physical memory address.
///
/// A thin wrapper around [`MemoryAddress`] that denotes **physical** addresses
/// (host RAM / MMIO). Like [`VirtualAddress`](super::VirtualAddress), this type carries intent and
/// prevents accidental VA/PA mix-ups.
///
/// ### Validity
/// Page-table entries store bits `[51:12]` of a physical address, so only
/// values below 2⁵² are representable. [`PhysicalAddress::try_new`] checks
/// this; [`PhysicalAddress::new`] trusts the caller.
///
/// ### Examples
/// ```rust
/// # use kernel_memory_addresses::*;
/// let pa = PhysicalAddress::new(0x0000_0010_2000_0042);
/// let frame = pa.page::<Size4K>();
/// assert_eq!(frame.start_address().as_u64(), 0x0000_0010_2000_0000);
/// assert_eq!(pa.offset::<Size4K>(), 0x42);
/// assert!(PhysicalAddress::try_new(1 << 52).is_err());
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(pub(crate) MemoryAddress);

impl PhysicalAddress {
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

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0)
    }

    /// Wrap a raw value without validation.
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(MemoryAddress::new(v))
    }

    /// Wrap a raw value, rejecting addresses that use bits 52..=63.
    ///
    /// # Errors
    /// [`PhysicalAddressNotValid`] if any of the reserved high bits is set.
    #[inline]
    pub const fn try_new(v: u64) -> Result<Self, PhysicalAddressNotValid> {
        if v >> PHYSICAL_ADDRESS_BITS == 0 {
            Ok(Self::new(v))
        } else {
            Err(PhysicalAddressNotValid(v))
        }
    }

    /// Wrap a raw value, clearing bits 52..=63.
    #[inline]
    #[must_use]
    pub const fn new_truncate(v: u64) -> Self {
        Self::new(v & ((1 << PHYSICAL_ADDRESS_BITS) - 1))
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0.as_u64()
    }

    /// The frame of size `S` containing this address.
    #[inline]
    #[must_use]
    pub const fn page<S: PageSize>(self) -> PhysicalPage<S> {
        PhysicalPage::<S>::containing_address(self)
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
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.as_u64())
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.as_u64())
    }
}

impl From<u64> for PhysicalAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl<S> From<PhysicalPage<S>> for PhysicalAddress
where
    S: PageSize,
{
    fn from(value: PhysicalPage<S>) -> Self {
        value.start_address()
    }
}

impl Add<u64> for PhysicalAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self::new(self.as_u64() + rhs)
    }
}

impl AddAssign<u64> for PhysicalAddress {
    #[inline]
    fn add_assign(&mut self, rhs: u64) {
        *self = *self + rhs;
    }
}

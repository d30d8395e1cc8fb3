use crate::page_table::PageTableFlags;
use bitfield_struct::bitfield;
use core::fmt;
use kernel_memory_addresses::{PageSize, PhysicalAddress, PhysicalPage, Size4K};

/// Bits `12..=51` of an entry: the 4 KiB-aligned physical address.
const ADDRESS_MASK: u64 = 0x000F_FFFF_FFFF_F000;

/// Why [`PageTableEntry::frame`] could not produce a 4 KiB frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FrameError {
    /// `PRESENT` is clear.
    #[error("entry is not present")]
    FrameNotPresent,
    /// `HUGE_PAGE` is set; the entry maps a 2 MiB or 1 GiB page.
    #[error("entry maps a huge page")]
    HugeFrame,
}

/// A 64-bit page table entry, identical in layout at every level.
///
/// ```text
/// | 63 | 62‒52    | 51‒12            | 11‒9     | 8‒0   |
/// | NX | software | physical address | software | flags |
/// ```
///
/// The flag halves and the address are separate bitfields, so
/// [`set_flags`](Self::set_flags) cannot disturb the address and
/// [`set_address`](Self::set_address) cannot disturb the flags. The all-zero
/// value is the *unused* entry.
#[bitfield(u64, debug = false)]
#[derive(PartialEq, Eq)]
pub struct PageTableEntry {
    /// Bits 0..=11.
    #[bits(12)]
    flags_low: u16,
    /// Bits 12..=51, physical address >> 12.
    #[bits(40)]
    address_bits: u64,
    /// Bits 52..=63.
    #[bits(12)]
    flags_high: u16,
}

impl PageTableEntry {
    /// Whether the entry is all zero.
    #[inline]
    #[must_use]
    pub const fn is_unused(&self) -> bool {
        self.into_bits() == 0
    }

    /// Reset the entry to all zero.
    #[inline]
    pub fn set_unused(&mut self) {
        *self = Self::new();
    }

    #[inline]
    #[must_use]
    pub const fn flags(&self) -> PageTableFlags {
        PageTableFlags::from_bits_retain(self.into_bits() & !ADDRESS_MASK)
    }

    /// Replace every flag bit, including the software-available ones.
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_flags(&mut self, flags: PageTableFlags) {
        let bits = flags.bits();
        self.set_flags_low((bits & 0xFFF) as u16);
        self.set_flags_high((bits >> 52) as u16);
    }

    #[inline]
    #[must_use]
    pub const fn address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.address_bits() << 12)
    }

    /// Point the entry at `addr`, keeping the flags.
    ///
    /// # Panics
    /// If `addr` is not 4 KiB aligned or does not fit in 52 bits.
    #[inline]
    pub fn set_address(&mut self, addr: PhysicalAddress) {
        assert!(
            addr.is_aligned::<Size4K>(),
            "page table entry address must be 4 KiB aligned"
        );
        assert!(
            addr.as_u64() & !ADDRESS_MASK == 0,
            "page table entry address must fit in 52 bits"
        );
        self.set_address_bits(addr.as_u64() >> 12);
    }

    /// Point the entry at `frame` and replace its flags.
    #[inline]
    pub fn set<S: PageSize>(&mut self, frame: PhysicalPage<S>, flags: PageTableFlags) {
        self.set_address(frame.start_address());
        self.set_flags(flags);
    }

    /// The 4 KiB frame this entry points to: a next-level table or a 4 KiB page.
    ///
    /// # Errors
    /// - [`FrameError::FrameNotPresent`] if `PRESENT` is clear.
    /// - [`FrameError::HugeFrame`] if `HUGE_PAGE` is set.
    #[inline]
    pub const fn frame(&self) -> Result<PhysicalPage<Size4K>, FrameError> {
        let flags = self.flags();
        if !flags.contains(PageTableFlags::PRESENT) {
            Err(FrameError::FrameNotPresent)
        } else if flags.contains(PageTableFlags::HUGE_PAGE) {
            Err(FrameError::HugeFrame)
        } else {
            Ok(PhysicalPage::containing_address(self.address()))
        }
    }
}

impl fmt::Debug for PageTableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageTableEntry")
            .field("address", &self.address())
            .field("flags", &self.flags())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(v: u64) -> PhysicalPage<Size4K> {
        PhysicalPage::from_start_address(PhysicalAddress::new(v)).expect("aligned")
    }

    #[test]
    fn zero_is_unused() {
        let mut e = PageTableEntry::new();
        assert!(e.is_unused());
        e.set(frame(0x1000), PageTableFlags::PRESENT);
        assert!(!e.is_unused());
        e.set_unused();
        assert!(e.is_unused());
        assert_eq!(e.into_bits(), 0);
    }

    #[test]
    fn flags_and_address_are_independent() {
        let mut e = PageTableEntry::new();
        e.set_address(PhysicalAddress::new(0x000F_FFFF_FFFF_F000));
        e.set_flags(PageTableFlags::all());
        assert_eq!(e.into_bits(), u64::MAX);

        e.set_flags(PageTableFlags::PRESENT | PageTableFlags::BIT_52);
        assert_eq!(e.address().as_u64(), 0x000F_FFFF_FFFF_F000);

        e.set_address(PhysicalAddress::new(0x2000));
        assert_eq!(e.flags(), PageTableFlags::PRESENT | PageTableFlags::BIT_52);
        assert_eq!(e.into_bits(), 0x0010_0000_0000_2001);
    }

    #[test]
    #[should_panic(expected = "4 KiB aligned")]
    fn unaligned_address_panics() {
        PageTableEntry::new().set_address(PhysicalAddress::new(0x1234));
    }

    #[test]
    #[should_panic(expected = "fit in 52 bits")]
    fn address_beyond_52_bits_panics() {
        let mut e = PageTableEntry::new();
        e.set(frame(0x1000), PageTableFlags::PRESENT);
        e.set_address(PhysicalAddress::new(1 << 52));
    }

    #[test]
    fn frame_errors() {
        let mut e = PageTableEntry::new();
        assert_eq!(e.frame(), Err(FrameError::FrameNotPresent));

        e.set(frame(0x20_0000), PageTableFlags::PRESENT | PageTableFlags::HUGE_PAGE);
        assert_eq!(e.frame(), Err(FrameError::HugeFrame));

        e.set_flags(PageTableFlags::PRESENT | PageTableFlags::WRITABLE);
        assert_eq!(e.frame(), Ok(frame(0x20_0000)));
    }

    #[test]
    fn hardware_bit_positions() {
        let mut e = PageTableEntry::new();
        e.set_flags(PageTableFlags::NO_EXECUTE | PageTableFlags::HUGE_PAGE);
        assert_eq!(e.into_bits(), (1 << 63) | (1 << 7));
    }
}

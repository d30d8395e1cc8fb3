//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for raw memory addresses, frames and pages used in
//! x86-64 paging code.
//!
//! ## Overview
//!
//! All higher-level abstractions are built from a few principal types:
//!
//! | Concept | Generic | Description |
//! |----------|----------|-------------|
//! | [`MemoryAddress`] | – | A raw 64-bit address, either physical or virtual. |
//! | [`MemoryPage<S>`] | [`S: PageSize`](PageSize) | A page-aligned base address of a page of size `S`. |
//!
//! These are then wrapped to distinguish between virtual and physical spaces:
//!
//! | Wrapper | Meaning |
//! |----------|----------|
//! | [`VirtualAddress`] / [`VirtualPage<S>`] | Refer to virtual (page-table translated) memory. |
//! | [`PhysicalAddress`] / [`PhysicalPage<S>`] | Refer to physical memory or MMIO regions. |
//!
//! ## Validity
//!
//! - Virtual addresses are *canonical* when bits 48..=63 copy bit 47.
//!   [`VirtualAddress::try_new`] rejects anything else,
//!   [`VirtualAddress::new_truncate`] sign-extends.
//! - Physical addresses must fit in 52 bits. [`PhysicalAddress::try_new`]
//!   rejects anything else, [`PhysicalAddress::new_truncate`] masks.
//! - `new` on either wrapper trusts the caller.
//!
//! ## Page Sizes
//!
//! Three standard x86-64 page sizes are supported via marker types that
//! implement [`PageSize`]:
//!
//! - [`Size4K`]: 4 KiB pages (base granularity)
//! - [`Size2M`]: 2 MiB huge pages
//! - [`Size1G`]: 1 GiB giant pages
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::try_new(0xFFFF_FFFF_8000_1234).unwrap();
//! let page = va.page::<Size4K>();
//! assert_eq!(page.start_address().as_u64() + va.offset::<Size4K>(), va.as_u64());
//!
//! let start = PhysicalAddress::new(0x10_0000).page::<Size4K>();
//! let end = PhysicalAddress::new(0x10_4000).page::<Size4K>();
//! assert_eq!(PhysicalPage::range(start, end).count(), 4);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code, clippy::inline_always)]

mod error;
mod memory_address;
mod memory_page;
mod page_range;
mod page_size;
mod page_table_index;
mod physical_address;
mod physical_page;
mod virtual_address;
mod virtual_page;

/// Sealed trait pattern to restrict `PageSize` and `PageStep` impls to this crate.
mod sealed {
    pub trait Sealed {}
}

pub use error::{AddressNotAligned, PhysicalAddressNotValid, VirtualAddressNotValid};
pub use memory_address::MemoryAddress;
pub use memory_page::MemoryPage;
pub use page_range::{
    PageRange, PageRangeInclusive, PageStep, PhysicalPageRange, PhysicalPageRangeInclusive,
    VirtualPageRange, VirtualPageRangeInclusive,
};
pub use page_size::{PageSize, Size1G, Size2M, Size4K};
pub use page_table_index::{ENTRY_COUNT, PageTableIndex, PageTableLevel};
pub use physical_address::PhysicalAddress;
pub use physical_page::PhysicalPage;
pub use virtual_address::VirtualAddress;
pub use virtual_page::VirtualPage;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_and_offset_4k() {
        let a = MemoryAddress::new(0x1234_5678_9ABC_DEF0);
        let p = a.page::<Size4K>();
        assert_eq!(p.start_address().as_u64() & 0xFFF, 0);
        assert_eq!(a.offset::<Size4K>(), a.as_u64() & 0xFFF);
        assert_eq!(p.start_address().as_u64() + a.offset::<Size4K>(), a.as_u64());
    }

    #[test]
    fn page_and_offset_huge() {
        let a = MemoryAddress::new(0x0000_0008_1234_5678);
        assert_eq!(a.page::<Size2M>().start_address().as_u64(), 0x0000_0008_1220_0000);
        assert_eq!(a.offset::<Size2M>(), 0x14_5678);
        assert_eq!(a.page::<Size1G>().start_address().as_u64(), 0x0000_0008_0000_0000);
        assert_eq!(a.offset::<Size1G>(), 0x1234_5678);
    }

    #[test]
    fn alignment_helpers() {
        let a = MemoryAddress::new(0x12345);
        assert_eq!(a.align_down::<Size4K>().as_u64(), 0x12000);
        assert_eq!(a.offset::<Size4K>(), 0x345);
        assert!(!a.is_aligned::<Size4K>());
        assert!(a.align_down::<Size4K>().is_aligned::<Size4K>());
    }

    #[test]
    fn canonical_virtual_addresses() {
        assert!(VirtualAddress::try_new(0x0000_7FFF_FFFF_FFFF).is_ok());
        assert!(VirtualAddress::try_new(0xFFFF_8000_0000_0000).is_ok());
        assert_eq!(
            VirtualAddress::try_new(0x0000_8000_0000_0000),
            Err(VirtualAddressNotValid(0x0000_8000_0000_0000))
        );
        assert_eq!(
            VirtualAddress::new_truncate(0x0000_8000_0000_1000).as_u64(),
            0xFFFF_8000_0000_1000
        );
        assert_eq!(
            VirtualAddress::new_truncate(0x1234_0000_0000_1000).as_u64(),
            0x1000
        );
    }

    #[test]
    fn physical_address_limits() {
        assert!(PhysicalAddress::try_new(0x000F_FFFF_FFFF_FFFF).is_ok());
        assert_eq!(
            PhysicalAddress::try_new(1 << 52),
            Err(PhysicalAddressNotValid(1 << 52))
        );
        assert_eq!(PhysicalAddress::new_truncate(u64::MAX).as_u64(), 0x000F_FFFF_FFFF_FFFF);
    }

    #[test]
    fn virtual_address_indices() {
        let va = VirtualAddress::new(0xFFFF_8123_4567_89AB);
        assert_eq!(va.p4_index().as_u16(), 0x102);
        assert_eq!(va.p3_index().as_u16(), 0x8D);
        assert_eq!(va.p2_index().as_u16(), 0x2B);
        assert_eq!(va.p1_index().as_u16(), 0x78);
        assert_eq!(va.page_offset(), 0x9AB);
        assert_eq!(va.page_table_index(PageTableLevel::Four), va.p4_index());
    }
}

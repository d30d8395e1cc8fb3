//! # Virtual Memory Support
//!
//! x86-64 four-level paging: page table entries and tables, and a
//! [`Mapper`](mapper::Mapper) that maps, unmaps, updates and translates pages
//! of 4 KiB, 2 MiB and 1 GiB.
//!
//! ## What you get
//! - [`PageTableEntry`], [`PageTableFlags`] and the 4 KiB-aligned [`PageTable`].
//! - A [`FrameAllocator`] interface for frames that back new intermediate tables.
//! - The [`Mapper`](mapper::Mapper) and [`Translate`](mapper::Translate) traits,
//!   implemented by [`OffsetPageTable`](mapper::OffsetPageTable) and
//!   [`RecursivePageTable`](mapper::RecursivePageTable).
//! - [`MapperFlush`](mapper::MapperFlush) tokens for TLB maintenance.
//!
//! ## x86-64 Virtual Address → Physical Address Walk
//!
//! Each 48-bit virtual address is divided into five fields:
//!
//! ```text
//! | 47‒39 | 38‒30 | 29‒21 | 20‒12 | 11‒0   |
//! |  PML4 |  PDPT |   PD  |   PT  | Offset |
//! ```
//!
//! The CPU uses these fields as **indices** into four levels of page tables,
//! each level containing 512 (2⁹) entries of 8 bytes each.
//!
//! ```text
//!  PML4  →  PDPT  →  PD  →  PT  →  Physical Page
//!   │        │        │        │
//!   │        │        │        └───► PTE   → maps 4 KiB page
//!   │        │        └────────────► PDE   → HUGE_PAGE=1 → 2 MiB page
//!   │        └─────────────────────► PDPTE → HUGE_PAGE=1 → 1 GiB page
//!   └──────────────────────────────► PML4E
//! ```
//!
//! | Level | Table | Entry | Leaf? |
//! |:------|:------|:------|:------|
//! | 4 | **PML4** | PML4E | never; `HUGE_PAGE` must be clear |
//! | 3 | **PDPT** | PDPTE | if `HUGE_PAGE` is set (1 GiB) |
//! | 2 | **PD** | PDE | if `HUGE_PAGE` is set (2 MiB) |
//! | 1 | **PT** | PTE | always (4 KiB) |
//!
//! ## Example
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! # use kernel_vmem::{FrameAllocator, PageTable, PageTableFlags};
//! # use kernel_vmem::mapper::{Mapper, OffsetPageTable, Translate};
//! #[repr(C, align(4096))]
//! struct Frame([u8; 4096]);
//!
//! // "physical memory": frame n lives at physical address n * 4096
//! let mut memory: Vec<Frame> = (0..8).map(|_| Frame([0; 4096])).collect();
//! let offset = VirtualAddress::from_ptr(memory.as_mut_ptr());
//!
//! struct Bump(u64);
//! unsafe impl FrameAllocator<Size4K> for Bump {
//!     fn allocate_frame(&mut self) -> Option<PhysicalPage<Size4K>> {
//!         self.0 += 1;
//!         (self.0 < 8).then(|| PhysicalAddress::new(self.0 * 4096).page())
//!     }
//! }
//!
//! let level_4 = unsafe { &mut *offset.as_mut_ptr::<PageTable>() };
//! let mut mapper = unsafe { OffsetPageTable::new(level_4, offset) };
//!
//! let page = VirtualAddress::new(0x4000_0000).page::<Size4K>();
//! let frame = PhysicalAddress::new(0xA000).page::<Size4K>();
//! let flush = unsafe { mapper.map_to(page, frame, PageTableFlags::PRESENT, &mut Bump(0)) };
//! flush.unwrap().ignore();
//!
//! assert_eq!(
//!     mapper.translate_addr(VirtualAddress::new(0x4000_0123)),
//!     Some(PhysicalAddress::new(0xA123))
//! );
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code, clippy::inline_always)]

mod frame_alloc;
pub mod mapper;
mod page_table;

pub use crate::frame_alloc::{FrameAllocator, FrameDeallocator};
pub use crate::page_table::{FrameError, PageTable, PageTableEntry, PageTableFlags};

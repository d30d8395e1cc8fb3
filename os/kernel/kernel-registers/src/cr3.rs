use bitfield_struct::bitfield;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};

#[cfg(feature = "asm")]
use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};

/// CR3: Page-Map Level-4 Base Register (IA-32e, PCID disabled).
///
/// Holds the physical frame of the active PML4 table and cache-control flags
/// for PML4 walks. Assumes no PCID (CR4.PCIDE = 0).
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct Cr3 {
    /// Bits 0–2: reserved (must be 0).
    #[bits(3)]
    pub reserved0: u8,

    /// Bit 3: PWT, page-level write-through for the PML4.
    pub pwt: bool,

    /// Bit 4: PCD, page-level cache disable for the PML4.
    pub pcd: bool,

    /// Bits 5–11: reserved (must be 0 when written).
    #[bits(7)]
    pub reserved1: u8,

    /// Bits 12–51: PML4 physical base >> 12.
    #[bits(40)]
    pml4_base_4k: u64,

    /// Bits 52–63: reserved.
    #[bits(12)]
    pub reserved2: u16,
}

impl Cr3 {
    /// Build a `Cr3` value pointing at `pml4` with the given cache flags.
    #[must_use]
    pub const fn from_pml4_frame(pml4: PhysicalPage<Size4K>, pwt: bool, pcd: bool) -> Self {
        Self::new()
            .with_pwt(pwt)
            .with_pcd(pcd)
            .with_pml4_base_4k(pml4.start_address().as_u64() >> 12)
    }

    /// Physical address of the PML4 table.
    #[must_use]
    pub const fn pml4_phys(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.pml4_base_4k() << 12)
    }

    /// Frame holding the PML4 table.
    #[must_use]
    pub const fn pml4_frame(&self) -> PhysicalPage<Size4K> {
        PhysicalPage::containing_address(self.pml4_phys())
    }
}

#[cfg(feature = "asm")]
impl LoadRegisterUnsafe for Cr3 {
    unsafe fn load_unsafe() -> Self {
        let mut cr3: u64;
        unsafe {
            core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr3)
    }
}

#[cfg(feature = "asm")]
impl StoreRegisterUnsafe for Cr3 {
    unsafe fn store_unsafe(self) {
        let cr3 = self.into_bits();
        unsafe {
            core::arch::asm!("mov cr3, {}", in(reg) cr3, options(nostack, preserves_flags));
        }
    }
}

//! TLB invalidation.

use crate::cr3::Cr3;
use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use kernel_memory_addresses::VirtualAddress;

/// Invalidate the TLB entry for the page containing `va` on this CPU.
///
/// # Safety
/// Must run in ring 0.
#[inline]
pub unsafe fn flush(va: VirtualAddress) {
    unsafe {
        core::arch::asm!("invlpg [{}]", in(reg) va.as_u64(), options(nostack, preserves_flags));
    }
}

/// Drop all non-global TLB entries on this CPU by reloading CR3.
///
/// # Safety
/// Must run in ring 0.
#[inline]
pub unsafe fn flush_all() {
    unsafe {
        let cr3 = Cr3::load_unsafe();
        cr3.store_unsafe();
    }
}

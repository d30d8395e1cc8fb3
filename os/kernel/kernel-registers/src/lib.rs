//! # Typed `X86_64` Paging Registers
//!
//! The pieces of CPU state a page-table mapper touches: the [`Cr3`](cr3::Cr3)
//! root pointer and TLB invalidation.
//!
//! ### Features
//! - `cr3`: the [`Cr3`](cr3::Cr3) bitfield. Pure data, usable on any host.
//! - `asm`: privileged `mov cr3` access through [`LoadRegisterUnsafe`] and
//!   [`StoreRegisterUnsafe`].
//! - `tlb`: `invlpg` and full-flush helpers. Implies `asm` and `cr3`.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(feature = "cr3")]
pub mod cr3;

#[cfg(feature = "tlb")]
pub mod tlb;

pub trait LoadRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel mode (Ring 0).
    unsafe fn load_unsafe() -> Self;
}

pub trait StoreRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// For example, the register access might be privileged and require kernel mode (Ring 0).
    unsafe fn store_unsafe(self);
}

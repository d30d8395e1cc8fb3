//! Errors produced when constructing addresses, frames and pages.

/// An address was expected to start a page or frame but is not aligned to it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
#[error("address {address:#018x} is not aligned to {alignment:#x} bytes")]
pub struct AddressNotAligned {
    /// The offending raw address.
    pub address: u64,
    /// The required alignment in bytes.
    pub alignment: u64,
}

impl AddressNotAligned {
    #[inline]
    #[must_use]
    pub const fn new(address: u64, alignment: u64) -> Self {
        Self { address, alignment }
    }
}

/// A physical address used bits 52..=63, which x86-64 reserves.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
#[error("invalid physical address {0:#018x}: bits 52..=63 must be zero")]
pub struct PhysicalAddressNotValid(pub u64);

/// A virtual address was not canonical (bits 48..=63 must copy bit 47).
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
#[error("non-canonical virtual address {0:#018x}")]
pub struct VirtualAddressNotValid(pub u64);

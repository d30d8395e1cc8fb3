use crate::PageTableLevel;
use crate::sealed::Sealed;
use core::fmt;
use core::hash::Hash;

/// Marker trait for supported page sizes.
///
/// Besides the geometry, every size knows the page-table level whose entry maps
/// a page of that size directly ([`LEAF_LEVEL`](PageSize::LEAF_LEVEL)):
///
/// | Size | Leaf level | Entry |
/// |------|-----------|-------|
/// | [`Size4K`] | 1 | PTE |
/// | [`Size2M`] | 2 | PDE with `PS=1` |
/// | [`Size1G`] | 3 | PDPTE with `PS=1` |
pub trait PageSize:
    Sealed + Clone + Copy + Eq + PartialEq + Ord + PartialOrd + Hash + fmt::Display + fmt::Debug
{
    /// Page size in bytes (power of two).
    const SIZE: u64;
    /// log2(SIZE), i.e., number of low bits used for the offset.
    const SHIFT: u32;
    /// Table level holding the leaf entry for a page of this size.
    const LEAF_LEVEL: PageTableLevel;
    /// Whether the leaf entry carries the `PS` (huge page) bit.
    const IS_HUGE: bool;

    /// Human readable label, e.g. `"4K"`.
    fn as_str() -> &'static str;
}

macro_rules! page_size {
    ($(#[$doc:meta])* $name:ident, $shift:literal, $leaf:ident, $huge:literal, $label:literal) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name;

        impl Sealed for $name {}

        impl PageSize for $name {
            const SIZE: u64 = 1 << $shift;
            const SHIFT: u32 = $shift;
            const LEAF_LEVEL: PageTableLevel = PageTableLevel::$leaf;
            const IS_HUGE: bool = $huge;

            fn as_str() -> &'static str {
                $label
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(Self::as_str())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "Size{}", Self::as_str())
            }
        }
    };
}

page_size!(
    /// 4 KiB page (4096 bytes).
    Size4K, 12, One, false, "4K"
);
page_size!(
    /// 2 MiB page (`2_097_152` bytes), mapped by a level 2 entry.
    Size2M, 21, Two, true, "2M"
);
page_size!(
    /// 1 GiB page (`1_073_741_824` bytes), mapped by a level 3 entry.
    Size1G, 30, Three, true, "1G"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(Size4K::SIZE, 4096);
        assert_eq!(Size2M::SIZE, 2 * 1024 * 1024);
        assert_eq!(Size1G::SIZE, 1024 * 1024 * 1024);
        assert_eq!(format!("{Size2M:?}/{Size1G}"), "Size2M/1G");
    }

    #[test]
    fn leaf_levels() {
        assert_eq!(Size4K::LEAF_LEVEL, PageTableLevel::One);
        assert_eq!(Size2M::LEAF_LEVEL, PageTableLevel::Two);
        assert_eq!(Size1G::LEAF_LEVEL, PageTableLevel::Three);
        assert!(!Size4K::IS_HUGE && Size2M::IS_HUGE && Size1G::IS_HUGE);
    }
}

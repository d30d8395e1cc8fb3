use core::fmt;

/// Number of entries in one page table.
pub const ENTRY_COUNT: usize = 512;

/// A 9-bit index into a page table (`0..512`).
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PageTableIndex(u16);

impl PageTableIndex {
    /// Wrap `index`.
    ///
    /// # Panics
    /// If `index >= 512`.
    #[inline]
    #[must_use]
    pub const fn new(index: u16) -> Self {
        assert!((index as usize) < ENTRY_COUNT, "page table index out of range");
        Self(index)
    }

    /// Wrap `index`, keeping only its low 9 bits.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn new_truncate(index: u16) -> Self {
        Self(index % ENTRY_COUNT as u16)
    }

    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0 as u64
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for PageTableIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageTableIndex({})", self.0)
    }
}

impl From<PageTableIndex> for u16 {
    #[inline]
    fn from(index: PageTableIndex) -> Self {
        index.0
    }
}

impl From<PageTableIndex> for usize {
    #[inline]
    fn from(index: PageTableIndex) -> Self {
        index.as_usize()
    }
}

/// Level of a table in the four-level hierarchy.
///
/// | Level | Table | Entry covers |
/// |-------|-------|--------------|
/// | 4 | PML4 | 512 GiB |
/// | 3 | PDPT | 1 GiB |
/// | 2 | PD | 2 MiB |
/// | 1 | PT | 4 KiB |
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum PageTableLevel {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
}

impl PageTableLevel {
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// The level one step closer to the leaves, `None` for level 1.
    #[inline]
    #[must_use]
    pub const fn next_lower_level(self) -> Option<Self> {
        match self {
            Self::Four => Some(Self::Three),
            Self::Three => Some(Self::Two),
            Self::Two => Some(Self::One),
            Self::One => None,
        }
    }

    /// The level one step closer to the root, `None` for level 4.
    #[inline]
    #[must_use]
    pub const fn next_higher_level(self) -> Option<Self> {
        match self {
            Self::One => Some(Self::Two),
            Self::Two => Some(Self::Three),
            Self::Three => Some(Self::Four),
            Self::Four => None,
        }
    }

    /// Bytes of virtual address space covered by one entry of this level.
    #[inline]
    #[must_use]
    pub const fn entry_address_space_alignment(self) -> u64 {
        1 << (12 + 9 * (self as u64 - 1))
    }

    /// Bytes of virtual address space covered by a whole table of this level.
    #[inline]
    #[must_use]
    pub const fn table_address_space_alignment(self) -> u64 {
        1 << (21 + 9 * (self as u64 - 1))
    }
}

impl fmt::Display for PageTableLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.as_u8())
    }
}

bitflags::bitflags! {
    /// Page table entry flags.
    ///
    /// The same layout applies to all four levels, except where noted
    /// (e.g. `HUGE_PAGE` is only meaningful in level-2 and level-3 entries).
    /// Bits `12..=51` are the physical address and are never part of this set.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct PageTableFlags: u64 {
        /// Entry is valid; translation continues or terminates here.
        ///
        /// Cleared entries make any access fault.
        const PRESENT = 1 << 0;

        /// Writes are allowed.
        ///
        /// If cleared, the page is read-only; writes fault unless running in
        /// ring 0 with write protection disabled (CR0.WP = 0).
        const WRITABLE = 1 << 1;

        /// Accessible from user mode (CPL=3).
        const USER_ACCESSIBLE = 1 << 2;

        /// Write-through caching.
        const WRITE_THROUGH = 1 << 3;

        /// Caching disabled; used for MMIO.
        const NO_CACHE = 1 << 4;

        /// Set by the CPU on any access.
        const ACCESSED = 1 << 5;

        /// Set by the CPU on the first write (leaf entries only).
        const DIRTY = 1 << 6;

        /// Page size bit.
        ///
        /// In a level-2 entry maps a 2 MiB page, in a level-3 entry a 1 GiB
        /// page, instead of pointing at the next table. Must be clear in
        /// level-4 entries. At level 1 this bit is PAT, which this crate does
        /// not use.
        const HUGE_PAGE = 1 << 7;

        /// Survives CR3 reloads when CR4.PGE is enabled.
        const GLOBAL = 1 << 8;

        /// Available to software.
        const BIT_9 = 1 << 9;
        /// Available to software.
        const BIT_10 = 1 << 10;
        /// Available to software.
        const BIT_11 = 1 << 11;

        /// Available to software.
        const BIT_52 = 1 << 52;
        /// Available to software.
        const BIT_53 = 1 << 53;
        /// Available to software.
        const BIT_54 = 1 << 54;
        /// Available to software.
        const BIT_55 = 1 << 55;
        /// Available to software.
        const BIT_56 = 1 << 56;
        /// Available to software.
        const BIT_57 = 1 << 57;
        /// Available to software.
        const BIT_58 = 1 << 58;
        /// Available to software, or protection key bit 0 with CR4.PKE.
        const BIT_59 = 1 << 59;
        /// Available to software, or protection key bit 1 with CR4.PKE.
        const BIT_60 = 1 << 60;
        /// Available to software, or protection key bit 2 with CR4.PKE.
        const BIT_61 = 1 << 61;
        /// Available to software, or protection key bit 3 with CR4.PKE.
        const BIT_62 = 1 << 62;

        /// Instruction fetches fault when EFER.NXE is set.
        const NO_EXECUTE = 1 << 63;
    }
}

impl PageTableFlags {
    /// Flags propagated into non-leaf entries on the way to a leaf mapped with
    /// `self`: `PRESENT`, plus `WRITABLE` and `USER_ACCESSIBLE` when requested.
    ///
    /// A parent entry must be at least as permissive as its children for the
    /// leaf permissions to take effect.
    #[inline]
    #[must_use]
    pub const fn parent_table_flags(self) -> Self {
        self.intersection(Self::PRESENT.union(Self::WRITABLE).union(Self::USER_ACCESSIBLE))
            .union(Self::PRESENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_flags_avoid_address_bits() {
        assert_eq!(PageTableFlags::all().bits() & 0x000F_FFFF_FFFF_F000, 0);
        assert_eq!(PageTableFlags::all().bits() | 0x000F_FFFF_FFFF_F000, u64::MAX);
    }

    #[test]
    fn parent_flags_are_reduced() {
        let leaf = PageTableFlags::WRITABLE
            | PageTableFlags::NO_EXECUTE
            | PageTableFlags::GLOBAL
            | PageTableFlags::BIT_9;
        assert_eq!(
            leaf.parent_table_flags(),
            PageTableFlags::PRESENT | PageTableFlags::WRITABLE
        );
        assert_eq!(
            PageTableFlags::empty().parent_table_flags(),
            PageTableFlags::PRESENT
        );
    }
}

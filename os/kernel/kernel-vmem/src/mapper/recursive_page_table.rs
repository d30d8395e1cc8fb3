use crate::mapper::{InvalidPageTable, MappedPageTable, PageTableLocator};
use crate::page_table::{PageTable, PageTableFlags};
use kernel_memory_addresses::{
    PageTableIndex, PageTableLevel, PhysicalPage, Size4K, VirtualAddress, VirtualPage,
};
use kernel_registers::cr3::Cr3;
use kernel_registers::{LoadRegisterUnsafe, tlb};
use log::debug;

/// Virtual address of the level-`level` table on the walk for `addr`, when
/// level 4 entry `recursive_index` points back at the level 4 table.
///
/// Each pass through the recursive entry strips one level from the walk, so
/// the index is substituted `level` times and `addr`'s own indices fill the
/// remaining slots:
///
/// | Level | Indices used |
/// |-------|--------------|
/// | 4 | `r, r, r, r` |
/// | 3 | `r, r, r, p4` |
/// | 2 | `r, r, p4, p3` |
/// | 1 | `r, p4, p3, p2` |
///
/// ```rust
/// # use kernel_memory_addresses::*;
/// # use kernel_vmem::mapper::recursive_table_address;
/// let r = PageTableIndex::new(511);
/// let p4 = recursive_table_address(r, PageTableLevel::Four, VirtualAddress::zero());
/// assert_eq!(p4.as_u64(), 0xFFFF_FFFF_FFFF_F000);
/// ```
#[must_use]
#[allow(clippy::cast_lossless)]
pub const fn recursive_table_address(
    recursive_index: PageTableIndex,
    level: PageTableLevel,
    addr: VirtualAddress,
) -> VirtualAddress {
    let substitutions = level.as_u8() as u64;
    let r = recursive_index.as_u64();

    let mut raw = ((addr.as_u64() & 0x0000_FFFF_FFFF_F000) >> (9 * substitutions)) & !0xFFF;
    let mut i = 0;
    while i < substitutions {
        raw |= r << (39 - 9 * i);
        i += 1;
    }
    VirtualAddress::new_truncate(raw)
}

/// Locates tables through a recursive level 4 entry.
///
/// Only valid while the level 4 table is the active one; the addresses are
/// resolved by the MMU through CR3.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RecursiveIndex {
    index: PageTableIndex,
}

impl RecursiveIndex {
    /// # Safety
    /// Level 4 entry `index` of the active table must point at that table.
    #[inline]
    #[must_use]
    pub const unsafe fn new(index: PageTableIndex) -> Self {
        Self { index }
    }

    /// Check that `table`, seen at `table_addr`, is recursively mapped and is
    /// the table stored in `active_level_4_frame`.
    ///
    /// # Errors
    /// - [`InvalidPageTable::NotRecursive`] unless all four indices of
    ///   `table_addr` are equal and that entry points at a 4 KiB frame.
    /// - [`InvalidPageTable::NotActive`] if that frame is not
    ///   `active_level_4_frame`.
    pub fn detect(
        table_addr: VirtualAddress,
        table: &PageTable,
        active_level_4_frame: PhysicalPage<Size4K>,
    ) -> Result<Self, InvalidPageTable> {
        let page = VirtualPage::<Size4K>::containing_address(table_addr);
        let index = page.p4_index();
        if page.p3_index() != index || page.p2_index() != index || page.p1_index() != index {
            return Err(InvalidPageTable::NotRecursive);
        }

        let frame = table[index]
            .frame()
            .map_err(|_| InvalidPageTable::NotRecursive)?;
        if frame != active_level_4_frame {
            return Err(InvalidPageTable::NotActive);
        }

        Ok(Self { index })
    }

    #[inline]
    #[must_use]
    pub const fn index(&self) -> PageTableIndex {
        self.index
    }
}

unsafe impl PageTableLocator for RecursiveIndex {
    #[inline]
    fn table_ptr(
        &self,
        _frame: PhysicalPage<Size4K>,
        addr: VirtualAddress,
        level: PageTableLevel,
    ) -> *mut PageTable {
        recursive_table_address(self.index, level, addr).as_mut_ptr()
    }

    /// The parent entry is the last hop of the recursive address, so it must
    /// allow writes for the table to be edited.
    #[inline]
    fn table_flags(&self) -> PageTableFlags {
        PageTableFlags::WRITABLE
    }

    #[inline]
    fn table_created(&self, table: *mut PageTable) {
        // The recursive address may still be cached from before the entry existed.
        unsafe { tlb::flush(VirtualAddress::from_ptr(table)) }
    }
}

/// Page table hierarchy reached through a recursive level 4 entry.
pub type RecursivePageTable<'a> = MappedPageTable<'a, RecursiveIndex>;

impl<'a> RecursivePageTable<'a> {
    /// Wrap the active level 4 table, seen through its recursive address.
    ///
    /// # Safety
    /// `active_level_4_frame` must be the frame currently loaded in CR3, and
    /// `table` must not be accessed through any other reference while this
    /// value lives.
    ///
    /// # Errors
    /// See [`RecursiveIndex::detect`].
    pub unsafe fn init(
        table: &'a mut PageTable,
        active_level_4_frame: PhysicalPage<Size4K>,
    ) -> Result<Self, InvalidPageTable> {
        let table_addr = VirtualAddress::from_ptr(&raw const *table);
        let locator = RecursiveIndex::detect(table_addr, table, active_level_4_frame)?;
        debug!(
            "recursive page table at {table_addr:?}, index {}",
            locator.index().as_u16()
        );
        Ok(unsafe { Self::with_locator(table, locator) })
    }

    /// [`init`](Self::init) with the frame read from CR3.
    ///
    /// # Safety
    /// Must run in ring 0. Otherwise as [`init`](Self::init).
    ///
    /// # Errors
    /// See [`RecursiveIndex::detect`].
    pub unsafe fn init_active(table: &'a mut PageTable) -> Result<Self, InvalidPageTable> {
        let cr3 = unsafe { Cr3::load_unsafe() };
        unsafe { Self::init(table, cr3.pml4_frame()) }
    }

    /// Wrap `table` without any checks.
    ///
    /// # Safety
    /// `table` must be the active level 4 table seen through its recursive
    /// address, and entry `recursive_index` must point back at it.
    #[inline]
    pub const unsafe fn init_unchecked(
        table: &'a mut PageTable,
        recursive_index: PageTableIndex,
    ) -> Self {
        unsafe { Self::with_locator(table, RecursiveIndex::new(recursive_index)) }
    }

    #[inline]
    #[must_use]
    pub const fn recursive_index(&self) -> PageTableIndex {
        self.locator().index()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_alloc::FrameAllocator;
    use crate::mapper::Mapper;
    use kernel_memory_addresses::PhysicalAddress;

    fn idx(i: u16) -> PageTableIndex {
        PageTableIndex::new(i)
    }

    fn frame(v: u64) -> PhysicalPage<Size4K> {
        PhysicalPage::containing_address(PhysicalAddress::new(v))
    }

    #[test]
    fn table_addresses_per_level() {
        let r = idx(510);
        let addr = VirtualPage::<Size4K>::from_page_table_indices(idx(1), idx(2), idx(3), idx(4))
            .start_address()
            + 0x123;

        let expect = |a, b, c, d| {
            VirtualPage::<Size4K>::from_page_table_indices(idx(a), idx(b), idx(c), idx(d))
                .start_address()
        };

        assert_eq!(
            recursive_table_address(r, PageTableLevel::Four, addr),
            expect(510, 510, 510, 510)
        );
        assert_eq!(
            recursive_table_address(r, PageTableLevel::Three, addr),
            expect(510, 510, 510, 1)
        );
        assert_eq!(
            recursive_table_address(r, PageTableLevel::Two, addr),
            expect(510, 510, 1, 2)
        );
        assert_eq!(
            recursive_table_address(r, PageTableLevel::One, addr),
            expect(510, 1, 2, 3)
        );
    }

    #[test]
    fn locator_points_the_walker_at_recursive_addresses() {
        let locator = unsafe { RecursiveIndex::new(idx(510)) };
        let addr = VirtualPage::<Size4K>::from_page_table_indices(idx(7), idx(8), idx(9), idx(10))
            .start_address();
        let any_frame = frame(0x9000);

        let located = |level| VirtualAddress::from_ptr(locator.table_ptr(any_frame, addr, level));
        let expect = |a, b, c, d| {
            VirtualPage::<Size4K>::from_page_table_indices(idx(a), idx(b), idx(c), idx(d))
                .start_address()
        };

        assert_eq!(located(PageTableLevel::Three), expect(510, 510, 510, 7));
        assert_eq!(located(PageTableLevel::Two), expect(510, 510, 7, 8));
        assert_eq!(located(PageTableLevel::One), expect(510, 7, 8, 9));
    }

    /// Tables in a slice of frames, with the entry flags of [`RecursiveIndex`].
    struct FrameSlice {
        base: *mut PageTable,
        recursive: RecursiveIndex,
    }

    unsafe impl PageTableLocator for FrameSlice {
        fn table_ptr(
            &self,
            frame: PhysicalPage<Size4K>,
            _addr: VirtualAddress,
            _level: PageTableLevel,
        ) -> *mut PageTable {
            let index = usize::try_from(frame.start_address().as_u64() / 4096).expect("index");
            unsafe { self.base.add(index) }
        }

        fn table_flags(&self) -> PageTableFlags {
            self.recursive.table_flags()
        }
    }

    struct NextFrame(u64);

    unsafe impl FrameAllocator<Size4K> for NextFrame {
        fn allocate_frame(&mut self) -> Option<PhysicalPage<Size4K>> {
            self.0 += 1;
            Some(frame(self.0 * 4096))
        }
    }

    fn map_read_only(frames: &mut [PageTable], page: VirtualPage<Size4K>, alloc: &mut NextFrame) {
        let base = frames.as_mut_ptr();
        let locator = FrameSlice {
            base,
            recursive: unsafe { RecursiveIndex::new(idx(511)) },
        };
        let mut mapper = unsafe { MappedPageTable::with_locator(&mut *base, locator) };
        let flush = unsafe { mapper.map_to(page, frame(0x40_0000), PageTableFlags::PRESENT, alloc) };
        flush.expect("map").ignore();
    }

    #[test]
    fn intermediate_entries_are_writable() {
        let mut frames: Vec<PageTable> = (0..4).map(|_| PageTable::new()).collect();
        let page = VirtualPage::<Size4K>::from_page_table_indices(idx(1), idx(2), idx(3), idx(4));
        map_read_only(&mut frames, page, &mut NextFrame(0));

        let rw = PageTableFlags::PRESENT | PageTableFlags::WRITABLE;
        assert_eq!(frames[0][1].flags(), rw);
        assert_eq!(frames[1][2].flags(), rw);
        assert_eq!(frames[2][3].flags(), rw);
        assert_eq!(frames[3][4].flags(), PageTableFlags::PRESENT);
    }

    #[test]
    fn existing_read_only_parent_becomes_writable() {
        let mut frames: Vec<PageTable> = (0..4).map(|_| PageTable::new()).collect();
        let first = VirtualPage::<Size4K>::from_page_table_indices(idx(1), idx(2), idx(3), idx(4));
        map_read_only(&mut frames, first, &mut NextFrame(0));
        frames[0][1].set_flags(PageTableFlags::PRESENT);

        let second = VirtualPage::<Size4K>::from_page_table_indices(idx(1), idx(2), idx(3), idx(5));
        map_read_only(&mut frames, second, &mut NextFrame(3));

        assert_eq!(
            frames[0][1].flags(),
            PageTableFlags::PRESENT | PageTableFlags::WRITABLE
        );
        assert_eq!(frames[3][5].flags(), PageTableFlags::PRESENT);
    }

    #[test]
    fn lower_half_index_stays_canonical() {
        let addr = recursive_table_address(idx(42), PageTableLevel::Four, VirtualAddress::zero());
        assert!(VirtualAddress::try_new(addr.as_u64()).is_ok());
        assert_eq!(addr.p4_index(), idx(42));
        assert_eq!(addr.p1_index(), idx(42));
    }

    #[test]
    fn detect_recursive_table() {
        let own = frame(0x7000);
        let mut table = PageTable::new();
        table[511].set(own, PageTableFlags::PRESENT | PageTableFlags::WRITABLE);

        let self_addr = VirtualAddress::new(0xFFFF_FFFF_FFFF_F000);
        let found = RecursiveIndex::detect(self_addr, &table, own).expect("recursive");
        assert_eq!(found.index(), idx(511));

        assert_eq!(
            RecursiveIndex::detect(self_addr, &table, frame(0x8000)),
            Err(InvalidPageTable::NotActive)
        );
    }

    #[test]
    fn detect_rejects_non_recursive_address() {
        let own = frame(0x7000);
        let mut table = PageTable::new();
        table[511].set(own, PageTableFlags::PRESENT);

        assert_eq!(
            RecursiveIndex::detect(VirtualAddress::new(0xFFFF_FFFF_FFFF_E000), &table, own),
            Err(InvalidPageTable::NotRecursive)
        );
    }

    #[test]
    fn detect_rejects_missing_or_huge_entry() {
        let own = frame(0x7000);
        let self_addr = VirtualAddress::new(0xFFFF_FFFF_FFFF_F000);
        let mut table = PageTable::new();
        assert_eq!(
            RecursiveIndex::detect(self_addr, &table, own),
            Err(InvalidPageTable::NotRecursive)
        );

        table[511].set(own, PageTableFlags::PRESENT | PageTableFlags::HUGE_PAGE);
        assert_eq!(
            RecursiveIndex::detect(self_addr, &table, own),
            Err(InvalidPageTable::NotRecursive)
        );
    }

    #[test]
    fn init_rejects_fresh_table() {
        let mut table = Box::new(PageTable::new());
        let result = unsafe { RecursivePageTable::init(&mut table, frame(0x1000)) };
        assert!(matches!(result, Err(InvalidPageTable::NotRecursive)));
    }
}

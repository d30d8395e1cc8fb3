use crate::frame_alloc::FrameAllocator;
use crate::mapper::walker::{PageTableCreateError, PageTableWalkError};
use crate::mapper::{
    FlagUpdateError, MapToError, MappedFrame, Mapper, MapperFlush, MapperFlushAll,
    PageTableLocator, PageTableWalker, Translate, TranslateError, TranslateResult, UnmapError,
};
use crate::page_table::{PageTable, PageTableFlags};
use kernel_memory_addresses::{
    PageSize, PageTableLevel, PhysicalPage, Size1G, Size2M, Size4K, VirtualAddress, VirtualPage,
};
use log::debug;

/// A level 4 table plus the strategy for reaching the tables below it.
#[derive(Debug)]
pub struct MappedPageTable<'a, L: PageTableLocator> {
    level_4_table: &'a mut PageTable,
    walker: PageTableWalker<L>,
}

impl<'a, L: PageTableLocator> MappedPageTable<'a, L> {
    /// # Safety
    /// `level_4_table` must be a valid level 4 table, and `locator` must
    /// uphold the [`PageTableLocator`] contract for every table below it.
    #[inline]
    pub const unsafe fn with_locator(level_4_table: &'a mut PageTable, locator: L) -> Self {
        Self {
            level_4_table,
            walker: unsafe { PageTableWalker::new(locator) },
        }
    }

    #[inline]
    pub const fn level_4_table(&self) -> &PageTable {
        &*self.level_4_table
    }

    /// # Safety
    /// Entries written through this reference must keep the hierarchy valid.
    #[inline]
    pub const unsafe fn level_4_table_mut(&mut self) -> &mut PageTable {
        &mut *self.level_4_table
    }

    #[inline]
    pub const fn locator(&self) -> &L {
        self.walker.locator()
    }

    /// The level-`target` table on the walk for `addr`.
    fn table_at(
        &self,
        addr: VirtualAddress,
        target: PageTableLevel,
    ) -> Result<&PageTable, PageTableWalkError> {
        let mut table: &PageTable = &*self.level_4_table;
        let mut level = PageTableLevel::Four;
        while let Some(lower) = level.next_lower_level().filter(|l| *l >= target) {
            let entry = &table[addr.page_table_index(level)];
            table = self.walker.next_table(entry, addr, lower)?;
            level = lower;
        }
        Ok(table)
    }

    fn table_at_mut(
        &mut self,
        addr: VirtualAddress,
        target: PageTableLevel,
    ) -> Result<&mut PageTable, PageTableWalkError> {
        let Self {
            level_4_table,
            walker,
        } = self;

        let mut table: &mut PageTable = &mut **level_4_table;
        let mut level = PageTableLevel::Four;
        while let Some(lower) = level.next_lower_level().filter(|l| *l >= target) {
            let entry = &mut table[addr.page_table_index(level)];
            table = walker.next_table_mut(entry, addr, lower)?;
            level = lower;
        }
        Ok(table)
    }

    fn create_table_at<A>(
        &mut self,
        addr: VirtualAddress,
        target: PageTableLevel,
        insert_flags: PageTableFlags,
        allocator: &mut A,
    ) -> Result<&mut PageTable, PageTableCreateError>
    where
        A: FrameAllocator<Size4K> + ?Sized,
    {
        let Self {
            level_4_table,
            walker,
        } = self;

        let mut table: &mut PageTable = &mut **level_4_table;
        let mut level = PageTableLevel::Four;
        while let Some(lower) = level.next_lower_level().filter(|l| *l >= target) {
            let entry = &mut table[addr.page_table_index(level)];
            table = walker.create_next_table(entry, insert_flags, addr, lower, allocator)?;
            level = lower;
        }
        Ok(table)
    }

    /// Set or clear `HUGE_PAGE` as required for a leaf of size `S`.
    fn leaf_flags<S: PageSize>(flags: PageTableFlags) -> PageTableFlags {
        if S::IS_HUGE {
            flags | PageTableFlags::HUGE_PAGE
        } else {
            flags - PageTableFlags::HUGE_PAGE
        }
    }

    fn set_parent_entry_flags<S: PageSize>(
        &mut self,
        page: VirtualPage<S>,
        level: PageTableLevel,
        flags: PageTableFlags,
    ) -> Result<MapperFlushAll, FlagUpdateError> {
        if level <= S::LEAF_LEVEL {
            return Err(FlagUpdateError::ParentEntryHugePage);
        }

        let addr = page.start_address();
        let table = self.table_at_mut(addr, level).map_err(|e| match e {
            PageTableWalkError::NotMapped => FlagUpdateError::PageNotMapped,
            PageTableWalkError::MappedToHugePage => FlagUpdateError::ParentEntryHugePage,
        })?;

        let entry = &mut table[addr.page_table_index(level)];
        if entry.is_unused() {
            return Err(FlagUpdateError::PageNotMapped);
        }
        entry.set_flags(flags);

        Ok(MapperFlushAll::new())
    }
}

impl<L: PageTableLocator, S: PageSize> Mapper<S> for MappedPageTable<'_, L> {
    unsafe fn map_to_with_table_flags<A>(
        &mut self,
        page: VirtualPage<S>,
        frame: PhysicalPage<S>,
        flags: PageTableFlags,
        parent_table_flags: PageTableFlags,
        allocator: &mut A,
    ) -> Result<MapperFlush<S>, MapToError<S>>
    where
        A: FrameAllocator<Size4K> + ?Sized,
    {
        let addr = page.start_address();
        let table = self
            .create_table_at(addr, S::LEAF_LEVEL, parent_table_flags, allocator)
            .map_err(|e| match e {
                PageTableCreateError::MappedToHugePage => MapToError::ParentEntryHugePage,
                PageTableCreateError::FrameAllocationFailed => MapToError::FrameAllocationFailed,
            })?;

        let entry = &mut table[addr.page_table_index(S::LEAF_LEVEL)];
        if !entry.is_unused() {
            return Err(MapToError::PageAlreadyMapped(
                PhysicalPage::containing_address(entry.address()),
            ));
        }
        entry.set(frame, Self::leaf_flags::<S>(flags));

        debug!("mapped {page:?} -> {frame:?} ({flags:?})");
        Ok(MapperFlush::new(page))
    }

    fn unmap(&mut self, page: VirtualPage<S>) -> Result<(PhysicalPage<S>, MapperFlush<S>), UnmapError> {
        let addr = page.start_address();
        let table = self.table_at_mut(addr, S::LEAF_LEVEL).map_err(|e| match e {
            PageTableWalkError::NotMapped => UnmapError::PageNotMapped,
            PageTableWalkError::MappedToHugePage => UnmapError::ParentEntryHugePage,
        })?;

        let entry = &mut table[addr.page_table_index(S::LEAF_LEVEL)];
        let flags = entry.flags();
        if !flags.contains(PageTableFlags::PRESENT) {
            return Err(UnmapError::PageNotMapped);
        }
        if flags.contains(PageTableFlags::HUGE_PAGE) != S::IS_HUGE {
            return Err(UnmapError::ParentEntryHugePage);
        }

        let frame = PhysicalPage::from_start_address(entry.address())
            .map_err(|_| UnmapError::InvalidFrameAddress(entry.address()))?;
        entry.set_unused();

        debug!("unmapped {page:?} (was {frame:?})");
        Ok((frame, MapperFlush::new(page)))
    }

    unsafe fn update_flags(
        &mut self,
        page: VirtualPage<S>,
        flags: PageTableFlags,
    ) -> Result<MapperFlush<S>, FlagUpdateError> {
        let addr = page.start_address();
        let table = self.table_at_mut(addr, S::LEAF_LEVEL).map_err(|e| match e {
            PageTableWalkError::NotMapped => FlagUpdateError::PageNotMapped,
            PageTableWalkError::MappedToHugePage => FlagUpdateError::ParentEntryHugePage,
        })?;

        let entry = &mut table[addr.page_table_index(S::LEAF_LEVEL)];
        if entry.is_unused() {
            return Err(FlagUpdateError::PageNotMapped);
        }
        if entry.flags().contains(PageTableFlags::HUGE_PAGE) != S::IS_HUGE {
            return Err(FlagUpdateError::ParentEntryHugePage);
        }
        entry.set_flags(Self::leaf_flags::<S>(flags));

        Ok(MapperFlush::new(page))
    }

    unsafe fn set_flags_p4_entry(
        &mut self,
        page: VirtualPage<S>,
        flags: PageTableFlags,
    ) -> Result<MapperFlushAll, FlagUpdateError> {
        self.set_parent_entry_flags(page, PageTableLevel::Four, flags)
    }

    unsafe fn set_flags_p3_entry(
        &mut self,
        page: VirtualPage<S>,
        flags: PageTableFlags,
    ) -> Result<MapperFlushAll, FlagUpdateError> {
        self.set_parent_entry_flags(page, PageTableLevel::Three, flags)
    }

    unsafe fn set_flags_p2_entry(
        &mut self,
        page: VirtualPage<S>,
        flags: PageTableFlags,
    ) -> Result<MapperFlushAll, FlagUpdateError> {
        self.set_parent_entry_flags(page, PageTableLevel::Two, flags)
    }

    fn translate_page(&self, page: VirtualPage<S>) -> Result<PhysicalPage<S>, TranslateError> {
        let addr = page.start_address();
        let table = self
            .table_at(addr, S::LEAF_LEVEL)
            .map_err(|_| TranslateError::NotMapped)?;

        let entry = &table[addr.page_table_index(S::LEAF_LEVEL)];
        let flags = entry.flags();
        if !flags.contains(PageTableFlags::PRESENT)
            || flags.contains(PageTableFlags::HUGE_PAGE) != S::IS_HUGE
        {
            return Err(TranslateError::NotMapped);
        }

        PhysicalPage::from_start_address(entry.address())
            .map_err(|_| TranslateError::InvalidFrameAddress(entry.address()))
    }
}

impl<L: PageTableLocator> Translate for MappedPageTable<'_, L> {
    fn translate(&self, addr: VirtualAddress) -> Result<TranslateResult, TranslateError> {
        let p4_entry = &self.level_4_table[addr.p4_index()];
        assert!(
            !p4_entry.flags().contains(PageTableFlags::HUGE_PAGE),
            "level 4 entry has HUGE_PAGE set"
        );

        let p3 = self
            .walker
            .next_table(p4_entry, addr, PageTableLevel::Three)
            .map_err(|_| TranslateError::NotMapped)?;
        let p3_entry = &p3[addr.p3_index()];
        if !p3_entry.flags().contains(PageTableFlags::PRESENT) {
            return Err(TranslateError::NotMapped);
        }
        if p3_entry.flags().contains(PageTableFlags::HUGE_PAGE) {
            let frame = PhysicalPage::<Size1G>::from_start_address(p3_entry.address())
                .map_err(|_| TranslateError::InvalidFrameAddress(p3_entry.address()))?;
            return Ok(TranslateResult {
                frame: MappedFrame::Size1G(frame),
                offset: addr.offset::<Size1G>(),
                flags: p3_entry.flags(),
            });
        }

        let p2 = self
            .walker
            .next_table(p3_entry, addr, PageTableLevel::Two)
            .map_err(|_| TranslateError::NotMapped)?;
        let p2_entry = &p2[addr.p2_index()];
        if !p2_entry.flags().contains(PageTableFlags::PRESENT) {
            return Err(TranslateError::NotMapped);
        }
        if p2_entry.flags().contains(PageTableFlags::HUGE_PAGE) {
            let frame = PhysicalPage::<Size2M>::from_start_address(p2_entry.address())
                .map_err(|_| TranslateError::InvalidFrameAddress(p2_entry.address()))?;
            return Ok(TranslateResult {
                frame: MappedFrame::Size2M(frame),
                offset: addr.offset::<Size2M>(),
                flags: p2_entry.flags(),
            });
        }

        let p1 = self
            .walker
            .next_table(p2_entry, addr, PageTableLevel::One)
            .map_err(|_| TranslateError::NotMapped)?;
        let p1_entry = &p1[addr.p1_index()];
        if !p1_entry.flags().contains(PageTableFlags::PRESENT) {
            return Err(TranslateError::NotMapped);
        }
        assert!(
            !p1_entry.flags().contains(PageTableFlags::HUGE_PAGE),
            "level 1 entry has HUGE_PAGE set"
        );

        let frame = PhysicalPage::<Size4K>::from_start_address(p1_entry.address())
            .map_err(|_| TranslateError::InvalidFrameAddress(p1_entry.address()))?;
        Ok(TranslateResult {
            frame: MappedFrame::Size4K(frame),
            offset: addr.offset::<Size4K>(),
            flags: p1_entry.flags(),
        })
    }
}

mod common;

use common::{BumpAlloc, TestPhys, map, phys, virt};
use kernel_memory_addresses::{PageSize, PhysicalAddress, Size1G, Size2M, Size4K, VirtualAddress};
use kernel_vmem::PageTableFlags;
use kernel_vmem::mapper::{
    FlagUpdateError, MapToError, MappedFrame, Mapper, Translate, TranslateError, UnmapError,
};

const RW: PageTableFlags = PageTableFlags::PRESENT.union(PageTableFlags::WRITABLE);

#[test]
fn map_2m_sets_huge_page_and_translates_with_offset() {
    let mut phys_mem = TestPhys::with_frames(8);
    let mut alloc = BumpAlloc::new(1, 8);
    let mut mapper = phys_mem.mapper();

    let page = virt::<Size2M>(0x20_0000);
    let frame = phys::<Size2M>(0x4000_0000);
    map(&mut mapper, page, frame, RW, &mut alloc);
    assert_eq!(alloc.allocated, 2, "PDPT and PD only");

    let result = mapper
        .translate(VirtualAddress::new(0x21_2345))
        .expect("translate");
    assert_eq!(result.frame, MappedFrame::Size2M(frame));
    assert_eq!(result.offset, 0x1_2345);
    assert_eq!(result.flags, RW | PageTableFlags::HUGE_PAGE);
    assert_eq!(
        mapper.translate_addr(VirtualAddress::new(0x3F_FFFF)),
        Some(PhysicalAddress::new(0x401F_FFFF))
    );

    assert_eq!(mapper.translate_page(page), Ok(frame));
    assert_eq!(
        mapper.translate_page(virt::<Size4K>(0x20_1000)),
        Err(TranslateError::NotMapped)
    );
}

#[test]
fn map_1g_translates_with_offset() {
    let mut phys_mem = TestPhys::with_frames(8);
    let mut alloc = BumpAlloc::new(1, 8);
    let mut mapper = phys_mem.mapper();

    let page = virt::<Size1G>(0x4000_0000);
    let frame = phys::<Size1G>(0x8000_0000);
    map(&mut mapper, page, frame, PageTableFlags::PRESENT, &mut alloc);
    assert_eq!(alloc.allocated, 1, "PDPT only");

    let result = mapper
        .translate(VirtualAddress::new(0x5234_5678))
        .expect("translate");
    assert_eq!(result.frame, MappedFrame::Size1G(frame));
    assert_eq!(result.frame.size(), Size1G::SIZE);
    assert_eq!(result.offset, 0x1234_5678);
    assert_eq!(result.address(), PhysicalAddress::new(0x9234_5678));

    let (unmapped, flush) = mapper.unmap(page).expect("unmap");
    flush.ignore();
    assert_eq!(unmapped, frame);
    assert_eq!(
        mapper.translate(VirtualAddress::new(0x5234_5678)),
        Err(TranslateError::NotMapped)
    );
}

#[test]
fn small_pages_below_a_huge_mapping_are_rejected() {
    let mut phys_mem = TestPhys::with_frames(8);
    let mut alloc = BumpAlloc::new(1, 8);
    let mut mapper = phys_mem.mapper();

    map(
        &mut mapper,
        virt::<Size2M>(0x20_0000),
        phys::<Size2M>(0x4000_0000),
        RW,
        &mut alloc,
    );

    let inner = virt::<Size4K>(0x20_1000);
    let err = unsafe { mapper.map_to(inner, phys::<Size4K>(0x1000), RW, &mut alloc) }
        .expect_err("a huge page covers it");
    assert_eq!(err, MapToError::ParentEntryHugePage);
    assert_eq!(mapper.unmap(inner), Err(UnmapError::ParentEntryHugePage));
    assert_eq!(
        unsafe { mapper.update_flags(inner, RW) }.map(|f| f.ignore()),
        Err(FlagUpdateError::ParentEntryHugePage)
    );

    // the huge mapping is untouched
    assert_eq!(
        mapper.translate_addr(VirtualAddress::new(0x20_1000)),
        Some(PhysicalAddress::new(0x4000_1000))
    );
}

#[test]
fn huge_operations_on_a_table_entry_are_rejected() {
    let mut phys_mem = TestPhys::with_frames(8);
    let mut alloc = BumpAlloc::new(1, 8);
    let mut mapper = phys_mem.mapper();

    map(
        &mut mapper,
        virt::<Size4K>(0x60_0000),
        phys::<Size4K>(0x1_0000),
        RW,
        &mut alloc,
    );

    let huge = virt::<Size2M>(0x60_0000);
    assert_eq!(mapper.unmap(huge), Err(UnmapError::ParentEntryHugePage));
    assert_eq!(mapper.translate_page(huge), Err(TranslateError::NotMapped));
    assert_eq!(
        unsafe { mapper.update_flags(huge, RW) }.map(|f| f.ignore()),
        Err(FlagUpdateError::ParentEntryHugePage)
    );

    let err = unsafe { mapper.map_to(huge, phys::<Size2M>(0x20_0000), RW, &mut alloc) }
        .expect_err("level 2 entry points at a table");
    assert!(matches!(err, MapToError::PageAlreadyMapped(_)));

    assert_eq!(
        mapper.translate_addr(VirtualAddress::new(0x60_0042)),
        Some(PhysicalAddress::new(0x1_0042))
    );
}

#[test]
fn update_flags_keeps_huge_page_bit() {
    let mut phys_mem = TestPhys::with_frames(8);
    let mut alloc = BumpAlloc::new(1, 8);
    let mut mapper = phys_mem.mapper();

    let page = virt::<Size2M>(0x20_0000);
    map(&mut mapper, page, phys::<Size2M>(0x4000_0000), RW, &mut alloc);

    let flush = unsafe { mapper.update_flags(page, PageTableFlags::PRESENT) }.expect("update");
    flush.ignore();

    let result = mapper.translate(page.start_address()).expect("translate");
    assert_eq!(
        result.flags,
        PageTableFlags::PRESENT | PageTableFlags::HUGE_PAGE
    );
    assert_eq!(mapper.translate_page(page), Ok(phys(0x4000_0000)));
}

#[test]
fn unmap_huge_page_leaves_tables_in_place() {
    let mut phys_mem = TestPhys::with_frames(8);
    let mut alloc = BumpAlloc::new(1, 8);
    let mut mapper = phys_mem.mapper();

    let page = virt::<Size2M>(0x20_0000);
    map(&mut mapper, page, phys::<Size2M>(0x4000_0000), RW, &mut alloc);

    let (frame, flush) = mapper.unmap(page).expect("unmap");
    flush.ignore();
    assert_eq!(frame, phys(0x4000_0000));
    assert_eq!(mapper.unmap(page), Err(UnmapError::PageNotMapped));

    // intermediate tables stay, so remapping needs no new frames
    map(&mut mapper, page, phys::<Size2M>(0x4020_0000), RW, &mut alloc);
    assert_eq!(alloc.allocated, 2);
}

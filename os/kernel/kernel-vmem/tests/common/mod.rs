#![allow(dead_code)]

use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K, VirtualAddress};
use kernel_vmem::mapper::OffsetPageTable;
use kernel_vmem::{FrameAllocator, FrameDeallocator, PageTable};

/// A 4 KiB-aligned raw frame. Used as the "physical RAM" backing store.
#[repr(C, align(4096))]
pub struct Aligned4K([u8; 4096]);

/// Simulated physical memory: frame `n` lives at physical address `n * 4096`,
/// and the whole vector is the direct map at `offset()`.
///
/// Frame 0 holds the level 4 table.
pub struct TestPhys {
    frames: Vec<Aligned4K>,
}

impl TestPhys {
    pub fn with_frames(n: usize) -> Self {
        let mut frames = Vec::with_capacity(n);
        for _ in 0..n {
            frames.push(Aligned4K([0; 4096]));
        }
        Self { frames }
    }

    pub fn offset(&mut self) -> VirtualAddress {
        VirtualAddress::from_ptr(self.frames.as_mut_ptr())
    }

    /// Mapper over the level 4 table in frame 0.
    pub fn mapper(&mut self) -> OffsetPageTable<'_> {
        let offset = self.offset();
        // SAFETY: frame 0 is owned by `self.frames` and outlives the borrow.
        let level_4 = unsafe { &mut *offset.as_mut_ptr::<PageTable>() };
        // SAFETY: every simulated frame is reachable at `offset + pa`.
        unsafe { OffsetPageTable::new(level_4, offset) }
    }
}

/// Hands out consecutive frames from `[next, end)`.
pub struct BumpAlloc {
    next: u64,
    end: u64,
    pub allocated: usize,
    pub freed: Vec<PhysicalPage<Size4K>>,
}

impl BumpAlloc {
    /// Frames `first..end` of a [`TestPhys`].
    pub fn new(first: u64, end: u64) -> Self {
        Self {
            next: first * 4096,
            end: end * 4096,
            allocated: 0,
            freed: Vec::new(),
        }
    }
}

unsafe impl FrameAllocator<Size4K> for BumpAlloc {
    fn allocate_frame(&mut self) -> Option<PhysicalPage<Size4K>> {
        if self.next + 4096 > self.end {
            return None;
        }
        let frame = PhysicalAddress::new(self.next).page();
        self.next += 4096;
        self.allocated += 1;
        Some(frame)
    }
}

impl FrameDeallocator<Size4K> for BumpAlloc {
    unsafe fn deallocate_frame(&mut self, frame: PhysicalPage<Size4K>) {
        self.freed.push(frame);
    }
}

pub fn phys<S: kernel_memory_addresses::PageSize>(v: u64) -> PhysicalPage<S> {
    PhysicalPage::from_start_address(PhysicalAddress::new(v)).expect("aligned frame")
}

pub fn virt<S: kernel_memory_addresses::PageSize>(
    v: u64,
) -> kernel_memory_addresses::VirtualPage<S> {
    kernel_memory_addresses::VirtualPage::from_start_address(VirtualAddress::new(v))
        .expect("aligned page")
}

/// Map `page` to `frame` and drop the flush token.
pub fn map<S: kernel_memory_addresses::PageSize>(
    mapper: &mut OffsetPageTable<'_>,
    page: kernel_memory_addresses::VirtualPage<S>,
    frame: PhysicalPage<S>,
    flags: kernel_vmem::PageTableFlags,
    alloc: &mut BumpAlloc,
) {
    use kernel_vmem::mapper::Mapper;
    let flush = unsafe { mapper.map_to(page, frame, flags, alloc) }.expect("map");
    flush.ignore();
}

// x86_64 virtual memory provider: stack arena plus cloned page tables
use core::ptr::addr_of_mut;

use x86_64::registers::control::Cr3;
use x86_64::structures::paging::PageTable;
use x86_64::VirtAddr;

use crate::config::{FRAME_SIZE, STACK_ARENA_PAGES};
use crate::memory::frame::FrameAllocator;
use crate::memory::vmm::{StackArena, StackRegion, VirtualMemory};
use crate::process::context::AddressSpace;

#[repr(C, align(4096))]
struct ArenaStorage([u8; STACK_ARENA_PAGES * FRAME_SIZE]);

static mut STACK_STORAGE: ArenaStorage = ArenaStorage([0; STACK_ARENA_PAGES * FRAME_SIZE]);

/// Process stacks come from a region inside the kernel image, so they are
/// mapped wherever the kernel is. Page-table roots are frames reached through
/// the bootloader's physical memory window.
pub struct KernelVmm {
    stacks: StackArena,
    physical_memory_offset: VirtAddr,
}

impl KernelVmm {
    /// A provider with no stacks until [`attach`](Self::attach) runs.
    pub const fn detached() -> Self {
        Self {
            // Safety: an empty arena never hands anything out.
            stacks: unsafe { StackArena::new(0, 0) },
            physical_memory_offset: VirtAddr::zero(),
        }
    }

    /// Hand the stack storage to the arena and record where the bootloader
    /// mapped physical memory.
    ///
    /// # Safety
    ///
    /// Must be called at most once, and `physical_memory_offset` must be where
    /// the bootloader mapped all of physical memory.
    pub unsafe fn attach(&mut self, physical_memory_offset: VirtAddr) {
        let base = addr_of_mut!(STACK_STORAGE) as usize;
        self.stacks = StackArena::new(base, STACK_ARENA_PAGES);
        self.physical_memory_offset = physical_memory_offset;
    }

    unsafe fn table_at(&self, physical: u64) -> &'static mut PageTable {
        let virt = self.physical_memory_offset + physical;
        &mut *virt.as_mut_ptr::<PageTable>()
    }
}

unsafe impl VirtualMemory for KernelVmm {
    fn allocate_stack(&mut self, pages: usize) -> Option<StackRegion> {
        self.stacks.allocate(pages)
    }

    fn release_stack(&mut self, region: StackRegion) {
        self.stacks.release(region);
    }

    /// Copy the active level-4 table into a fresh frame, so the new space
    /// shares every kernel mapping (stacks included) with the bootstrap one.
    fn create_address_space(&mut self, frames: &mut FrameAllocator) -> Option<AddressSpace> {
        let frame = frames.allocate()?;
        let (active, _) = Cr3::read();
        unsafe {
            let source = self.table_at(active.start_address().as_u64());
            let table = self.table_at(frame.start_address());
            table.zero();
            for (dst, src) in table.iter_mut().zip(source.iter()) {
                *dst = src.clone();
            }
        }
        Some(AddressSpace::new(frame.start_address()))
    }
}

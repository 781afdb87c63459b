// Virtual memory services consumed by process creation
use crate::config::FRAME_SIZE;
use crate::memory::frame::FrameAllocator;
use crate::process::context::AddressSpace;

/// A run of contiguous virtual pages handed out as a process stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackRegion {
    base: usize,
    pages: usize,
}

impl StackRegion {
    pub const fn base(&self) -> usize {
        self.base
    }

    pub const fn pages(&self) -> usize {
        self.pages
    }

    /// One past the highest byte of the region.
    pub const fn end(&self) -> usize {
        self.base + self.pages * FRAME_SIZE
    }
}

/// Provider of stacks and page-table roots for new processes.
///
/// # Safety
///
/// Every region returned by `allocate_stack` must be writable, exclusively owned
/// by the caller from then on, and mapped at the same address in the bootstrap
/// space and in every space returned by `create_address_space`.
pub unsafe trait VirtualMemory {
    /// Contiguous pages for a new stack, or `None` when none are left.
    fn allocate_stack(&mut self, pages: usize) -> Option<StackRegion>;

    /// Take back a stack that was never handed to a process.
    fn release_stack(&mut self, region: StackRegion);

    /// A fresh, non-zero page-table root. Backing frames come from `frames`.
    fn create_address_space(&mut self, frames: &mut FrameAllocator) -> Option<AddressSpace>;
}

/// Bump allocator over a fixed, page-aligned region reserved for stacks.
///
/// Processes are never torn down, so only the most recent region can be
/// given back, which covers a creation that fails after taking its stack.
pub struct StackArena {
    base: usize,
    pages: usize,
    next: usize,
}

impl StackArena {
    /// # Safety
    ///
    /// `[base, base + pages * FRAME_SIZE)` must be page aligned, writable and
    /// used by nothing but this arena for as long as handed-out stacks live.
    pub const unsafe fn new(base: usize, pages: usize) -> Self {
        Self {
            base,
            pages,
            next: 0,
        }
    }

    pub fn allocate(&mut self, pages: usize) -> Option<StackRegion> {
        if pages == 0 || pages > self.remaining_pages() {
            return None;
        }
        let region = StackRegion {
            base: self.base + self.next * FRAME_SIZE,
            pages,
        };
        self.next += pages;
        Some(region)
    }

    /// Return `region` if it is the last one handed out. Anything else is ignored.
    pub fn release(&mut self, region: StackRegion) {
        let top = self.base + self.next * FRAME_SIZE;
        if region.pages <= self.next && region.end() == top {
            self.next -= region.pages;
        }
    }

    pub fn remaining_pages(&self) -> usize {
        self.pages - self.next
    }
}

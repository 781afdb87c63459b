// Host doubles for the hardware collaborators
use crate::config::{FRAME_SIZE, STACK_PAGES};
use crate::memory::frame::FrameAllocator;
use crate::memory::vmm::{StackArena, StackRegion, VirtualMemory};
use crate::process::context::{AddressSpace, ContextSwitch, SavedContext};
use crate::timer::{TickCallback, Timer};

pub extern "C" fn idle_entry() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

pub fn noop_tick() {}

/// Records what the scheduler asks of the CPU instead of touching registers.
#[derive(Default)]
pub struct RecordingCpu {
    pub saves: usize,
    pub last_saved: usize,
    /// Stack pointer of every context restored, in order.
    pub restores: Vec<usize>,
    pub spaces: Vec<AddressSpace>,
}

impl ContextSwitch for RecordingCpu {
    fn save(&mut self, ctx: &mut SavedContext) {
        self.saves += 1;
        self.last_saved = 0xdead_0000 + self.saves * 0x10;
        ctx.stack_pointer = self.last_saved;
        ctx.frame_pointer = self.last_saved;
    }

    fn load_address_space(&mut self, space: AddressSpace) {
        self.spaces.push(space);
    }

    unsafe fn restore(&mut self, _from: *mut SavedContext, to: *const SavedContext) {
        self.restores.push((*to).stack_pointer);
    }
}

#[derive(Default)]
pub struct RecordingTimer {
    pub frequency: Option<u32>,
    pub callback: Option<TickCallback>,
}

impl Timer for RecordingTimer {
    fn set_frequency(&mut self, hz: u32) {
        self.frequency = Some(hz);
    }

    fn register_callback(&mut self, callback: TickCallback) {
        self.callback = Some(callback);
    }
}

#[repr(C, align(4096))]
struct Page([u8; FRAME_SIZE]);

/// Heap-backed stand-in for the kernel's virtual memory provider.
pub struct TestVmm {
    _pages: Vec<Page>,
    arena: StackArena,
    handed_out: Vec<StackRegion>,
    pub fail_stacks: bool,
    pub fail_spaces: bool,
}

impl TestVmm {
    /// Room for `stacks` process stacks.
    pub fn new(stacks: usize) -> Self {
        let mut pages: Vec<Page> = (0..stacks * STACK_PAGES)
            .map(|_| Page([0; FRAME_SIZE]))
            .collect();
        let base = pages.as_mut_ptr() as usize;
        // The pages live as long as the arena and are never reallocated.
        let arena = unsafe { StackArena::new(base, pages.len()) };
        Self {
            _pages: pages,
            arena,
            handed_out: Vec::new(),
            fail_stacks: false,
            fail_spaces: false,
        }
    }

    pub fn handed_out(&self) -> &[StackRegion] {
        &self.handed_out
    }
}

unsafe impl VirtualMemory for TestVmm {
    fn allocate_stack(&mut self, pages: usize) -> Option<StackRegion> {
        if self.fail_stacks {
            return None;
        }
        let region = self.arena.allocate(pages)?;
        self.handed_out.push(region);
        Some(region)
    }

    fn release_stack(&mut self, region: StackRegion) {
        self.handed_out.retain(|held| *held != region);
        self.arena.release(region);
    }

    fn create_address_space(&mut self, frames: &mut FrameAllocator) -> Option<AddressSpace> {
        if self.fail_spaces {
            return None;
        }
        frames
            .allocate()
            .map(|frame| AddressSpace::new(frame.start_address()))
    }
}

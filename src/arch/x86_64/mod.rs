// x86_64 platform: the kernel-state singleton and its hardware collaborators
pub mod context;
pub mod gdt;
pub mod interrupts;
pub mod paging;
pub mod pit;
pub mod serial;

use spin::Mutex;
use x86_64::instructions::interrupts as cpu_interrupts;
use x86_64::VirtAddr;

use crate::config::KernelConfig;
use crate::kernel::Kernel;
use crate::memory::frame::{Frame, FrameInitError};
use crate::process::pcb::{EntryPoint, ProcessId};
use crate::process::scheduler::SchedulerStats;

use self::context::X86_64Cpu;
use self::paging::KernelVmm;
use self::pit::Pit;

// Started in place: the bitmap and the table are too large to build on the
// boot stack and move.
static KERNEL: Mutex<Kernel<KernelVmm>> = Mutex::new(Kernel::new(KernelVmm::detached()));

/// Start the kernel state and the timer. Interrupts must still be off.
///
/// # Safety
///
/// Call once, with the offset at which the bootloader mapped physical memory.
pub unsafe fn init(
    config: KernelConfig,
    total_memory_bytes: usize,
    physical_memory_offset: VirtAddr,
) -> Result<(), FrameInitError> {
    cpu_interrupts::without_interrupts(|| {
        let mut kernel = KERNEL.lock();
        kernel.vmm_mut().attach(physical_memory_offset);
        kernel.start(config, total_memory_bytes, &mut Pit::new(), on_timer_tick)
    })
}

/// Create a process. Returns its pid, or 0 if it could not be created.
pub fn process_create(entry: EntryPoint, priority: u8) -> ProcessId {
    cpu_interrupts::without_interrupts(|| KERNEL.lock().process_create(entry, priority))
}

/// Lowest free physical frame, or `None` when memory is exhausted.
pub fn allocate_frame() -> Option<Frame> {
    cpu_interrupts::without_interrupts(|| KERNEL.lock().allocate_frame())
}

/// Return a frame. Freeing a free or unknown frame does nothing.
pub fn free_frame(frame: Frame) {
    cpu_interrupts::without_interrupts(|| KERNEL.lock().free_frame(frame))
}

pub fn scheduler_stats() -> SchedulerStats {
    cpu_interrupts::without_interrupts(|| KERNEL.lock().scheduler_stats())
}

/// Registered with the PIT; runs inside the timer interrupt with interrupts off.
fn on_timer_tick() {
    let switch = KERNEL.lock().tick(&mut X86_64Cpu);
    if let Some(switch) = switch {
        // Safety: the table lives inside the static KERNEL and never moves,
        // and interrupts stay masked until the incoming process returns from
        // its own interrupt frame or enables them at its entry point.
        unsafe { switch.resume(&mut X86_64Cpu) };
    }
}

pub fn hlt_loop() -> ! {
    loop {
        x86_64::instructions::hlt();
    }
}

// Kernel capacities and rates for the tsos kernel core

/// Size of one physical frame in bytes.
pub const FRAME_SIZE: usize = 4096;

/// Bits per bitmap word used by the frame allocator.
pub const BITS_PER_WORD: usize = 32;

/// Number of frames the allocator bitmap can track (1 GiB of physical memory).
pub const MAX_FRAMES: usize = 262_144;

/// Words needed for a bitmap of `MAX_FRAMES` bits.
pub const BITMAP_WORDS: usize = MAX_FRAMES / BITS_PER_WORD;

/// Slots in the process table. Slot 0 belongs to the idle process.
pub const MAX_PROCESSES: usize = 256;

/// Timer ticks a process runs before it is preempted.
pub const QUANTUM_TICKS: u32 = 10;

/// Timer interrupt rate: 100 Hz, one tick every 10 ms.
pub const TIMER_HZ: u32 = 100;

/// Pages in every process stack (8 KiB).
pub const STACK_PAGES: usize = 2;

/// Pages reserved for process stacks in the kernel image.
pub const STACK_ARENA_PAGES: usize = MAX_PROCESSES * STACK_PAGES;

/// Low physical memory covering the bootloader, page tables and kernel image.
pub const KERNEL_RESERVED_BYTES: usize = 16 * 1024 * 1024;

/// Boot-time settings, fixed for the lifetime of the system once the kernel is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Rate the periodic timer is programmed to.
    pub timer_hz: u32,
    /// Bytes at the bottom of physical memory that are never handed out.
    pub kernel_reserved_bytes: usize,
}

impl KernelConfig {
    pub const fn new() -> Self {
        Self {
            timer_hz: TIMER_HZ,
            kernel_reserved_bytes: KERNEL_RESERVED_BYTES,
        }
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new()
    }
}

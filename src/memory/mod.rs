// Memory Management for the tsos kernel core
pub mod frame;
pub mod map;
pub mod vmm;

pub use frame::{Frame, FrameAllocator, FrameInitError};
pub use map::{usable_bytes, MemoryRegion, RegionKind};
pub use vmm::{StackArena, StackRegion, VirtualMemory};

//! Resource-management core of a small preemptive kernel: a bitmap physical
//! frame allocator and a round-robin, quantum-driven process scheduler.
//!
//! The core is architecture neutral. Hardware only enters through the
//! [`ContextSwitch`](process::context::ContextSwitch),
//! [`VirtualMemory`](memory::vmm::VirtualMemory) and [`Timer`](timer::Timer)
//! traits, implemented for x86_64 under `arch::x86_64` when building the
//! kernel image.
#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_os = "none", feature(abi_x86_interrupt))]

pub mod config;
pub mod kernel;
pub mod logger;
pub mod memory;
pub mod process;
pub mod timer;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod arch;

#[cfg(test)]
mod testing;

pub use config::KernelConfig;
pub use kernel::Kernel;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub use arch::x86_64::{
    allocate_frame, free_frame, hlt_loop, init, process_create, scheduler_stats,
};

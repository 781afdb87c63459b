// Process Control Block (PCB) for the tsos kernel core
use core::fmt;

use crate::process::context::{AddressSpace, SavedContext};

/// Process ID type. Issued from a counter, never reused, independent of the slot.
pub type ProcessId = u64;

/// Pid of the idle process, and the value `process_create` reports on failure.
pub const IDLE_PID: ProcessId = 0;

/// Code a new process starts executing. It runs with interrupts masked until
/// it enables them itself, and must never return.
pub type EntryPoint = extern "C" fn() -> !;

/// Process state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Free,    // Slot unused
    Ready,   // Ready to run, waiting for CPU
    Running, // Currently executing
    // Reserved for wait/wake support. Nothing enters or leaves it yet, and the
    // scheduler never overwrites it.
    Blocked,
}

/// Process Control Block (PCB)
#[derive(Debug, Clone, Copy)]
pub struct ProcessControlBlock {
    pub pid: ProcessId,
    pub context: SavedContext,
    pub address_space: AddressSpace,
    pub state: ProcessState,
    /// Stored for callers, never consulted by the round-robin scan.
    pub priority: u8,
    /// Ticks left before forced preemption.
    pub quantum: u32,
}

impl ProcessControlBlock {
    pub const EMPTY: ProcessControlBlock = ProcessControlBlock {
        pid: IDLE_PID,
        context: SavedContext::initial(0, 0),
        address_space: AddressSpace::BOOTSTRAP,
        state: ProcessState::Free,
        priority: 0,
        quantum: 0,
    };

    pub fn is_free(&self) -> bool {
        self.state == ProcessState::Free
    }
}

/// Process management errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    TableFull,
    StackUnavailable,
    AddressSpaceUnavailable,
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProcessError::TableFull => write!(f, "No free process slot"),
            ProcessError::StackUnavailable => write!(f, "No memory for a process stack"),
            ProcessError::AddressSpaceUnavailable => write!(f, "No memory for an address space"),
        }
    }
}

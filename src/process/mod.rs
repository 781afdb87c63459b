// Process Management Module for the tsos kernel core
pub mod context;
pub mod pcb;
pub mod scheduler;
pub mod table;

pub use context::{AddressSpace, ContextSwitch, SavedContext, Switch};
pub use pcb::{
    EntryPoint, ProcessControlBlock, ProcessError, ProcessId, ProcessState, IDLE_PID,
};
pub use scheduler::{Scheduler, SchedulerStats};
pub use table::{ProcessTable, IDLE_SLOT};

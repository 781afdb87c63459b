// Kernel state: frame allocator, process table and scheduler, built once at boot
use crate::config::KernelConfig;
use crate::memory::frame::{Frame, FrameAllocator, FrameInitError};
use crate::memory::vmm::VirtualMemory;
use crate::process::context::{ContextSwitch, Switch};
use crate::process::pcb::{EntryPoint, ProcessError, ProcessId, IDLE_PID};
use crate::process::scheduler::{Scheduler, SchedulerStats};
use crate::process::table::ProcessTable;
use crate::timer::{TickCallback, Timer};

/// Everything the scheduling and allocation core owns.
///
/// Nothing works until [`Kernel::start`] (or [`Kernel::boot`]) has run every
/// initialization step once and in order.
pub struct Kernel<V> {
    config: KernelConfig,
    frames: FrameAllocator,
    processes: ProcessTable,
    scheduler: Scheduler,
    vmm: V,
}

impl<V> Kernel<V> {
    /// Inert kernel state: no memory, no processes, timer untouched.
    ///
    /// `const` so the state can live in a static and be started in place.
    pub const fn new(vmm: V) -> Self {
        Kernel {
            config: KernelConfig::new(),
            frames: FrameAllocator::new(),
            processes: ProcessTable::new(),
            scheduler: Scheduler::new(),
            vmm,
        }
    }
}

impl<V: VirtualMemory> Kernel<V> {
    /// Build and start kernel state in one go. See [`Kernel::start`].
    pub fn boot<T: Timer>(
        config: KernelConfig,
        total_memory_bytes: usize,
        vmm: V,
        timer: &mut T,
        on_tick: TickCallback,
    ) -> Result<Self, FrameInitError> {
        let mut kernel = Kernel::new(vmm);
        kernel.start(config, total_memory_bytes, timer, on_tick)?;
        Ok(kernel)
    }

    /// Size physical memory, reserve the kernel's own frames, install the idle
    /// process and start the timer. Runs once, before any other operation.
    pub fn start<T: Timer>(
        &mut self,
        config: KernelConfig,
        total_memory_bytes: usize,
        timer: &mut T,
        on_tick: TickCallback,
    ) -> Result<(), FrameInitError> {
        self.config = config;
        self.frames
            .init(total_memory_bytes, config.kernel_reserved_bytes)?;
        self.scheduler
            .init(&mut self.processes, timer, config.timer_hz, on_tick);
        Ok(())
    }

    /// Create a READY process, returning its pid or why it could not be made.
    pub fn try_process_create(
        &mut self,
        entry: EntryPoint,
        priority: u8,
    ) -> Result<ProcessId, ProcessError> {
        self.processes
            .create(entry, priority, &mut self.vmm, &mut self.frames)
            .map_err(|err| {
                log::warn!("process creation failed: {}", err);
                err
            })
    }

    /// Create a READY process. Returns 0 when no process could be created.
    pub fn process_create(&mut self, entry: EntryPoint, priority: u8) -> ProcessId {
        self.try_process_create(entry, priority).unwrap_or(IDLE_PID)
    }

    /// Timer tick. A returned switch must be resumed once `self` is unlocked.
    pub fn tick<C: ContextSwitch>(&mut self, cpu: &mut C) -> Option<Switch> {
        self.scheduler.tick(&mut self.processes, cpu)
    }

    /// Force a scheduling decision regardless of the running quantum.
    pub fn schedule<C: ContextSwitch>(&mut self, cpu: &mut C) -> Option<Switch> {
        self.scheduler.schedule(&mut self.processes, cpu)
    }

    pub fn allocate_frame(&mut self) -> Option<Frame> {
        self.frames.allocate()
    }

    pub fn free_frame(&mut self, frame: Frame) {
        self.frames.free(frame)
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn frames(&self) -> &FrameAllocator {
        &self.frames
    }

    pub fn vmm_mut(&mut self) -> &mut V {
        &mut self.vmm
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.processes
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats(&self.processes)
    }
}

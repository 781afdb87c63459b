// Process Scheduler for the tsos kernel core
use crate::config::QUANTUM_TICKS;
use crate::process::context::{ContextSwitch, Switch};
use crate::process::pcb::{ProcessId, ProcessState, IDLE_PID};
use crate::process::table::{ProcessTable, IDLE_SLOT};
use crate::timer::{TickCallback, Timer};

/// Quantum-based, round-robin preemptive scheduler over a [`ProcessTable`].
pub struct Scheduler {
    current: usize,
    timer_hz: u32,
    ticks: u64,
    switches: u64,
}

/// Scheduler statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    pub current_slot: usize,
    pub current_pid: ProcessId,
    pub quantum_remaining: u32,
    pub timer_hz: u32,
    pub ticks: u64,
    pub switches: u64,
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            current: IDLE_SLOT,
            timer_hz: 0,
            ticks: 0,
            switches: 0,
        }
    }

    /// Install the idle process as RUNNING in slot 0 and start the periodic timer.
    pub fn init<T: Timer>(
        &mut self,
        table: &mut ProcessTable,
        timer: &mut T,
        timer_hz: u32,
        on_tick: TickCallback,
    ) {
        let idle = table.slot_mut(IDLE_SLOT);
        idle.pid = IDLE_PID;
        idle.state = ProcessState::Running;
        idle.priority = 0;
        idle.quantum = QUANTUM_TICKS;
        self.current = IDLE_SLOT;
        self.timer_hz = timer_hz;

        timer.set_frequency(timer_hz);
        timer.register_callback(on_tick);
        log::info!(
            "scheduler: round robin, {} ticks per quantum at {} Hz",
            QUANTUM_TICKS,
            timer_hz
        );
    }

    /// Timer interrupt entry: charge the running process one tick and
    /// preempt it once its quantum is used up.
    pub fn tick<C: ContextSwitch>(
        &mut self,
        table: &mut ProcessTable,
        cpu: &mut C,
    ) -> Option<Switch> {
        self.ticks += 1;
        let running = table.slot_mut(self.current);
        if running.quantum > 0 {
            running.quantum -= 1;
        }
        if running.quantum == 0 {
            self.schedule(table, cpu)
        } else {
            None
        }
    }

    /// Pick the next READY slot after the current one, in circular slot order.
    ///
    /// Returns the switch to perform, or `None` when the current process keeps
    /// the CPU. Priority plays no part in the choice.
    pub fn schedule<C: ContextSwitch>(
        &mut self,
        table: &mut ProcessTable,
        cpu: &mut C,
    ) -> Option<Switch> {
        let current = self.current;

        // Saved before anything else is touched.
        let outgoing = table.slot_mut(current);
        cpu.save(&mut outgoing.context);
        if outgoing.state == ProcessState::Running {
            outgoing.state = ProcessState::Ready;
        }

        let capacity = table.capacity();
        let next = (1..=capacity)
            .map(|offset| (current + offset) % capacity)
            .find(|&slot| table.state(slot) == ProcessState::Ready);

        let next = match next {
            Some(next) => next,
            None => {
                log::trace!("slot {} not runnable and nothing else ready", current);
                return None;
            }
        };

        let incoming = table.slot_mut(next);
        incoming.state = ProcessState::Running;
        incoming.quantum = QUANTUM_TICKS;
        if next == current {
            // Alone on the CPU: it simply carries on.
            return None;
        }

        let space = incoming.address_space;
        let pid = incoming.pid;
        self.current = next;
        self.switches += 1;
        if !space.is_bootstrap() {
            cpu.load_address_space(space);
        }
        log::trace!("switch slot {} -> slot {} (pid {})", current, next, pid);
        Some(table.switch_between(current, next))
    }

    /// Slot presumed RUNNING.
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn stats(&self, table: &ProcessTable) -> SchedulerStats {
        let running = table.get(self.current);
        SchedulerStats {
            current_slot: self.current,
            current_pid: running.map_or(IDLE_PID, |pcb| pcb.pid),
            quantum_remaining: running.map_or(0, |pcb| pcb.quantum),
            timer_hz: self.timer_hz,
            ticks: self.ticks,
            switches: self.switches,
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::frame::FrameAllocator;
    use crate::testing::{idle_entry, noop_tick, RecordingCpu, RecordingTimer, TestVmm};

    struct Fixture {
        table: ProcessTable,
        scheduler: Scheduler,
        cpu: RecordingCpu,
    }

    fn fixture(processes: usize) -> Fixture {
        let mut table = ProcessTable::new();
        let mut scheduler = Scheduler::new();
        let mut timer = RecordingTimer::default();
        scheduler.init(&mut table, &mut timer, 100, noop_tick);

        let mut vmm = TestVmm::new(processes);
        let mut frames = FrameAllocator::new();
        frames.init(4 * 1024 * 1024, 64 * 1024).unwrap();
        for _ in 0..processes {
            table.create(idle_entry, 0, &mut vmm, &mut frames).unwrap();
        }
        Fixture {
            table,
            scheduler,
            cpu: RecordingCpu::default(),
        }
    }

    impl Fixture {
        fn schedule(&mut self) -> Option<usize> {
            self.scheduler
                .schedule(&mut self.table, &mut self.cpu)
                .map(|switch| {
                    let to = switch.to_slot();
                    unsafe { switch.resume(&mut self.cpu) };
                    to
                })
        }

        fn running(&self) -> Vec<usize> {
            self.table
                .iter()
                .filter(|(_, pcb)| pcb.state == ProcessState::Running)
                .map(|(slot, _)| slot)
                .collect()
        }
    }

    #[test]
    fn init_installs_running_idle_and_programs_timer() {
        let mut table = ProcessTable::new();
        let mut scheduler = Scheduler::new();
        let mut timer = RecordingTimer::default();
        scheduler.init(&mut table, &mut timer, 250, noop_tick);

        let idle = table.get(IDLE_SLOT).unwrap();
        assert_eq!(idle.state, ProcessState::Running);
        assert_eq!(idle.pid, IDLE_PID);
        assert_eq!(idle.quantum, QUANTUM_TICKS);
        assert_eq!(timer.frequency, Some(250));
        assert!(timer.callback.is_some());
        assert_eq!(scheduler.current(), IDLE_SLOT);
    }

    #[test]
    fn tick_only_preempts_on_exhausted_quantum() {
        let mut fx = fixture(1);
        for _ in 0..QUANTUM_TICKS - 1 {
            assert!(fx.scheduler.tick(&mut fx.table, &mut fx.cpu).is_none());
        }
        assert_eq!(fx.table.get(IDLE_SLOT).unwrap().quantum, 1);
        let switch = fx.scheduler.tick(&mut fx.table, &mut fx.cpu).unwrap();
        assert_eq!((switch.from_slot(), switch.to_slot()), (0, 1));
        unsafe { switch.resume(&mut fx.cpu) };
        assert_eq!(fx.scheduler.stats(&fx.table).ticks, u64::from(QUANTUM_TICKS));
    }

    #[test]
    fn preemption_demotes_and_promotes() {
        let mut fx = fixture(2);
        assert_eq!(fx.schedule(), Some(1));
        assert_eq!(fx.table.get(0).unwrap().state, ProcessState::Ready);
        assert_eq!(fx.table.get(1).unwrap().state, ProcessState::Running);
        assert_eq!(fx.table.get(1).unwrap().quantum, QUANTUM_TICKS);
        assert_eq!(fx.running(), vec![1]);
    }

    #[test]
    fn outgoing_context_is_saved_first() {
        let mut fx = fixture(1);
        fx.schedule();
        assert_eq!(fx.cpu.saves, 1);
        let saved = fx.table.get(0).unwrap().context;
        assert_eq!(saved.stack_pointer, fx.cpu.last_saved);
    }

    #[test]
    fn restore_targets_the_incoming_context() {
        let mut fx = fixture(1);
        let incoming = fx.table.get(1).unwrap().context.stack_pointer;
        fx.schedule();
        assert_eq!(fx.cpu.restores, vec![incoming]);
    }

    #[test]
    fn lone_process_keeps_running_without_a_restore() {
        let mut fx = fixture(0);
        assert_eq!(fx.schedule(), None);
        let idle = fx.table.get(IDLE_SLOT).unwrap();
        assert_eq!(idle.state, ProcessState::Running);
        assert_eq!(idle.quantum, QUANTUM_TICKS);
        assert!(fx.cpu.restores.is_empty());
        assert!(fx.cpu.spaces.is_empty());
        assert_eq!(fx.scheduler.stats(&fx.table).switches, 0);
    }

    #[test]
    fn blocked_current_is_left_alone() {
        let mut fx = fixture(0);
        fx.table.slot_mut(IDLE_SLOT).state = ProcessState::Blocked;
        assert_eq!(fx.schedule(), None);
        assert_eq!(fx.table.get(IDLE_SLOT).unwrap().state, ProcessState::Blocked);
        assert!(fx.cpu.restores.is_empty());
    }

    #[test]
    fn blocked_outgoing_is_not_demoted() {
        let mut fx = fixture(1);
        fx.table.slot_mut(IDLE_SLOT).state = ProcessState::Blocked;
        assert_eq!(fx.schedule(), Some(1));
        assert_eq!(fx.table.get(IDLE_SLOT).unwrap().state, ProcessState::Blocked);
        // With the idle process blocked, slot 1 is alone and stays put.
        assert_eq!(fx.schedule(), None);
        assert_eq!(fx.scheduler.current(), 1);
    }

    #[test]
    fn priority_does_not_change_the_order() {
        let mut fx = fixture(2);
        fx.table.slot_mut(2).priority = 255;
        assert_eq!(fx.schedule(), Some(1));
        assert_eq!(fx.schedule(), Some(2));
    }

    #[test]
    fn address_space_loaded_only_when_dedicated() {
        let mut fx = fixture(1);
        let space = fx.table.get(1).unwrap().address_space;
        assert_eq!(fx.schedule(), Some(1));
        assert_eq!(fx.cpu.spaces, vec![space]);
        // Back to idle, which shares the bootstrap space.
        assert_eq!(fx.schedule(), Some(0));
        assert_eq!(fx.cpu.spaces, vec![space]);
    }
}

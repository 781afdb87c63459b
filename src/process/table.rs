// Process Table for the tsos kernel core
use core::mem::size_of;

use crate::config::{MAX_PROCESSES, QUANTUM_TICKS, STACK_PAGES};
use crate::memory::frame::FrameAllocator;
use crate::memory::vmm::VirtualMemory;
use crate::process::context::{SavedContext, Switch};
use crate::process::pcb::{
    EntryPoint, ProcessControlBlock, ProcessError, ProcessId, ProcessState, IDLE_PID,
};

/// Slot permanently owned by the idle process.
pub const IDLE_SLOT: usize = 0;

/// Fixed-capacity registry of process control blocks.
pub struct ProcessTable {
    slots: [ProcessControlBlock; MAX_PROCESSES],
    next_pid: ProcessId,
}

impl ProcessTable {
    pub const fn new() -> Self {
        Self {
            slots: [ProcessControlBlock::EMPTY; MAX_PROCESSES],
            next_pid: IDLE_PID,
        }
    }

    /// Create a READY process that starts at `entry`.
    ///
    /// The stack and the address space are both obtained before the slot is
    /// touched, so a failure leaves the table exactly as it was. A stack taken
    /// for a creation that then fails goes back to `vmm`.
    pub fn create<V: VirtualMemory>(
        &mut self,
        entry: EntryPoint,
        priority: u8,
        vmm: &mut V,
        frames: &mut FrameAllocator,
    ) -> Result<ProcessId, ProcessError> {
        let slot = (IDLE_SLOT + 1..MAX_PROCESSES)
            .find(|&slot| self.slots[slot].is_free())
            .ok_or(ProcessError::TableFull)?;
        let stack = vmm
            .allocate_stack(STACK_PAGES)
            .ok_or(ProcessError::StackUnavailable)?;
        let address_space = match vmm.create_address_space(frames) {
            Some(space) => space,
            None => {
                vmm.release_stack(stack);
                return Err(ProcessError::AddressSpaceUnavailable);
            }
        };

        // [sp] holds the entry point, consumed by the first restore as its
        // return address; [sp + 8] is a null return address for the entry
        // frame itself, which keeps the stack ABI-aligned on entry.
        let stack_pointer = stack.end() - 2 * size_of::<usize>();
        // Safety: `VirtualMemory` guarantees the region is ours and writable.
        unsafe {
            let top = stack_pointer as *mut usize;
            top.write(entry as usize);
            top.add(1).write(0);
        }

        self.next_pid += 1;
        let pid = self.next_pid;
        self.slots[slot] = ProcessControlBlock {
            pid,
            context: SavedContext::initial(stack_pointer, entry as usize),
            address_space,
            state: ProcessState::Ready,
            priority,
            quantum: QUANTUM_TICKS,
        };

        log::debug!(
            "created process {} in slot {} (stack {:#x}, space {:#x})",
            pid,
            slot,
            stack.base(),
            address_space.root()
        );
        Ok(pid)
    }

    pub const fn capacity(&self) -> usize {
        MAX_PROCESSES
    }

    /// Number of occupied slots, the idle process included once it exists.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|pcb| !pcb.is_free()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, slot: usize) -> Option<&ProcessControlBlock> {
        self.slots.get(slot)
    }

    /// Slot holding `pid`, if any.
    pub fn find(&self, pid: ProcessId) -> Option<usize> {
        self.slots
            .iter()
            .position(|pcb| !pcb.is_free() && pcb.pid == pid)
    }

    /// Occupied slots with their PCBs, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ProcessControlBlock)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, pcb)| !pcb.is_free())
    }

    pub(crate) fn slot_mut(&mut self, slot: usize) -> &mut ProcessControlBlock {
        &mut self.slots[slot]
    }

    pub(crate) fn state(&self, slot: usize) -> ProcessState {
        self.slots[slot].state
    }

    /// Switch token between two slots of this table.
    pub(crate) fn switch_between(&mut self, from: usize, to: usize) -> Switch {
        let from_ctx: *mut SavedContext = &mut self.slots[from].context;
        let to_ctx: *const SavedContext = &self.slots[to].context;
        Switch::new(from_ctx, to_ctx, from, to)
    }
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{idle_entry, TestVmm};

    fn frames() -> FrameAllocator {
        let mut frames = FrameAllocator::new();
        frames.init(4 * 1024 * 1024, 64 * 1024).unwrap();
        frames
    }

    #[test]
    fn create_fills_the_first_free_slot_after_idle() {
        let mut table = ProcessTable::new();
        let mut vmm = TestVmm::new(8);
        let mut frames = frames();

        let pid = table.create(idle_entry, 3, &mut vmm, &mut frames).unwrap();
        assert_eq!(pid, 1);
        assert_eq!(table.find(pid), Some(1));
        let pcb = table.get(1).unwrap();
        assert_eq!(pcb.state, ProcessState::Ready);
        assert_eq!(pcb.priority, 3);
        assert_eq!(pcb.quantum, QUANTUM_TICKS);
        assert!(!pcb.address_space.is_bootstrap());
        assert!(table.get(IDLE_SLOT).unwrap().is_free());
    }

    #[test]
    fn new_stack_returns_into_the_entry_point() {
        let mut table = ProcessTable::new();
        let mut vmm = TestVmm::new(2);
        let mut frames = frames();

        table.create(idle_entry, 0, &mut vmm, &mut frames).unwrap();
        let ctx = table.get(1).unwrap().context;
        let stack = vmm.handed_out()[0];
        assert_eq!(ctx.stack_pointer, stack.end() - 16);
        assert_eq!(ctx.frame_pointer, ctx.stack_pointer);
        assert_eq!(ctx.instruction_pointer, idle_entry as usize);
        let words = ctx.stack_pointer as *const usize;
        unsafe {
            assert_eq!(*words, idle_entry as usize);
            assert_eq!(*words.add(1), 0);
        }
    }

    #[test]
    fn failed_stack_leaves_slot_free_and_pid_unused() {
        let mut table = ProcessTable::new();
        let mut vmm = TestVmm::new(2);
        let mut frames = frames();
        vmm.fail_stacks = true;

        assert_eq!(
            table.create(idle_entry, 0, &mut vmm, &mut frames),
            Err(ProcessError::StackUnavailable)
        );
        assert!(table.is_empty());

        vmm.fail_stacks = false;
        assert_eq!(table.create(idle_entry, 0, &mut vmm, &mut frames), Ok(1));
    }

    #[test]
    fn failed_address_space_leaves_slot_free() {
        let mut table = ProcessTable::new();
        let mut vmm = TestVmm::new(4);
        let mut frames = frames();
        vmm.fail_spaces = true;

        assert_eq!(
            table.create(idle_entry, 0, &mut vmm, &mut frames),
            Err(ProcessError::AddressSpaceUnavailable)
        );
        assert!(table.get(1).unwrap().is_free());
        assert!(vmm.handed_out().is_empty());
    }

    #[test]
    fn failed_address_space_does_not_cost_a_stack() {
        let mut table = ProcessTable::new();
        let mut vmm = TestVmm::new(2);
        let mut frames = frames();

        vmm.fail_spaces = true;
        assert_eq!(
            table.create(idle_entry, 0, &mut vmm, &mut frames),
            Err(ProcessError::AddressSpaceUnavailable)
        );

        vmm.fail_spaces = false;
        assert_eq!(table.create(idle_entry, 0, &mut vmm, &mut frames), Ok(1));
        assert_eq!(table.create(idle_entry, 0, &mut vmm, &mut frames), Ok(2));
        assert_eq!(
            table.create(idle_entry, 0, &mut vmm, &mut frames),
            Err(ProcessError::StackUnavailable)
        );
    }

    #[test]
    fn address_spaces_come_from_the_frame_allocator() {
        let mut table = ProcessTable::new();
        let mut vmm = TestVmm::new(4);
        let mut frames = frames();
        let used = frames.used_pages();

        table.create(idle_entry, 0, &mut vmm, &mut frames).unwrap();
        assert_eq!(frames.used_pages(), used + 1);
        let root = table.get(1).unwrap().address_space.root();
        assert!(frames.is_allocated(crate::memory::Frame::containing(root)));
    }

    #[test]
    fn iteration_skips_free_slots() {
        let mut table = ProcessTable::new();
        let mut vmm = TestVmm::new(8);
        let mut frames = frames();
        for _ in 0..3 {
            table.create(idle_entry, 0, &mut vmm, &mut frames).unwrap();
        }
        let slots: Vec<usize> = table.iter().map(|(slot, _)| slot).collect();
        assert_eq!(slots, vec![1, 2, 3]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.find(42), None);
    }
}

// Context Switching for the tsos kernel core
//
// The scheduler decides a switch while it holds the kernel state; the switch
// itself runs afterwards, once that state has been released, because the
// outgoing stack is suspended mid-function until the process is picked again.

/// Page-table root of a process. Zero means "share the bootstrap space".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct AddressSpace(u64);

impl AddressSpace {
    pub const BOOTSTRAP: AddressSpace = AddressSpace(0);

    pub const fn new(root: u64) -> Self {
        AddressSpace(root)
    }

    /// Physical address of the top-level page table.
    pub const fn root(self) -> u64 {
        self.0
    }

    pub const fn is_bootstrap(self) -> bool {
        self.0 == 0
    }
}

/// Registers that survive a preemption.
///
/// `instruction_pointer` is only filled in at creation; afterwards the resume
/// point lives on the process stack, where `stack_pointer` points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct SavedContext {
    pub stack_pointer: usize,
    pub frame_pointer: usize,
    pub instruction_pointer: usize,
    /// Remaining callee-saved registers (rbx, r12-r15 on x86_64).
    pub callee_saved: [usize; 5],
}

impl SavedContext {
    /// Context of a process that has never run: both pointers at `stack_pointer`.
    pub const fn initial(stack_pointer: usize, entry: usize) -> Self {
        Self {
            stack_pointer,
            frame_pointer: stack_pointer,
            instruction_pointer: entry,
            callee_saved: [0; 5],
        }
    }
}

/// Register-level save/restore for one architecture.
///
/// Callers keep interrupts masked from `save` until `restore` has returned.
pub trait ContextSwitch {
    /// Record the live stack and frame pointers into `ctx`.
    fn save(&mut self, ctx: &mut SavedContext);

    /// Load the page-table base register with `space`.
    fn load_address_space(&mut self, space: AddressSpace);

    /// Persist the exact resume point of the running code into `from` and
    /// continue wherever `to` was suspended. Returns once something switches
    /// back to `from`.
    ///
    /// # Safety
    ///
    /// Both contexts must stay at their addresses until `from` is resumed, and
    /// `to` must describe a stack that is mapped in the active address space.
    unsafe fn restore(&mut self, from: *mut SavedContext, to: *const SavedContext);
}

/// A switch chosen by the scheduler but not yet carried out.
#[must_use = "the outgoing context keeps running until the switch is resumed"]
#[derive(Debug)]
pub struct Switch {
    from: *mut SavedContext,
    to: *const SavedContext,
    from_slot: usize,
    to_slot: usize,
}

impl Switch {
    pub(crate) fn new(
        from: *mut SavedContext,
        to: *const SavedContext,
        from_slot: usize,
        to_slot: usize,
    ) -> Self {
        Self {
            from,
            to,
            from_slot,
            to_slot,
        }
    }

    pub fn from_slot(&self) -> usize {
        self.from_slot
    }

    pub fn to_slot(&self) -> usize {
        self.to_slot
    }

    /// Hand the CPU to the incoming process.
    ///
    /// # Safety
    ///
    /// The process table the switch was taken from must still be alive and
    /// unmoved, nothing may touch either context concurrently, and interrupts
    /// must stay masked until the incoming process re-enables them.
    pub unsafe fn resume<C: ContextSwitch>(self, cpu: &mut C) {
        cpu.restore(self.from, self.to)
    }
}

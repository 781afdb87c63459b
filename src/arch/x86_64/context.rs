// x86_64 register-level context switch
use core::arch::{asm, naked_asm};
use core::mem::offset_of;

use x86_64::registers::control::Cr3;
use x86_64::structures::paging::PhysFrame;
use x86_64::PhysAddr;

use crate::process::context::{AddressSpace, ContextSwitch, SavedContext};

/// The CPU this kernel runs on.
pub struct X86_64Cpu;

impl ContextSwitch for X86_64Cpu {
    fn save(&mut self, ctx: &mut SavedContext) {
        let (rsp, rbp): (usize, usize);
        unsafe {
            asm!(
                "mov {}, rsp",
                "mov {}, rbp",
                out(reg) rsp,
                out(reg) rbp,
                options(nomem, nostack, preserves_flags)
            );
        }
        ctx.stack_pointer = rsp;
        ctx.frame_pointer = rbp;
    }

    fn load_address_space(&mut self, space: AddressSpace) {
        let frame = PhysFrame::containing_address(PhysAddr::new(space.root()));
        let (_, flags) = Cr3::read();
        // Safety: every space handed out maps the kernel exactly like the
        // bootstrap space, so the code and stack in use stay reachable.
        unsafe { Cr3::write(frame, flags) };
    }

    unsafe fn restore(&mut self, from: *mut SavedContext, to: *const SavedContext) {
        switch_context(from, to);
    }
}

/// Store rsp, rbp and the other callee-saved registers into `from`, load them
/// from `to`, and `ret` on the new stack.
///
/// For a suspended process the `ret` lands right after its own call to this
/// routine; for a fresh one it pops the entry point planted at creation.
#[unsafe(naked)]
unsafe extern "sysv64" fn switch_context(from: *mut SavedContext, to: *const SavedContext) {
    naked_asm!(
        "mov [rdi + {sp}], rsp",
        "mov [rdi + {fp}], rbp",
        "mov [rdi + {cs}], rbx",
        "mov [rdi + {cs} + 8], r12",
        "mov [rdi + {cs} + 16], r13",
        "mov [rdi + {cs} + 24], r14",
        "mov [rdi + {cs} + 32], r15",
        "mov rsp, [rsi + {sp}]",
        "mov rbp, [rsi + {fp}]",
        "mov rbx, [rsi + {cs}]",
        "mov r12, [rsi + {cs} + 8]",
        "mov r13, [rsi + {cs} + 16]",
        "mov r14, [rsi + {cs} + 24]",
        "mov r15, [rsi + {cs} + 32]",
        "ret",
        sp = const offset_of!(SavedContext, stack_pointer),
        fp = const offset_of!(SavedContext, frame_pointer),
        cs = const offset_of!(SavedContext, callee_saved),
    );
}

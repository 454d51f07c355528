// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! x86-64 Context Switch
//!
//! A saved context is only a stack pointer. The callee-saved registers
//! live on the stack it points to, pushed in this order:
//!
//! ```text
//! high  [return address]
//!       rbp
//!       rbx
//!       r12
//!       r13
//!       r14
//!       r15   <- saved rsp
//! low
//! ```

use core::arch::global_asm;

use crate::process::KernelStack;

/// Callee-saved registers pushed by [`switch`]
const SAVED_REGS: usize = 6;

const WORD: usize = core::mem::size_of::<usize>();

/// Saved kernel context of a process or a CPU's scheduler loop
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    /// Stack pointer at the time of the switch
    pub rsp: usize,
}

global_asm!(
    ".global rustux_context_switch",
    "rustux_context_switch:",
    // rdi = old, rsi = new
    "push rbp",
    "push rbx",
    "push r12",
    "push r13",
    "push r14",
    "push r15",
    "mov [rdi], rsp",
    "mov rsp, [rsi]",
    "pop r15",
    "pop r14",
    "pop r13",
    "pop r12",
    "pop rbx",
    "pop rbp",
    "ret",
);

extern "C" {
    fn rustux_context_switch(old: *mut Context, new: *const Context);
}

/// Save the current context into `old` and resume `new`
///
/// # Safety
///
/// `new` must hold a context saved by this function or built by
/// [`first_run_layout`], on a stack that is still alive. `old` must stay
/// valid until something switches back to it.
#[inline]
pub unsafe fn switch(old: *mut Context, new: *const Context) {
    rustux_context_switch(old, new);
}

/// Build the first context of a process on `stack`
///
/// The first switch into it pops zeroed registers and returns into
/// `entry`, which sees `exit_to` as its own return address. `entry`
/// releases the table lock and `exit_to` restores the user trap frame.
pub fn first_run_layout(stack: &mut KernelStack, entry: usize, exit_to: usize) -> Context {
    let base = stack.base();
    let top = stack.top() & !0xf;
    let off = top - base;

    let mem = stack.as_mut_slice();
    mem[off - WORD..off].copy_from_slice(&exit_to.to_ne_bytes());
    mem[off - 2 * WORD..off - WORD].copy_from_slice(&entry.to_ne_bytes());
    let regs = off - (2 + SAVED_REGS) * WORD;
    mem[regs..off - 2 * WORD].fill(0);

    Context { rsp: base + regs }
}

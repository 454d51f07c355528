// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Collaborator traits
//!
//! The process core never touches hardware, page tables or the filesystem
//! directly. Everything it needs from the rest of the kernel goes through
//! the narrow traits below, bundled together as [`Machine`]:
//!
//! - **InterruptControl**: the calling CPU's interrupt-enable flag
//! - **ContextSwitch**: saved-context exchange
//! - **AddressSpaceOps**: create/duplicate/grow/destroy/install a user address space
//! - **FileOps**: reference-counted open files and directory handles
//! - **Console**: diagnostic text and the fatal halt

use core::fmt;

use crate::process::KernelStack;

/// Interrupt-enable flag of the calling CPU
///
/// Lock holders go through [`Kernel::push_off`](crate::kernel::Kernel::push_off)
/// and [`Kernel::pop_off`](crate::kernel::Kernel::pop_off), which nest.
pub trait InterruptControl {
    /// Whether interrupts are enabled on the calling CPU
    fn interrupts_enabled(&self) -> bool;

    /// Enable interrupts on the calling CPU
    fn enable_interrupts(&self);

    /// Disable interrupts on the calling CPU
    fn disable_interrupts(&self);

    /// Called by an idle scheduler pass before it retries
    fn idle(&self) {
        core::hint::spin_loop();
    }
}

/// Saved-context exchange between a CPU's scheduler loop and a process
pub trait ContextSwitch: InterruptControl {
    /// Saved callee-preserved machine state
    type Context: Default + Send;

    /// Save the running context into `old` and resume `new`.
    ///
    /// Returns when some other context later switches back into `old`.
    ///
    /// # Safety
    ///
    /// Both pointers must stay valid until the switch back. The caller holds
    /// the process-table lock; the implementation must not try to take it.
    unsafe fn switch(&self, old: *mut Self::Context, new: *const Self::Context);

    /// Lay out a context on `stack` whose first activation enters the
    /// first-run path ([`Kernel::fork_return`](crate::kernel::Kernel::fork_return))
    /// and then returns to user mode through the saved trap frame.
    fn first_run_context(&self, stack: &mut KernelStack) -> Self::Context;

    /// Index of the calling CPU
    fn cpu_id(&self) -> usize;
}

/// User register file saved at kernel entry
pub trait TrapFrame: Clone + Default + Send {
    /// Syscall number requested by user space
    fn syscall_number(&self) -> usize;

    /// Syscall argument `n`
    fn arg(&self, n: usize) -> usize;

    /// Value user space observes when the trap returns
    fn set_return(&mut self, value: isize);
}

/// User address-space collaborator
pub trait AddressSpaceOps {
    /// One process's address space
    type Space: Send;

    /// Create an empty user address space
    fn create(&self) -> Option<Self::Space>;

    /// Copy `image` to address zero of a fresh space; returns the mapped size
    fn load(&self, space: &mut Self::Space, image: &[u8]) -> Option<usize>;

    /// Duplicate the first `size` bytes of `space`
    fn duplicate(&self, space: &Self::Space, size: usize) -> Option<Self::Space>;

    /// Grow or shrink from `old_size` to `new_size`; returns the new size
    fn grow(&self, space: &mut Self::Space, old_size: usize, new_size: usize) -> Option<usize>;

    /// Release every page of `space`
    fn destroy(&self, space: Self::Space);

    /// Install `space` on the calling CPU with `kstack_top` as the kernel entry stack
    fn install(&self, space: &Self::Space, kstack_top: usize);

    /// Install the kernel-only address space on the calling CPU
    fn install_kernel(&self);
}

/// Open-file and directory-handle collaborator
pub trait FileOps {
    /// Reference-counted open file
    type File: Send;
    /// Reference-counted directory handle
    type Inode: Send;

    /// Take another reference to `file`
    fn dup(&self, file: &Self::File) -> Self::File;

    /// Drop one reference to `file`
    fn close(&self, file: Self::File);

    /// Take another reference to `inode`
    fn idup(&self, inode: &Self::Inode) -> Self::Inode;

    /// Drop one reference to `inode`
    fn iput(&self, inode: Self::Inode);
}

/// Diagnostic output
pub trait Console {
    /// Write text to the console
    fn write_str(&self, s: &str);

    /// Print `msg` and stop every CPU
    fn halt(&self, msg: fmt::Arguments<'_>) -> !;
}

/// Everything the process core needs from the surrounding kernel
pub trait Machine: ContextSwitch + AddressSpaceOps + FileOps + Console + Send + Sync {
    /// Saved user registers
    type Frame: TrapFrame;
}

/// `core::fmt::Write` adapter over a [`Console`]
pub struct ConsoleWriter<'a, C: Console + ?Sized>(pub &'a C);

impl<C: Console + ?Sized> fmt::Write for ConsoleWriter<'_, C> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_str(s);
        Ok(())
    }
}

// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Interrupt Nesting
//!
//! A lock the timer interrupt also takes must be held with interrupts off
//! on the holding CPU, or the handler spins on a lock its own CPU holds.
//! Turning interrupts off nests: each CPU counts its holders and remembers
//! whether interrupts were on before the outermost one. Only the last
//! holder to let go turns them back on.
//!
//! [`IrqMutexGuard`] pairs a [`SpinMutex`] guard with one level of nesting.
//! The mutex is released first, then the level is popped.

use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::kernel::Kernel;
use crate::sync::{SpinMutex, SpinMutexGuard};
use crate::traits::Machine;

/// ============================================================================
/// Per-CPU Nesting State
/// ============================================================================

/// Interrupt-disable depth of one CPU
///
/// Only its own CPU touches it, and only with interrupts off.
#[derive(Debug, Default)]
pub struct InterruptNesting {
    depth: AtomicU32,
    enabled_before: AtomicBool,
}

impl InterruptNesting {
    pub const fn new() -> Self {
        Self {
            depth: AtomicU32::new(0),
            enabled_before: AtomicBool::new(false),
        }
    }

    /// Holders that currently want interrupts off
    pub fn depth(&self) -> u32 {
        self.depth.load(Ordering::Relaxed)
    }

    /// Whether interrupts were on before the outermost holder
    pub fn enabled_before(&self) -> bool {
        self.enabled_before.load(Ordering::Relaxed)
    }

    pub(crate) fn set_enabled_before(&self, enabled: bool) {
        self.enabled_before.store(enabled, Ordering::Relaxed);
    }

    fn push(&self, was_enabled: bool) {
        if self.depth.fetch_add(1, Ordering::Relaxed) == 0 {
            self.set_enabled_before(was_enabled);
        }
    }

    /// `None` on underflow, otherwise whether interrupts go back on
    fn pop(&self) -> Option<bool> {
        let depth = self.depth();
        if depth == 0 {
            return None;
        }
        self.depth.store(depth - 1, Ordering::Relaxed);
        Some(depth == 1 && self.enabled_before())
    }
}

/// ============================================================================
/// Guards
/// ============================================================================

/// One level of interrupt nesting, popped on drop
pub struct InterruptsOff<'a, M: Machine> {
    kernel: &'a Kernel<M>,
}

impl<M: Machine> Drop for InterruptsOff<'_, M> {
    fn drop(&mut self) {
        self.kernel.pop_off();
    }
}

/// Spin-lock guard held with interrupts off
pub struct IrqMutexGuard<'a, M: Machine, T> {
    // Field order is drop order: unlock, then pop.
    guard: SpinMutexGuard<'a, T>,
    _off: InterruptsOff<'a, M>,
}

impl<M: Machine, T> Deref for IrqMutexGuard<'_, M, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<M: Machine, T> DerefMut for IrqMutexGuard<'_, M, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<M: Machine> Kernel<M> {
    /// Disable interrupts on the calling CPU, one nesting level deeper
    pub fn push_off(&self) {
        let was_enabled = self.machine().interrupts_enabled();
        self.machine().disable_interrupts();
        self.nesting(self.mycpu()).push(was_enabled);
    }

    /// Undo one [`push_off`](Self::push_off)
    ///
    /// Halts if interrupts were turned on underneath or nothing is pushed.
    pub fn pop_off(&self) {
        if self.machine().interrupts_enabled() {
            self.fatal(format_args!("pop_off interruptible"));
        }
        match self.nesting(self.mycpu()).pop() {
            Some(true) => self.machine().enable_interrupts(),
            Some(false) => {}
            None => self.fatal(format_args!("pop_off")),
        }
    }

    /// [`push_off`](Self::push_off) until the returned guard drops
    pub fn interrupts_off(&self) -> InterruptsOff<'_, M> {
        self.push_off();
        InterruptsOff { kernel: self }
    }

    /// Lock `lock` with interrupts off on the calling CPU
    pub fn lock_irq<'a, T>(&'a self, lock: &'a SpinMutex<T>) -> IrqMutexGuard<'a, M, T> {
        let off = self.interrupts_off();
        IrqMutexGuard {
            guard: lock.lock(),
            _off: off,
        }
    }

    /// Like [`lock_irq`](Self::lock_irq) but gives up if `lock` is taken
    pub fn try_lock_irq<'a, T>(&'a self, lock: &'a SpinMutex<T>) -> Option<IrqMutexGuard<'a, M, T>> {
        let off = self.interrupts_off();
        lock.try_lock().map(|guard| IrqMutexGuard { guard, _off: off })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockMachine;
    use crate::traits::InterruptControl;
    use core::mem::ManuallyDrop;

    #[test]
    fn test_nesting_restores_outermost_state() {
        let kernel = Kernel::new(MockMachine::new());
        kernel.machine().enable_interrupts();

        let outer = kernel.interrupts_off();
        assert!(!kernel.machine().interrupts_enabled());
        let inner = kernel.interrupts_off();
        assert_eq!(kernel.nesting(0).depth(), 2);

        drop(inner);
        assert!(!kernel.machine().interrupts_enabled());
        drop(outer);
        assert!(kernel.machine().interrupts_enabled());
        assert_eq!(kernel.nesting(0).depth(), 0);
    }

    #[test]
    fn test_disabled_before_stays_disabled() {
        let kernel = Kernel::new(MockMachine::new());
        drop(kernel.interrupts_off());
        assert!(!kernel.machine().interrupts_enabled());
    }

    #[test]
    fn test_depth_is_per_cpu() {
        let kernel = Kernel::new(MockMachine::new());
        let off = kernel.interrupts_off();
        kernel.machine().set_cpu(1);
        assert_eq!(kernel.nesting(1).depth(), 0);
        kernel.machine().set_cpu(0);
        assert_eq!(kernel.nesting(0).depth(), 1);
        drop(off);
    }

    #[test]
    fn test_lock_irq_holds_lock_and_interrupts() {
        let kernel = Kernel::new(MockMachine::new());
        let lock = SpinMutex::new(5u32);
        kernel.machine().enable_interrupts();

        let mut guard = kernel.lock_irq(&lock);
        *guard += 1;
        assert!(!kernel.machine().interrupts_enabled());
        assert!(lock.try_lock().is_none());
        assert!(kernel.try_lock_irq(&lock).is_none());
        assert_eq!(kernel.nesting(0).depth(), 1);

        drop(guard);
        assert_eq!(*lock.lock(), 6);
        assert!(kernel.machine().interrupts_enabled());
    }

    #[test]
    #[should_panic(expected = "pop_off")]
    fn test_pop_without_push_is_fatal() {
        let kernel = Kernel::new(MockMachine::new());
        kernel.pop_off();
    }

    #[test]
    #[should_panic(expected = "pop_off interruptible")]
    fn test_pop_with_interrupts_on_is_fatal() {
        let kernel = Kernel::new(MockMachine::new());
        let _off = ManuallyDrop::new(kernel.interrupts_off());
        kernel.machine().enable_interrupts();
        kernel.pop_off();
    }
}

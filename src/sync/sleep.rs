// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Sleep and Wakeup
//!
//! A process waits for a condition by sleeping on a [`Channel`] while
//! holding the lock that protects the condition. Wakeup scans the table
//! under the table lock, so a sleeper that switches the condition lock for
//! the table lock before checking out cannot miss a wakeup issued in
//! between.

use crate::kernel::{Kernel, TableGuard};
use crate::process::ProcState;
use crate::sync::{Channel, IrqMutexGuard, SpinMutex};
use crate::traits::Machine;

impl<M: Machine> Kernel<M> {
    /// Sleep on `chan`, atomically releasing `guard`
    ///
    /// Takes the table lock before dropping `guard`, then reacquires `lock`
    /// after waking. The condition must be rechecked by the caller.
    pub fn sleep<'a, T>(
        &'a self,
        chan: Channel,
        lock: &'a SpinMutex<T>,
        guard: IrqMutexGuard<'a, M, T>,
    ) -> IrqMutexGuard<'a, M, T> {
        let mut table = self.lock_table();
        drop(guard);

        self.sleep_locked(chan, &mut table);

        drop(table);
        self.lock_irq(lock)
    }

    /// Sleep on `chan` with the table lock already held
    ///
    /// The lock is held across the switch and is held again on return.
    pub(crate) fn sleep_locked(&self, chan: Channel, table: &mut TableGuard<'_, M>) {
        let slot = self.current_slot(table);
        self.check(table.transition(slot, ProcState::Running, ProcState::Sleeping));
        table.proc_mut(slot).chan = Some(chan);

        self.sched(table);

        table.proc_mut(slot).chan = None;
    }

    /// Make every process sleeping on `chan` RUNNABLE
    pub fn wakeup(&self, chan: Channel) {
        let woken = self.lock_table().wakeup1(chan);
        if woken > 0 {
            log::trace!("wakeup {:#x}: {} woken", chan.key(), woken);
        }
    }
}

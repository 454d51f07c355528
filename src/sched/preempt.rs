// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Preemption Accounting
//!
//! The timer interrupt is the only place a quantum expires. Each tick a
//! RUNNING process is charged against its tier's budget on this CPU and
//! against its own quantum; an expired quantum forces a yield.
//!
//! `last_run` is stamped with the tick being charged, so aging measures
//! waiting from the last tick a process actually ran. It is a timestamp,
//! not a count of charged ticks; the two readings drift apart as soon as a
//! process spends time off the CPU.
//!
//! # Kill checkpoints
//!
//! A killed process is never stopped mid-flight. It exits the next time it
//! passes one of these on its way back to user mode:
//!
//! - after a syscall ([`Kernel::syscall`](crate::kernel::Kernel::syscall))
//! - before and after quantum accounting in [`Kernel::timer_interrupt`]
//! - before blocking in `wait` or `sleep_ticks`, which fail instead

use crate::kernel::Kernel;
use crate::param::TIMEKEEPER_CPU;
use crate::process::{ProcState, ProcTable};
use crate::traits::Machine;

impl<C> ProcTable<C> {
    /// Charge one tick at `now` to whatever runs on `cpu`
    ///
    /// Returns `Some(true)` when the quantum of `quantum` ticks expired,
    /// `Some(false)` when it did not, `None` when nothing is running.
    pub fn charge_tick(&mut self, cpu: usize, now: u64, quantum: u32) -> Option<bool> {
        let slot = self.cpus[cpu].proc?;
        if self.proc(slot).state != ProcState::Running {
            return None;
        }

        let tier = self.proc(slot).timing.tier;
        self.cpus[cpu].charge(tier);

        let timing = &mut self.proc_mut(slot).timing;
        timing.ticks_used += 1;
        if timing.ticks_used >= quantum {
            timing.ticks_used = 0;
            Some(true)
        } else {
            timing.last_run = now;
            Some(false)
        }
    }
}

impl<M: Machine> Kernel<M> {
    /// Timer interrupt on the calling CPU
    ///
    /// `from_user` tells whether the interrupted code was in user mode;
    /// only then may a killed process be made to exit here.
    pub fn timer_interrupt(&self, from_user: bool) {
        let cpu = self.mycpu();
        if cpu == TIMEKEEPER_CPU {
            self.clock_tick();
            self.age();
        }

        self.kill_checkpoint(from_user);

        let expired = {
            let now = self.now();
            let quantum = self.config().quantum_ticks();
            self.lock_table().charge_tick(cpu, now, quantum)
        };
        if expired == Some(true) {
            log::trace!("cpu {}: quantum expired", cpu);
            self.yield_cpu();
        }

        self.kill_checkpoint(from_user);
    }

    /// Exit the calling process if it is killed and headed for user mode
    pub(crate) fn kill_checkpoint(&self, to_user: bool) {
        if !to_user {
            return;
        }
        let killed = {
            let table = self.lock_table();
            table.cpus[self.mycpu()].proc.is_some_and(|slot| table.proc(slot).killed())
        };
        if killed {
            self.exit();
        }
    }
}

// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Scheduler Core
//!
//! Every CPU runs [`Kernel::scheduler`] forever. One pass tries the tiers
//! in order, each only while its budget on this CPU is positive:
//!
//! 1. round robin, scanning on from the slot this CPU picked last
//! 2. shortest job first
//! 3. first come, first served
//!
//! A pass that finds nothing refills all three budgets and tries once more
//! before the CPU idles.
//!
//! # Table lock across the switch
//!
//! The scheduler holds the table lock when it switches into a process and
//! the process holds it when it switches back (from [`Kernel::sched`]).
//! The side that resumes releases it: the scheduler after its pass, a
//! returning process at the end of yield/sleep, a brand-new process in
//! [`Kernel::fork_return`]. No other CPU can observe a process whose
//! context is half saved.
//!
//! The lock keeps interrupts off, so the scheduler enables them between
//! passes. A process switching out must hold exactly that one level of
//! nesting; whether interrupts were on before it belongs to the process and
//! travels with it to whichever CPU resumes it.

use crate::kernel::{Kernel, TableGuard};
use crate::process::{Pid, ProcState};
use crate::sched::{first_come_first_serve, round_robin, shortest_job_first, Tier};
use crate::traits::Machine;

impl<M: Machine> Kernel<M> {
    /// Per-CPU scheduler loop; never returns
    pub fn scheduler(&self, cpu: usize) -> ! {
        log::info!("cpu {}: scheduler starting", cpu);
        loop {
            self.machine().enable_interrupts();
            if self.schedule_once(cpu).is_none() {
                self.machine().idle();
            }
        }
    }

    /// One scheduler pass on `cpu`
    ///
    /// Runs the selected process until it gives the CPU back and returns
    /// its pid. When no tier has a candidate the budgets are refilled and
    /// the pick retried; `None` means that failed too.
    pub fn schedule_once(&self, cpu: usize) -> Option<Pid> {
        let mut table = self.lock_table();

        let slot = match self.pick(&mut table, cpu) {
            Some(slot) => slot,
            None => {
                table.cpus[cpu].refill(self.config());
                log::trace!("cpu {}: budgets refilled", cpu);
                self.pick(&mut table, cpu)?
            }
        };

        let pid = table.proc(slot).pid;
        log::trace!(
            "cpu {}: dispatch pid {} ({})",
            cpu,
            pid,
            table.proc(slot).timing.tier
        );
        self.run(cpu, slot, &mut table);
        Some(pid)
    }

    /// Select the next slot for `cpu`
    fn pick(&self, table: &mut TableGuard<'_, M>, cpu: usize) -> Option<usize> {
        if table.cpus[cpu].budget(Tier::RoundRobin) > 0 {
            if let Some(slot) = round_robin(table.procs(), table.cpus[cpu].last_rr) {
                table.cpus[cpu].last_rr = slot;
                return Some(slot);
            }
        }

        if table.cpus[cpu].budget(Tier::ShortestJobFirst) > 0 {
            if let Some(slot) = shortest_job_first(table.procs(), self.rng(), self.now()) {
                return Some(slot);
            }
        }

        if table.cpus[cpu].budget(Tier::FirstComeFirstServe) > 0 {
            if let Some(slot) = first_come_first_serve(table.procs()) {
                return Some(slot);
            }
        }

        None
    }

    /// Switch `cpu` into `slot` until it gives the CPU back
    ///
    /// The table lock stays held across the switch.
    fn run(&self, cpu: usize, slot: usize, table: &mut TableGuard<'_, M>) {
        table.cpus[cpu].proc = Some(slot);
        {
            let owned = self.owned(slot);
            if let Some(space) = owned.space.as_ref() {
                self.machine().install(space, owned.kstack_top());
            }
        }
        self.check(table.transition(slot, ProcState::Runnable, ProcState::Running));

        let old = &mut table.cpus[cpu].scheduler as *mut M::Context;
        let new = &table.proc(slot).context as *const M::Context;
        // SAFETY: both contexts live in the table, which outlives the switch,
        // and the lock is held across it.
        unsafe { self.machine().switch(old, new) };

        self.machine().install_kernel();
        table.cpus[cpu].proc = None;
    }

    /// Return to this CPU's scheduler
    ///
    /// The caller holds the table lock and no other interrupt-off level,
    /// and has already moved the current process out of RUNNING. Halts
    /// otherwise, or if interrupts are on.
    pub(crate) fn sched(&self, table: &mut TableGuard<'_, M>) {
        let cpu = self.mycpu();
        let slot = self.current_slot(table);

        if self.nesting(cpu).depth() != 1 {
            self.fatal(format_args!("sched locks"));
        }
        if table.proc(slot).state == ProcState::Running {
            self.fatal(format_args!("sched running"));
        }
        if self.machine().interrupts_enabled() {
            self.fatal(format_args!("sched interruptible"));
        }

        let enabled_before = self.nesting(cpu).enabled_before();
        let old = &mut table.proc_mut(slot).context as *mut M::Context;
        let new = &table.cpus[cpu].scheduler as *const M::Context;
        // SAFETY: as in `run`; the scheduler context of `cpu` is only
        // touched by `cpu` itself.
        unsafe { self.machine().switch(old, new) };
        self.nesting(self.mycpu()).set_enabled_before(enabled_before);
    }

    /// Give up the CPU for one scheduling round
    pub fn yield_cpu(&self) {
        let mut table = self.lock_table();
        let slot = self.current_slot(&table);
        self.check(table.transition(slot, ProcState::Running, ProcState::Runnable));
        self.sched(&mut table);
    }

    /// First activation of a new process
    ///
    /// Its context was switched to by the scheduler with the table lock
    /// held; release it and its interrupt-off level before dropping to user
    /// mode.
    pub fn fork_return(&self) {
        // SAFETY: the scheduler that switched here still owns the lock and
        // never releases it on this path.
        unsafe { self.table_mutex().force_unlock() };
        self.pop_off();
    }
}

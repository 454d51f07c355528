// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel Instance
//!
//! [`Kernel`] ties the process table, the per-slot resources, the clock
//! and the collaborators together. Every lifecycle, scheduling and
//! sleep/wakeup entry point is a method on it, spread over the modules
//! that implement them.
//!
//! # Locks
//!
//! - `ptable`: the process-table lock, also guarding per-CPU state
//! - `owned[slot]`: a slot's exclusively owned resources
//! - the clock lock, inside [`Clock`]
//!
//! Order: clock, then table, then a slot. See [`crate::sync`]. The clock
//! and table locks are only taken through [`Kernel::lock_irq`], which keeps
//! interrupts off on the holding CPU.

use alloc::boxed::Box;
use core::fmt;

use crate::clock::Clock;
use crate::error::Violation;
use crate::param::{SchedConfig, NCPU, NPROC};
use crate::process::{OwnedResources, Pid, ProcState, ProcTable};
use crate::sched::{RandomSource, TickRandom, TimingInfo};
use crate::sync::{Channel, InterruptNesting, IrqMutexGuard, SpinMutex, SpinMutexGuard};
use crate::syscall::SyscallStats;
use crate::traits::{ContextSwitch, Machine};

/// Locked process table of a kernel running on `M`
pub type TableGuard<'a, M> = IrqMutexGuard<'a, M, ProcTable<<M as ContextSwitch>::Context>>;

/// One kernel instance
pub struct Kernel<M: Machine> {
    machine: M,
    config: SchedConfig,
    ptable: SpinMutex<ProcTable<M::Context>>,
    owned: [SpinMutex<OwnedResources<M>>; NPROC],
    clock: Clock,
    nesting: [InterruptNesting; NCPU],
    rng: Box<dyn RandomSource>,
    pub(crate) stats: SyscallStats,
}

impl<M: Machine> Kernel<M> {
    /// Kernel with the default configuration and the tick-derived random source
    pub fn new(machine: M) -> Self {
        Self::with_config(machine, SchedConfig::DEFAULT, Box::new(TickRandom))
    }

    /// Kernel with an explicit configuration and random source
    pub fn with_config(machine: M, config: SchedConfig, rng: Box<dyn RandomSource>) -> Self {
        Self {
            ptable: SpinMutex::new(ProcTable::new(&config)),
            owned: core::array::from_fn(|_| SpinMutex::new(OwnedResources::new())),
            clock: Clock::new(),
            nesting: core::array::from_fn(|_| InterruptNesting::new()),
            stats: SyscallStats::new(),
            machine,
            config,
            rng,
        }
    }

    /// The collaborators
    pub fn machine(&self) -> &M {
        &self.machine
    }

    /// Scheduling parameters
    pub fn config(&self) -> &SchedConfig {
        &self.config
    }

    /// The tick clock
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Current tick
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub(crate) fn rng(&self) -> &dyn RandomSource {
        self.rng.as_ref()
    }

    /// ========================================================================
    /// Fatal conditions
    /// ========================================================================

    /// Log `args` and halt every CPU
    pub fn fatal(&self, args: fmt::Arguments<'_>) -> ! {
        log::error!("fatal: {}", args);
        self.machine.halt(args)
    }

    /// Unwrap a table result, halting on a broken invariant
    pub(crate) fn check<T>(&self, result: Result<T, Violation>) -> T {
        match result {
            Ok(value) => value,
            Err(violation) => self.fatal(format_args!("{}", violation)),
        }
    }

    /// ========================================================================
    /// Locks
    /// ========================================================================

    pub(crate) fn lock_table(&self) -> TableGuard<'_, M> {
        self.lock_irq(&self.ptable)
    }

    pub(crate) fn try_lock_table(&self) -> Option<TableGuard<'_, M>> {
        self.try_lock_irq(&self.ptable)
    }

    pub(crate) fn table_mutex(&self) -> &SpinMutex<ProcTable<M::Context>> {
        &self.ptable
    }

    pub(crate) fn owned(&self, slot: usize) -> SpinMutexGuard<'_, OwnedResources<M>> {
        self.owned[slot].lock()
    }

    /// Interrupt nesting of `cpu`
    pub fn nesting(&self, cpu: usize) -> &InterruptNesting {
        &self.nesting[cpu]
    }

    /// Channel the process in `slot` sleeps on while waiting for children
    pub(crate) fn proc_channel(&self, slot: usize) -> Channel {
        Channel::of(&self.owned[slot])
    }

    /// ========================================================================
    /// Current CPU and process
    /// ========================================================================

    /// Index of the calling CPU
    pub fn mycpu(&self) -> usize {
        let cpu = self.machine.cpu_id();
        if cpu >= NCPU {
            self.fatal(format_args!("cpu id {} out of range", cpu));
        }
        cpu
    }

    /// Slot running on the calling CPU; halts if there is none
    pub(crate) fn current_slot(&self, table: &ProcTable<M::Context>) -> usize {
        self.check(table.current(self.mycpu()))
    }

    /// Pid of the process running on the calling CPU
    pub fn current_pid(&self) -> Option<Pid> {
        let table = self.lock_table();
        let slot = table.cpus[self.mycpu()].proc?;
        Some(table.proc(slot).pid)
    }

    /// Whether the calling process has been killed
    pub fn current_killed(&self) -> bool {
        let table = self.lock_table();
        let slot = self.current_slot(&table);
        table.proc(slot).killed()
    }

    /// ========================================================================
    /// Queries
    /// ========================================================================

    /// State of `pid`, if it is live
    pub fn state_of(&self, pid: Pid) -> Option<ProcState> {
        let table = self.lock_table();
        table.slot_of(pid).map(|slot| table.proc(slot).state)
    }

    /// Scheduling metadata of `pid`
    pub fn timing_of(&self, pid: Pid) -> Option<TimingInfo> {
        let table = self.lock_table();
        table.slot_of(pid).map(|slot| table.proc(slot).timing)
    }

    /// Parent of `pid`
    pub fn parent_of(&self, pid: Pid) -> Option<Pid> {
        let table = self.lock_table();
        let slot = table.slot_of(pid)?;
        table.proc(slot).parent.map(|link| link.pid)
    }

    /// Pid of the root process
    pub fn init_pid(&self) -> Option<Pid> {
        self.lock_table().init().map(|link| link.pid)
    }

    /// Remaining per-tier budgets of `cpu`
    pub fn budgets(&self, cpu: usize) -> [u32; 3] {
        self.lock_table().cpus[cpu].budgets
    }

    /// Number of live processes
    pub fn live_count(&self) -> usize {
        self.lock_table().live().count()
    }

    #[cfg(test)]
    pub(crate) fn with_table<R>(&self, f: impl FnOnce(&mut ProcTable<M::Context>) -> R) -> R {
        let mut table = self.lock_table();
        f(&mut *table)
    }
}

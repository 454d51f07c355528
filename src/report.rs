// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Diagnostic Reports
//!
//! Process listings and syscall usage, printed on the console. Each report
//! is formatted from a snapshot taken under the table lock and written
//! after the lock is released.

use alloc::string::String;
use core::fmt::Write;

use crate::error::{ProcError, ProcResult};
use crate::kernel::Kernel;
use crate::param::{MAX_SYSCALLS, NCPU};
use crate::process::Pid;
use crate::traits::{Console, Machine};

impl<M: Machine> Kernel<M> {
    fn emit(&self, text: &str) {
        Console::write_str(self.machine(), text);
    }

    /// Syscalls made by `pid`
    pub fn total_syscalls(&self, pid: Pid) -> Option<u64> {
        let table = self.lock_table();
        table.slot_of(pid).map(|slot| table.proc(slot).total_syscalls())
    }

    /// Print how often `pid` used each syscall number
    pub fn syscall_usage(&self, pid: Pid) -> ProcResult<()> {
        let mut out = String::new();
        {
            let table = self.lock_table();
            let slot = table.slot_of(pid).ok_or(ProcError::NotFound)?;
            let counts = &table.proc(slot).syscalls;
            for (num, count) in counts.iter().enumerate().skip(1) {
                let _ = writeln!(out, "\tSystem call number {}: {} usage", num, count);
            }
        }
        self.emit(&out);
        Ok(())
    }

    /// Print and return the syscall number `pid` used most, with its count
    ///
    /// Ties go to the lower number.
    pub fn most_invoked_syscall(&self, pid: Pid) -> ProcResult<(usize, u32)> {
        let (num, count) = {
            let table = self.lock_table();
            let slot = table.slot_of(pid).ok_or(ProcError::NotFound)?;
            let counts = &table.proc(slot).syscalls;
            (1..MAX_SYSCALLS).fold((0, 0), |(best, max), num| {
                if counts[num] > max {
                    (num, counts[num])
                } else {
                    (best, max)
                }
            })
        };

        let mut out = String::new();
        let _ = writeln!(
            out,
            "The most invoked system call is system call number {} with {} usage",
            num, count
        );
        self.emit(&out);
        Ok((num, count))
    }

    /// Print every live process with its syscall total
    ///
    /// Returns the number listed; fails with [`ProcError::NotFound`] when
    /// the table is empty.
    pub fn list_all_processes(&self) -> ProcResult<usize> {
        let mut out = String::new();
        let listed = {
            let table = self.lock_table();
            let mut listed = 0;
            for (_, p) in table.live() {
                let _ = writeln!(
                    out,
                    "Process with id {} and name {} has totally {} system calls",
                    p.pid,
                    p.name,
                    p.total_syscalls()
                );
                listed += 1;
            }
            listed
        };
        if listed == 0 {
            return Err(ProcError::NotFound);
        }
        self.emit(&out);
        Ok(listed)
    }

    /// Print per-CPU syscall counts, their sum and the global counter
    ///
    /// Returns `(sum over CPUs, global)`.
    pub fn print_syscall_totals(&self) -> (u64, u64) {
        let per_cpu: [u64; NCPU] = {
            let table = self.lock_table();
            core::array::from_fn(|cpu| table.cpus[cpu].syscalls)
        };
        let global = self.stats.total();

        let mut out = String::new();
        let mut sum = 0;
        for (cpu, &count) in per_cpu.iter().enumerate().filter(|&(_, &n)| n != 0) {
            let _ = writeln!(out, "number of syscalls for cpu {{{}}} is : {}", cpu, count);
            sum += count;
        }
        let _ = writeln!(out, "number of total syscalls for all cpus is (sum of cpus): {}", sum);
        let _ = writeln!(out, "number of total syscalls for all cpus is (global) : {}", global);
        self.emit(&out);
        (sum, global)
    }

    /// Print the scheduling state of every live process
    pub fn print_process_information(&self) {
        let now = self.now();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<16} {:>5} {:<8} {:<5} {:>6} {:>8} {:>8} {:>8} {:>10}",
            "name", "pid", "state", "tier", "burst", "waiting", "arrival", "last run", "confidence"
        );
        {
            let table = self.lock_table();
            for (_, p) in table.live() {
                let t = &p.timing;
                let _ = writeln!(
                    out,
                    "{:<16} {:>5} {:<8} {:<5} {:>6} {:>8} {:>8} {:>8} {:>10}",
                    p.name,
                    p.pid,
                    p.state,
                    t.tier,
                    t.burst,
                    t.waiting(now),
                    t.enter_tier,
                    t.last_run,
                    t.confidence
                );
            }
        }
        self.emit(&out);
    }

    /// Short listing of every live process, for a console debug key
    ///
    /// Never waits for the table lock, so it still works on a wedged machine.
    pub fn procdump(&self) {
        let mut out = String::new();
        match self.try_lock_table() {
            Some(table) => {
                for (_, p) in table.live() {
                    let _ = writeln!(out, "{} {} {}", p.pid, p.state, p.name);
                }
            }
            None => out.push_str("procdump: process table busy\n"),
        }
        self.emit(&out);
    }
}

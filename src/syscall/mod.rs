// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! System Call Interface
//!
//! Process-management syscalls. The number and arguments come from the
//! caller's saved trap frame and the result goes back into it.
//!
//! # Error Return Convention
//!
//! ```text
//! Success: zero or a positive value
//! Failure: -1
//! ```
//!
//! Numbers outside [`number`] belong to other kernel layers and fail here.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ProcError, ProcResult};
use crate::kernel::Kernel;
use crate::param::MAX_SYSCALLS;
use crate::process::Pid;
use crate::sched::Tier;
use crate::traits::{Machine, TrapFrame};

/// Syscall return type
pub type SyscallRet = isize;

/// Syscall numbers
pub mod number {
    pub const FORK: usize = 1;
    pub const EXIT: usize = 2;
    pub const WAIT: usize = 3;
    pub const KILL: usize = 6;
    pub const GETPID: usize = 11;
    pub const SBRK: usize = 12;
    pub const SLEEP: usize = 13;
    pub const UPTIME: usize = 14;
    pub const SORT_SYSCALLS: usize = 22;
    pub const GET_MOST_INVOKED_SYSCALL: usize = 23;
    pub const LIST_ALL_PROCESSES: usize = 24;
    pub const SET_BURST_CONFIDENCE: usize = 25;
    pub const CHANGE_QUEUE: usize = 26;
    pub const PRINT_PROCESS_INFORMATION: usize = 27;
    pub const GET_NUMBER_OF_TOTAL_SYSCALLS: usize = 28;
}

/// Convert a result to the value user space sees
#[inline]
pub fn to_ret(result: ProcResult<SyscallRet>) -> SyscallRet {
    result.unwrap_or_else(ProcError::sentinel)
}

/// Convert success value to return value
#[inline]
pub const fn ok_to_ret(val: usize) -> SyscallRet {
    val as SyscallRet
}

/// Kernel-wide syscall counter
pub struct SyscallStats {
    total: AtomicU64,
}

impl SyscallStats {
    pub const fn new() -> Self {
        Self { total: AtomicU64::new(0) }
    }

    /// Count one syscall
    pub fn record(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Syscalls made since boot
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

impl Default for SyscallStats {
    fn default() -> Self {
        Self::new()
    }
}

/// ============================================================================
/// Syscall Dispatcher
/// ============================================================================

impl<M: Machine> Kernel<M> {
    /// Handle the syscall saved in the caller's trap frame
    ///
    /// A killed caller exits instead of entering the call, and again
    /// instead of returning from it.
    pub fn syscall(&self) {
        self.kill_checkpoint(true);

        let (cpu, slot) = {
            let table = self.lock_table();
            let cpu = self.mycpu();
            (cpu, self.check(table.current(cpu)))
        };
        let (num, args) = {
            let owned = self.owned(slot);
            let frame = &owned.frame;
            (frame.syscall_number(), [frame.arg(0), frame.arg(1), frame.arg(2)])
        };
        self.count_syscall(cpu, slot, num);

        let ret = to_ret(self.dispatch(num, args));
        self.owned(slot).frame.set_return(ret);

        self.kill_checkpoint(true);
    }

    fn count_syscall(&self, cpu: usize, slot: usize, num: usize) {
        let mut table = self.lock_table();
        if let Some(count) = table.proc_mut(slot).syscalls.get_mut(num) {
            *count += 1;
        }
        table.cpus[cpu].syscalls += 1;
        self.stats.record();
    }

    fn dispatch(&self, num: usize, args: [usize; 3]) -> ProcResult<SyscallRet> {
        let pid = || narrow(args[0]).map(Pid);
        match num {
            number::FORK => self.fork().map(|child| ok_to_ret(child.0 as usize)),
            number::EXIT => self.exit(),
            number::WAIT => self.wait().map(|child| ok_to_ret(child.0 as usize)),
            number::KILL => self.kill(pid()?).map(|()| 0),
            number::GETPID => Ok(ok_to_ret(self.getpid().0 as usize)),
            number::SBRK => self.grow(args[0] as isize).map(ok_to_ret),
            number::SLEEP => self.sleep_ticks(args[0] as u64).map(|()| 0),
            number::UPTIME => Ok(ok_to_ret(self.uptime() as usize)),
            number::SORT_SYSCALLS => self.syscall_usage(pid()?).map(|()| 0),
            number::GET_MOST_INVOKED_SYSCALL => self.most_invoked_syscall(pid()?).map(|_| 0),
            number::LIST_ALL_PROCESSES => self.list_all_processes().map(|_| 0),
            number::SET_BURST_CONFIDENCE => self
                .set_burst_confidence(pid()?, narrow(args[1])?, narrow(args[2])?)
                .map(|()| 0),
            number::CHANGE_QUEUE => Tier::from_number(args[1])
                .ok_or(ProcError::InvalidArgument)
                .and_then(|tier| pid().and_then(|pid| self.change_tier(pid, tier)))
                .map(|()| 0),
            number::PRINT_PROCESS_INFORMATION => {
                self.print_process_information();
                Ok(0)
            }
            number::GET_NUMBER_OF_TOTAL_SYSCALLS => {
                self.print_syscall_totals();
                Ok(0)
            }
            _ => {
                log::warn!("syscall: unknown number {}", num);
                Err(ProcError::UnknownSyscall)
            }
        }
    }
}

/// A 32-bit argument; wider values are rejected rather than truncated
fn narrow(arg: usize) -> ProcResult<u32> {
    u32::try_from(arg).map_err(|_| ProcError::InvalidArgument)
}

const _: () = assert!(number::GET_NUMBER_OF_TOTAL_SYSCALLS < MAX_SYSCALLS);

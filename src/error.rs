// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Recoverable process-management errors
//!
//! Invariant violations are not errors: they halt the machine through
//! [`Kernel::fatal`](crate::kernel::Kernel::fatal).

use core::fmt;

use crate::process::{Pid, ProcState};

/// Result type of the lifecycle and scheduling calls
pub type ProcResult<T> = Result<T, ProcError>;

/// Failure reported back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcError {
    /// Every process slot is in use
    NoFreeSlot,
    /// Kernel stack or address space allocation failed
    OutOfMemory,
    /// The caller has no children to wait for
    NoChildren,
    /// The caller was killed while waiting
    Killed,
    /// No live process has the given pid
    NotFound,
    /// An argument is outside its allowed range
    InvalidArgument,
    /// The syscall number is not handled here
    UnknownSyscall,
}

impl ProcError {
    /// Sentinel handed back to user space
    pub const fn sentinel(self) -> isize {
        -1
    }
}

/// Broken process-table invariant
///
/// Table operations report these instead of halting so the table can be
/// exercised on its own; the kernel turns every one into a fatal stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// State change outside the legal lifecycle
    IllegalTransition { pid: Pid, from: ProcState, to: ProcState },
    /// A slot was recycled under a stale reference
    SlotMismatch { slot: usize, expected: Pid, found: Pid },
    /// The CPU has no current process
    NoCurrentProcess { cpu: usize },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalTransition { pid, from, to } => {
                write!(f, "illegal transition for pid {}: {} -> {}", pid, from, to)
            }
            Self::SlotMismatch { slot, expected, found } => {
                write!(f, "slot id mismatch at {}: expected pid {}, found {}", slot, expected, found)
            }
            Self::NoCurrentProcess { cpu } => write!(f, "no process on cpu {}", cpu),
        }
    }
}

impl fmt::Display for ProcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NoFreeSlot => "process table full",
            Self::OutOfMemory => "out of memory",
            Self::NoChildren => "no children",
            Self::Killed => "killed",
            Self::NotFound => "no such process",
            Self::InvalidArgument => "invalid argument",
            Self::UnknownSyscall => "unknown syscall",
        };
        f.write_str(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_display() {
        assert_eq!(ProcError::NoChildren.to_string(), "no children");
        assert_eq!(ProcError::NoFreeSlot.to_string(), "process table full");
    }

    #[test]
    fn test_sentinel() {
        assert_eq!(ProcError::Killed.sentinel(), -1);
        assert_eq!(ProcError::NotFound.sentinel(), -1);
    }

    #[test]
    fn test_violation_display() {
        let v = Violation::SlotMismatch { slot: 3, expected: Pid(7), found: Pid(9) };
        assert_eq!(v.to_string(), "slot id mismatch at 3: expected pid 7, found 9");

        let v = Violation::IllegalTransition {
            pid: Pid(4),
            from: ProcState::Zombie,
            to: ProcState::Running,
        };
        assert_eq!(v.to_string(), "illegal transition for pid 4: zombie -> run");
    }
}

// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Process Management
//!
//! Process identity, the lifecycle state machine and the process table.
//!
//! # Lifecycle
//!
//! ```text
//! UNUSED -> EMBRYO -> RUNNABLE -> RUNNING -> { RUNNABLE, SLEEPING, ZOMBIE }
//!                     SLEEPING -> RUNNABLE
//!                     ZOMBIE   -> UNUSED     (reaped by the parent's wait)
//! ```
//!
//! Every other edge is a fatal kernel condition.

pub mod lifecycle;
pub mod stack;
pub mod table;

pub use stack::KernelStack;
pub use table::{OwnedResources, Proc, ProcTable};

use core::fmt;

use bitflags::bitflags;

/// ============================================================================
/// Process Identity
/// ============================================================================

/// Process ID
///
/// Never zero for a live process. Ids grow monotonically, so an id is not
/// handed out again while anything could still observe the old process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pid(pub u32);

impl Pid {
    /// Id of an UNUSED slot
    pub const NONE: Self = Self(0);

    /// Whether this id names a process
    pub const fn is_some(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Weak link to another process: its slot plus the pid it had when linked
///
/// Resolving the link re-checks the pid, so a slot recycled under a stale
/// link is caught instead of followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcRef {
    pub slot: usize,
    pub pid: Pid,
}

/// ============================================================================
/// Process State
/// ============================================================================

/// Process state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcState {
    /// Free slot
    #[default]
    Unused,
    /// Claimed, not yet runnable
    Embryo,
    /// Blocked on a channel
    Sleeping,
    /// Ready to be picked by a scheduler
    Runnable,
    /// Executing on exactly one CPU
    Running,
    /// Exited, waiting to be reaped
    Zombie,
}

impl ProcState {
    /// Whether `self -> to` is a legal lifecycle edge
    pub const fn can_transition(self, to: Self) -> bool {
        use ProcState::*;
        matches!(
            (self, to),
            (Unused, Embryo)
                | (Embryo, Runnable)
                | (Runnable, Running)
                | (Running, Runnable)
                | (Running, Sleeping)
                | (Running, Zombie)
                | (Sleeping, Runnable)
                | (Zombie, Unused)
        )
    }

    /// Whether the slot holds a process
    pub const fn is_live(self) -> bool {
        !matches!(self, Self::Unused)
    }

    /// Short name used by the process listings
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unused => "unused",
            Self::Embryo => "embryo",
            Self::Sleeping => "sleep",
            Self::Runnable => "runble",
            Self::Running => "run",
            Self::Zombie => "zombie",
        }
    }
}

impl fmt::Display for ProcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

bitflags! {
    /// Per-process flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ProcFlags: u32 {
        /// Terminate at the next checkpoint
        const KILLED = 1 << 0;
        /// The root process; adopts orphans and never exits
        const INIT = 1 << 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ProcState; 6] = [
        ProcState::Unused,
        ProcState::Embryo,
        ProcState::Sleeping,
        ProcState::Runnable,
        ProcState::Running,
        ProcState::Zombie,
    ];

    #[test]
    fn test_legal_edges() {
        assert!(ProcState::Unused.can_transition(ProcState::Embryo));
        assert!(ProcState::Embryo.can_transition(ProcState::Runnable));
        assert!(ProcState::Running.can_transition(ProcState::Sleeping));
        assert!(ProcState::Sleeping.can_transition(ProcState::Runnable));
        assert!(ProcState::Zombie.can_transition(ProcState::Unused));
    }

    #[test]
    fn test_edge_count() {
        let legal = ALL
            .iter()
            .flat_map(|&from| ALL.iter().map(move |&to| (from, to)))
            .filter(|&(from, to)| from.can_transition(to))
            .count();
        assert_eq!(legal, 8);
    }

    #[test]
    fn test_illegal_edges() {
        assert!(!ProcState::Sleeping.can_transition(ProcState::Running));
        assert!(!ProcState::Zombie.can_transition(ProcState::Runnable));
        assert!(!ProcState::Runnable.can_transition(ProcState::Zombie));
        assert!(!ProcState::Embryo.can_transition(ProcState::Unused));
        assert!(!ProcState::Running.can_transition(ProcState::Running));
    }

    #[test]
    fn test_pid() {
        assert!(!Pid::NONE.is_some());
        assert!(Pid(1).is_some());
        assert_eq!(format!("{}", Pid(42)), "42");
    }

    #[test]
    fn test_state_names_pad() {
        assert_eq!(format!("{:6}|", ProcState::Running), "run   |");
        assert_eq!(ProcState::Runnable.name(), "runble");
    }

    #[test]
    fn test_flags() {
        let mut flags = ProcFlags::empty();
        flags.insert(ProcFlags::KILLED);
        assert!(flags.contains(ProcFlags::KILLED));
        assert!(!flags.contains(ProcFlags::INIT));
    }
}

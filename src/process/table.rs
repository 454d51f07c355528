// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Process Table
//!
//! A fixed arena of [`NPROC`] process slots plus the per-CPU scheduler
//! state. The whole table sits behind one lock owned by the
//! [`Kernel`](crate::kernel::Kernel); holding `&mut ProcTable` means holding
//! that lock.
//!
//! Resources only the process itself uses (address space, open files,
//! kernel stack, trap frame) live next to the table in
//! [`OwnedResources`], one lock per slot.

use alloc::string::String;

use crate::error::Violation;
use crate::param::{SchedConfig, MAX_SYSCALLS, NCPU, NOFILE, NPROC};
use crate::process::{KernelStack, Pid, ProcFlags, ProcRef, ProcState};
use crate::sched::{Cpu, Tier, TimingInfo};
use crate::sync::Channel;
use crate::traits::Machine;

/// ============================================================================
/// Process Slot
/// ============================================================================

/// One process slot
///
/// Guarded by the table lock, except `context` which the process itself
/// owns while it is RUNNING.
pub struct Proc<C> {
    /// Process ID, [`Pid::NONE`] when UNUSED
    pub pid: Pid,
    /// Lifecycle state
    pub state: ProcState,
    /// Weak link to the parent; none for the root and for free slots
    pub parent: Option<ProcRef>,
    /// Killed and root flags
    pub flags: ProcFlags,
    /// Channel slept on, set only while SLEEPING
    pub chan: Option<Channel>,
    /// Saved kernel context
    pub context: C,
    /// Scheduling metadata
    pub timing: TimingInfo,
    /// Name, for debugging
    pub name: String,
    /// Invocations per syscall number
    pub syscalls: [u32; MAX_SYSCALLS],
}

impl<C: Default> Proc<C> {
    fn unused() -> Self {
        Self {
            pid: Pid::NONE,
            state: ProcState::Unused,
            parent: None,
            flags: ProcFlags::empty(),
            chan: None,
            context: C::default(),
            timing: TimingInfo::EMPTY,
            name: String::new(),
            syscalls: [0; MAX_SYSCALLS],
        }
    }
}

impl<C> Proc<C> {
    /// Whether the kill flag is set
    pub fn killed(&self) -> bool {
        self.flags.contains(ProcFlags::KILLED)
    }

    /// Whether the scheduler may pick this slot for `tier`
    pub fn is_candidate(&self, tier: Tier) -> bool {
        self.state == ProcState::Runnable && self.timing.tier == tier
    }

    /// Total syscalls made by this process
    pub fn total_syscalls(&self) -> u64 {
        self.syscalls.iter().map(|&n| u64::from(n)).sum()
    }
}

/// ============================================================================
/// Process Table
/// ============================================================================

/// Process slots and per-CPU state under the table lock
pub struct ProcTable<C> {
    procs: [Proc<C>; NPROC],
    /// Per-CPU scheduler state
    pub cpus: [Cpu<C>; NCPU],
    next_pid: u32,
    init: Option<ProcRef>,
}

impl<C: Default> ProcTable<C> {
    /// Empty table with idle CPUs
    pub fn new(config: &SchedConfig) -> Self {
        Self {
            procs: core::array::from_fn(|_| Proc::unused()),
            cpus: core::array::from_fn(|_| Cpu::new(config)),
            next_pid: 1,
            init: None,
        }
    }

    /// Claim the first UNUSED slot as an EMBRYO created at tick `now`
    ///
    /// Assigns the next pid, zeroes the syscall counters and resets the
    /// timing info. Returns `None` when every slot is taken.
    pub fn claim(&mut self, now: u64, config: &SchedConfig) -> Option<(usize, Pid)> {
        let slot = self.procs.iter().position(|p| p.state == ProcState::Unused)?;
        let pid = Pid(self.next_pid);
        self.next_pid += 1;

        let p = &mut self.procs[slot];
        p.state = ProcState::Embryo;
        p.pid = pid;
        p.parent = None;
        p.flags = ProcFlags::empty();
        p.chan = None;
        p.context = C::default();
        p.timing = TimingInfo::new(now, config);
        p.name.clear();
        p.syscalls = [0; MAX_SYSCALLS];
        Some((slot, pid))
    }

    /// Return a reaped ZOMBIE slot to UNUSED and clear its identity
    pub fn release(&mut self, slot: usize) -> Result<(), Violation> {
        self.set_state(slot, ProcState::Unused)?;
        let p = &mut self.procs[slot];
        p.pid = Pid::NONE;
        p.parent = None;
        p.flags = ProcFlags::empty();
        p.chan = None;
        p.context = C::default();
        p.name.clear();
        Ok(())
    }
}

impl<C> ProcTable<C> {
    /// Slot `slot`
    pub fn proc(&self, slot: usize) -> &Proc<C> {
        &self.procs[slot]
    }

    /// Slot `slot`, mutably
    pub fn proc_mut(&mut self, slot: usize) -> &mut Proc<C> {
        &mut self.procs[slot]
    }

    /// Every slot, in scan order
    pub fn procs(&self) -> &[Proc<C>] {
        &self.procs
    }

    /// Every live slot with its index
    pub fn live(&self) -> impl Iterator<Item = (usize, &Proc<C>)> {
        self.procs.iter().enumerate().filter(|(_, p)| p.state.is_live())
    }

    /// Slot of the live process `pid`
    pub fn slot_of(&self, pid: Pid) -> Option<usize> {
        if !pid.is_some() {
            return None;
        }
        self.procs.iter().position(|p| p.pid == pid && p.state.is_live())
    }

    /// Weak reference to the process in `slot`
    pub fn ref_of(&self, slot: usize) -> ProcRef {
        ProcRef { slot, pid: self.procs[slot].pid }
    }

    /// Follow a weak reference
    pub fn resolve(&self, link: ProcRef) -> Result<usize, Violation> {
        let found = self.procs[link.slot].pid;
        if found != link.pid {
            return Err(Violation::SlotMismatch { slot: link.slot, expected: link.pid, found });
        }
        Ok(link.slot)
    }

    /// Give an EMBRYO slot back after a failed allocation
    ///
    /// The only way back to UNUSED besides reaping; the slot never became
    /// visible to anyone but its allocator.
    pub fn abandon(&mut self, slot: usize) {
        let p = &mut self.procs[slot];
        debug_assert_eq!(p.state, ProcState::Embryo);
        p.state = ProcState::Unused;
        p.pid = Pid::NONE;
        p.parent = None;
    }

    /// Move `slot` to `to` along a legal lifecycle edge
    pub fn set_state(&mut self, slot: usize, to: ProcState) -> Result<(), Violation> {
        let p = &mut self.procs[slot];
        if !p.state.can_transition(to) {
            return Err(Violation::IllegalTransition { pid: p.pid, from: p.state, to });
        }
        p.state = to;
        Ok(())
    }

    /// Move `slot` from `from` to `to`
    ///
    /// Fails when `slot` is not in `from` as well as on an illegal edge.
    pub fn transition(
        &mut self,
        slot: usize,
        from: ProcState,
        to: ProcState,
    ) -> Result<(), Violation> {
        let p = &self.procs[slot];
        if p.state != from {
            return Err(Violation::IllegalTransition { pid: p.pid, from: p.state, to });
        }
        self.set_state(slot, to)
    }

    /// Slot running on `cpu`
    pub fn current(&self, cpu: usize) -> Result<usize, Violation> {
        self.cpus[cpu].proc.ok_or(Violation::NoCurrentProcess { cpu })
    }

    /// The root process
    pub fn init(&self) -> Option<ProcRef> {
        self.init
    }

    /// Mark `slot` as the root process
    pub fn set_init(&mut self, slot: usize) {
        self.procs[slot].flags.insert(ProcFlags::INIT);
        self.init = Some(self.ref_of(slot));
    }

    /// Slot of `slot`'s parent
    pub fn parent_of(&self, slot: usize) -> Result<Option<usize>, Violation> {
        self.procs[slot].parent.map(|link| self.resolve(link)).transpose()
    }

    /// Whether `child` is linked to `parent`
    pub fn is_child(&self, child: usize, parent: usize) -> bool {
        self.procs[child].state.is_live()
            && self.procs[child].parent == Some(self.ref_of(parent))
    }

    /// Hand every child of `from` to `to`
    ///
    /// Returns whether any of them is already a ZOMBIE.
    pub fn reparent(&mut self, from: usize, to: ProcRef) -> bool {
        let old = self.ref_of(from);
        let mut zombie = false;
        for p in self.procs.iter_mut() {
            if p.state.is_live() && p.parent == Some(old) {
                p.parent = Some(to);
                zombie |= p.state == ProcState::Zombie;
            }
        }
        zombie
    }

    /// Make every process sleeping on `chan` RUNNABLE
    ///
    /// Returns the number woken.
    pub fn wakeup1(&mut self, chan: Channel) -> usize {
        let mut woken = 0;
        for p in self.procs.iter_mut() {
            if p.state == ProcState::Sleeping && p.chan == Some(chan) {
                p.state = ProcState::Runnable;
                woken += 1;
            }
        }
        woken
    }

    /// Set the kill flag of `pid`; a sleeper is made RUNNABLE
    ///
    /// Returns `false` when no live process has that pid.
    pub fn kill(&mut self, pid: Pid) -> bool {
        let Some(slot) = self.slot_of(pid) else {
            return false;
        };
        let p = &mut self.procs[slot];
        p.flags.insert(ProcFlags::KILLED);
        if p.state == ProcState::Sleeping {
            p.state = ProcState::Runnable;
        }
        true
    }

    /// Number of RUNNING processes
    pub fn running(&self) -> usize {
        self.procs.iter().filter(|p| p.state == ProcState::Running).count()
    }
}

/// ============================================================================
/// Owned Resources
/// ============================================================================

/// Everything a process exclusively owns
///
/// Touched only by the process itself, by its creator before it becomes
/// RUNNABLE, and by whoever reaps it. The slot lock is always taken after
/// the table lock, never before.
pub struct OwnedResources<M: Machine> {
    /// Kernel stack
    pub kstack: Option<KernelStack>,
    /// User address space
    pub space: Option<M::Space>,
    /// Size of the user address space in bytes
    pub size: usize,
    /// Saved user registers
    pub frame: M::Frame,
    /// Open files
    pub files: [Option<M::File>; NOFILE],
    /// Current directory
    pub cwd: Option<M::Inode>,
}

impl<M: Machine> OwnedResources<M> {
    /// Empty slot resources
    pub fn new() -> Self {
        Self {
            kstack: None,
            space: None,
            size: 0,
            frame: M::Frame::default(),
            files: core::array::from_fn(|_| None),
            cwd: None,
        }
    }

    /// Top of the kernel stack, zero when there is none
    pub fn kstack_top(&self) -> usize {
        self.kstack.as_ref().map_or(0, KernelStack::top)
    }
}

impl<M: Machine> Default for OwnedResources<M> {
    fn default() -> Self {
        Self::new()
    }
}

// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Process Lifecycle
//!
//! Creation, termination and reaping:
//!
//! - **allocate**: claim a slot as EMBRYO and give it a kernel stack
//! - **user_init**: build the root process
//! - **fork**: copy the caller into a new RUNNABLE child
//! - **exit**: close everything, hand children to the root, become ZOMBIE
//! - **wait**: reap a ZOMBIE child, blocking until one exists
//! - **kill**: flag a process for exit at its next checkpoint
//!
//! A ZOMBIE keeps its pid, stack and address space until its parent reaps
//! it. Open files and the working directory are released at exit.

use crate::error::{ProcError, ProcResult};
use crate::kernel::{Kernel, TableGuard};
use crate::param::{NOFILE, NPROC};
use crate::process::{KernelStack, Pid, ProcState};
use crate::sched::Tier;
use crate::traits::{Machine, TrapFrame};

/// Name given to the root process
pub const INIT_NAME: &str = "initcode";

impl<M: Machine> Kernel<M> {
    /// ========================================================================
    /// Creation
    /// ========================================================================

    /// Claim a slot and prepare its first activation
    ///
    /// The slot is EMBRYO on success. Fails with [`ProcError::NoFreeSlot`]
    /// when the table is full and [`ProcError::OutOfMemory`] when no kernel
    /// stack can be had, in which case the slot goes back to UNUSED.
    pub(crate) fn allocate(&self) -> ProcResult<(usize, Pid)> {
        let now = self.now();
        let Some((slot, pid)) = self.lock_table().claim(now, self.config()) else {
            log::warn!("allocate: process table full");
            return Err(ProcError::NoFreeSlot);
        };

        let Some(mut kstack) = KernelStack::new() else {
            self.lock_table().abandon(slot);
            log::warn!("allocate: no kernel stack for pid {}", pid);
            return Err(ProcError::OutOfMemory);
        };
        let context = self.machine().first_run_context(&mut kstack);

        {
            let mut owned = self.owned(slot);
            owned.kstack = Some(kstack);
            owned.frame = M::Frame::default();
        }
        self.lock_table().proc_mut(slot).context = context;
        Ok((slot, pid))
    }

    /// Undo [`allocate`](Self::allocate) for a slot that never became RUNNABLE
    fn discard(&self, slot: usize) {
        {
            let mut owned = self.owned(slot);
            owned.kstack = None;
            owned.size = 0;
        }
        self.lock_table().abandon(slot);
    }

    /// Create the root process
    ///
    /// Loads `image` into a fresh address space, installs `frame` and
    /// `cwd`, and makes the process RUNNABLE in the round-robin tier. Every
    /// orphan is handed to it and it must never exit.
    pub fn user_init(&self, image: &[u8], frame: M::Frame, cwd: M::Inode) -> ProcResult<Pid> {
        if self.lock_table().init().is_some() {
            return Err(ProcError::InvalidArgument);
        }

        let (slot, pid) = self.allocate()?;
        let Some(mut space) = self.machine().create() else {
            self.discard(slot);
            return Err(ProcError::OutOfMemory);
        };
        let Some(size) = self.machine().load(&mut space, image) else {
            self.machine().destroy(space);
            self.discard(slot);
            return Err(ProcError::OutOfMemory);
        };

        {
            let mut owned = self.owned(slot);
            owned.space = Some(space);
            owned.size = size;
            owned.frame = frame;
            owned.cwd = Some(cwd);
        }

        let now = self.now();
        let mut table = self.lock_table();
        table.proc_mut(slot).name.push_str(INIT_NAME);
        table.set_init(slot);
        self.check(table.transition(slot, ProcState::Embryo, ProcState::Runnable));
        table.proc_mut(slot).timing.enter(Tier::RoundRobin, now);

        log::info!("init: pid {} created in slot {}", pid, slot);
        Ok(pid)
    }

    /// Copy the calling process
    ///
    /// The child shares the parent's open files, gets its own copy of the
    /// address space, and sees zero returned from the trap. Returns the
    /// child's pid to the parent.
    pub fn fork(&self) -> ProcResult<Pid> {
        let parent = {
            let table = self.lock_table();
            self.current_slot(&table)
        };

        let (slot, pid) = self.allocate()?;

        let (space, size, mut frame, files, cwd) = {
            let src = self.owned(parent);
            let space = src
                .space
                .as_ref()
                .and_then(|space| self.machine().duplicate(space, src.size));
            let Some(space) = space else {
                drop(src);
                self.discard(slot);
                log::warn!("fork: address space copy failed");
                return Err(ProcError::OutOfMemory);
            };
            let files: [Option<M::File>; NOFILE] =
                core::array::from_fn(|fd| src.files[fd].as_ref().map(|f| self.machine().dup(f)));
            let cwd = src.cwd.as_ref().map(|inode| self.machine().idup(inode));
            (space, src.size, src.frame.clone(), files, cwd)
        };
        frame.set_return(0);

        {
            let mut owned = self.owned(slot);
            owned.space = Some(space);
            owned.size = size;
            owned.frame = frame;
            owned.files = files;
            owned.cwd = cwd;
        }

        let mut table = self.lock_table();
        let name = table.proc(parent).name.clone();
        let link = table.ref_of(parent);
        let child = table.proc_mut(slot);
        child.name = name;
        child.parent = Some(link);
        self.check(table.transition(slot, ProcState::Embryo, ProcState::Runnable));

        log::debug!("fork: pid {} -> child pid {}", link.pid, pid);
        Ok(pid)
    }

    /// ========================================================================
    /// Termination
    /// ========================================================================

    /// Terminate the calling process; never returns
    ///
    /// Closes open files and the working directory, wakes the parent, hands
    /// every child to the root process and gives up the CPU as a ZOMBIE.
    pub fn exit(&self) -> ! {
        let slot = {
            let table = self.lock_table();
            let slot = self.current_slot(&table);
            if table.init().is_some_and(|init| init.slot == slot) {
                drop(table);
                self.fatal(format_args!("init exiting"));
            }
            slot
        };

        let (files, cwd) = {
            let mut owned = self.owned(slot);
            let files: [Option<M::File>; NOFILE] = core::array::from_fn(|fd| owned.files[fd].take());
            (files, owned.cwd.take())
        };
        for file in files.into_iter().flatten() {
            self.machine().close(file);
        }
        if let Some(cwd) = cwd {
            self.machine().iput(cwd);
        }

        let mut table = self.lock_table();

        // The parent may be asleep in wait.
        if let Some(parent) = self.check(table.parent_of(slot)) {
            table.wakeup1(self.proc_channel(parent));
        }

        if let Some(init) = table.init() {
            if table.reparent(slot, init) {
                table.wakeup1(self.proc_channel(init.slot));
            }
        }

        self.check(table.transition(slot, ProcState::Running, ProcState::Zombie));
        log::debug!("exit: pid {}", table.proc(slot).pid);

        self.sched(&mut table);
        self.fatal(format_args!("zombie exit"))
    }

    /// Reap a ZOMBIE child of the caller and return its pid
    ///
    /// Blocks while the caller has live children but none has exited.
    /// Fails with [`ProcError::NoChildren`] when it has none at all and with
    /// [`ProcError::Killed`] when the caller was killed before blocking.
    pub fn wait(&self) -> ProcResult<Pid> {
        let mut table = self.lock_table();
        let me = self.current_slot(&table);

        loop {
            let mut have_kids = false;
            for slot in 0..NPROC {
                if !table.is_child(slot, me) {
                    continue;
                }
                have_kids = true;
                if table.proc(slot).state == ProcState::Zombie {
                    let pid = table.proc(slot).pid;
                    self.reap(&mut table, slot);
                    return Ok(pid);
                }
            }

            if !have_kids {
                return Err(ProcError::NoChildren);
            }
            if table.proc(me).killed() {
                return Err(ProcError::Killed);
            }

            self.sleep_locked(self.proc_channel(me), &mut table);
        }
    }

    /// Free a ZOMBIE's stack and address space and return its slot
    fn reap(&self, table: &mut TableGuard<'_, M>, slot: usize) {
        let (kstack, space) = {
            let mut owned = self.owned(slot);
            owned.size = 0;
            owned.frame = M::Frame::default();
            (owned.kstack.take(), owned.space.take())
        };
        drop(kstack);
        if let Some(space) = space {
            self.machine().destroy(space);
        }

        log::debug!("reap: pid {} from slot {}", table.proc(slot).pid, slot);
        self.check(table.release(slot));
    }

    /// Flag `pid` to exit at its next checkpoint
    ///
    /// A sleeping target is made RUNNABLE so it notices. A running target
    /// keeps running until it reaches a checkpoint.
    pub fn kill(&self, pid: Pid) -> ProcResult<()> {
        if self.lock_table().kill(pid) {
            log::debug!("kill: pid {}", pid);
            Ok(())
        } else {
            log::warn!("kill: no process with pid {}", pid);
            Err(ProcError::NotFound)
        }
    }

    /// ========================================================================
    /// Running process
    /// ========================================================================

    /// Pid of the calling process
    pub fn getpid(&self) -> Pid {
        let table = self.lock_table();
        let slot = self.current_slot(&table);
        table.proc(slot).pid
    }

    /// Grow or shrink the caller's memory by `delta` bytes
    ///
    /// Returns the previous size.
    pub fn grow(&self, delta: isize) -> ProcResult<usize> {
        let slot = {
            let table = self.lock_table();
            self.current_slot(&table)
        };

        let mut owned = self.owned(slot);
        let old = owned.size;
        let new = if delta >= 0 {
            old.checked_add(delta.unsigned_abs())
        } else {
            old.checked_sub(delta.unsigned_abs())
        }
        .ok_or(ProcError::InvalidArgument)?;

        let kstack_top = owned.kstack_top();
        let space = owned.space.as_mut().ok_or(ProcError::OutOfMemory)?;
        if new != old {
            let size = self.machine().grow(space, old, new).ok_or(ProcError::OutOfMemory)?;
            owned.size = size;
        }
        if let Some(space) = owned.space.as_ref() {
            self.machine().install(space, kstack_top);
        }
        Ok(old)
    }

    /// Install `file` in the caller's lowest free descriptor
    ///
    /// Hands the file back when every descriptor is taken.
    pub fn fd_alloc(&self, file: M::File) -> Result<usize, M::File> {
        let slot = {
            let table = self.lock_table();
            self.current_slot(&table)
        };
        let mut owned = self.owned(slot);
        match owned.files.iter().position(Option::is_none) {
            Some(fd) => {
                owned.files[fd] = Some(file);
                Ok(fd)
            }
            None => Err(file),
        }
    }

    /// Rename the caller
    pub fn set_name(&self, name: &str) {
        let mut table = self.lock_table();
        let slot = self.current_slot(&table);
        let p = table.proc_mut(slot);
        p.name.clear();
        p.name.push_str(name);
    }
}

// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Aging Monitor
//!
//! Run once per tick on the timekeeper CPU. A RUNNABLE process outside the
//! round-robin tier that has neither run nor changed tier for longer than
//! the starvation boundary moves up exactly one tier.

use crate::kernel::Kernel;
use crate::process::{ProcState, ProcTable};
use crate::traits::Machine;

impl<C> ProcTable<C> {
    /// Promote every starved process one tier as of tick `now`
    ///
    /// Returns the number promoted.
    pub fn age(&mut self, now: u64, boundary: u64) -> usize {
        let mut promoted = 0;
        for slot in 0..self.procs().len() {
            let p = self.proc_mut(slot);
            if p.state != ProcState::Runnable {
                continue;
            }
            let Some(up) = p.timing.tier.promoted() else {
                continue;
            };
            if p.timing.waiting(now) > boundary && p.timing.in_tier(now) > boundary {
                log::debug!("aging: pid {} {} -> {}", p.pid, p.timing.tier, up);
                p.timing.enter(up, now);
                promoted += 1;
            }
        }
        promoted
    }
}

impl<M: Machine> Kernel<M> {
    /// One aging pass at the current tick
    pub fn age(&self) -> usize {
        let now = self.now();
        self.lock_table().age(now, self.config().starvation_boundary)
    }
}

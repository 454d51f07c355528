// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Per-CPU scheduler state

use crate::param::{SchedConfig, NPROC};
use crate::sched::Tier;

/// One CPU as seen by the scheduler
///
/// Lives inside the process table, so every field is guarded by the
/// table lock.
pub struct Cpu<C> {
    /// Slot of the process running here
    pub proc: Option<usize>,
    /// Remaining ticks per tier in the current rotation
    pub budgets: [u32; 3],
    /// Slot the round-robin scan last picked
    pub last_rr: usize,
    /// Syscalls entered on this CPU
    pub syscalls: u64,
    /// Saved context of this CPU's scheduler loop
    pub scheduler: C,
}

impl<C: Default> Cpu<C> {
    /// Idle CPU with full budgets
    pub fn new(config: &SchedConfig) -> Self {
        let mut cpu = Self {
            proc: None,
            budgets: [0; 3],
            last_rr: NPROC - 1,
            syscalls: 0,
            scheduler: C::default(),
        };
        cpu.refill(config);
        cpu
    }
}

impl<C> Cpu<C> {
    /// Reset every tier budget to its weighted share
    pub fn refill(&mut self, config: &SchedConfig) {
        for tier in Tier::ALL {
            self.budgets[tier.index()] = config.budget_ticks(config.weights[tier.index()]);
        }
    }

    /// Remaining budget of `tier`
    pub fn budget(&self, tier: Tier) -> u32 {
        self.budgets[tier.index()]
    }

    /// Charge one tick to `tier`
    pub fn charge(&mut self, tier: Tier) {
        let budget = &mut self.budgets[tier.index()];
        *budget = budget.saturating_sub(1);
    }
}

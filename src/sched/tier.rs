// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Scheduling tiers and per-process timing info

use core::fmt::{self, Write};

use crate::error::{ProcError, ProcResult};
use crate::kernel::Kernel;
use crate::param::{SchedConfig, MAX_CONFIDENCE};
use crate::process::Pid;
use crate::traits::Machine;

/// Scheduling tier
///
/// Tiers are tried in declaration order. The discriminant indexes the
/// per-CPU budget array.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Round robin
    RoundRobin = 0,
    /// Confidence-weighted shortest job first
    ShortestJobFirst = 1,
    /// First come, first served
    FirstComeFirstServe = 2,
}

impl Tier {
    /// Every tier, highest priority first
    pub const ALL: [Tier; 3] = [Tier::RoundRobin, Tier::ShortestJobFirst, Tier::FirstComeFirstServe];

    /// Index into per-tier arrays
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Number user space passes for this tier (1 = RR, 2 = SJF, 3 = FCFS)
    pub const fn number(self) -> usize {
        self as usize + 1
    }

    /// Tier from its user-space number
    pub const fn from_number(n: usize) -> Option<Self> {
        match n {
            1 => Some(Self::RoundRobin),
            2 => Some(Self::ShortestJobFirst),
            3 => Some(Self::FirstComeFirstServe),
            _ => None,
        }
    }

    /// Next tier up, if any
    ///
    /// Aging moves a process exactly one step along this chain.
    pub const fn promoted(self) -> Option<Self> {
        match self {
            Self::RoundRobin => None,
            Self::ShortestJobFirst => Some(Self::RoundRobin),
            Self::FirstComeFirstServe => Some(Self::ShortestJobFirst),
        }
    }

    /// Short name used by the process listings
    pub const fn name(self) -> &'static str {
        match self {
            Self::RoundRobin => "RR",
            Self::ShortestJobFirst => "SJF",
            Self::FirstComeFirstServe => "FCFS",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Scheduling metadata of one process
///
/// Every tick field is a value of the global tick counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingInfo {
    /// Current tier
    pub tier: Tier,
    /// Ticks used in the current quantum
    pub ticks_used: u32,
    /// Declared or estimated burst length
    pub burst: u32,
    /// Tick the process was created
    pub created: u64,
    /// Tick the process entered its current tier
    pub enter_tier: u64,
    /// Tick the process last ran
    pub last_run: u64,
    /// SJF tie-break confidence, 0..=100
    pub confidence: u32,
}

impl TimingInfo {
    /// Timing of an empty slot
    pub const EMPTY: Self = Self {
        tier: Tier::FirstComeFirstServe,
        ticks_used: 0,
        burst: 0,
        created: 0,
        enter_tier: 0,
        last_run: 0,
        confidence: 0,
    };

    /// Timing of a process created at tick `now`
    pub const fn new(now: u64, config: &SchedConfig) -> Self {
        Self {
            tier: Tier::FirstComeFirstServe,
            ticks_used: 0,
            burst: config.default_burst,
            created: now,
            enter_tier: now,
            last_run: now,
            confidence: config.default_confidence,
        }
    }

    /// Move to `tier` as of tick `now`
    pub fn enter(&mut self, tier: Tier, now: u64) {
        self.tier = tier;
        self.enter_tier = now;
    }

    /// Ticks since the process last ran
    pub const fn waiting(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_run)
    }

    /// Ticks since the process entered its tier
    pub const fn in_tier(&self, now: u64) -> u64 {
        now.saturating_sub(self.enter_tier)
    }
}

impl Default for TimingInfo {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<M: Machine> Kernel<M> {
    /// Move `pid` to `tier`, restarting its time in tier
    pub fn change_tier(&self, pid: Pid, tier: Tier) -> ProcResult<()> {
        let now = self.now();
        let mut table = self.lock_table();
        let slot = table.slot_of(pid).ok_or(ProcError::NotFound)?;
        table.proc_mut(slot).timing.enter(tier, now);
        log::debug!("pid {} moved to {}", pid, tier);
        Ok(())
    }

    /// Set the SJF burst estimate and confidence of `pid`
    pub fn set_burst_confidence(&self, pid: Pid, burst: u32, confidence: u32) -> ProcResult<()> {
        if confidence > MAX_CONFIDENCE {
            return Err(ProcError::InvalidArgument);
        }
        let mut table = self.lock_table();
        let slot = table.slot_of(pid).ok_or(ProcError::NotFound)?;
        let timing = &mut table.proc_mut(slot).timing;
        timing.burst = burst;
        timing.confidence = confidence;
        drop(table);

        let mut out = crate::traits::ConsoleWriter(self.machine());
        let _ = writeln!(out, "pid: {} new_burst: {} new_confidence: {}", pid, burst, confidence);
        Ok(())
    }
}

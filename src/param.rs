// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Build-time Configuration
//!
//! Sizing limits and scheduling weights. None of these change while the
//! kernel runs; a [`SchedConfig`] is handed to the kernel once at
//! construction.

/// ============================================================================
/// Sizing
/// ============================================================================

/// Maximum number of processes
pub const NPROC: usize = 64;

/// Maximum number of CPUs
pub const NCPU: usize = 8;

/// Open files per process
pub const NOFILE: usize = 16;

/// Size of each process's kernel stack
pub const KSTACKSIZE: usize = 4096;

/// Number of per-process syscall counters
pub const MAX_SYSCALLS: usize = 32;

/// CPU that owns the tick counter and runs the aging monitor
pub const TIMEKEEPER_CPU: usize = 0;

/// ============================================================================
/// Scheduling
/// ============================================================================

/// Milliseconds per timer interrupt
pub const SYS_TICK: u32 = 10;

/// Milliseconds in one budget share
pub const TIME_SLICE_UNIT: u32 = 100;

/// Relative budget share of the round-robin tier
pub const RR_WEIGHT: u32 = 3;

/// Relative budget share of the shortest-job-first tier
pub const SJF_WEIGHT: u32 = 2;

/// Relative budget share of the first-come-first-served tier
pub const FCFS_WEIGHT: u32 = 1;

/// Milliseconds a process may run before it is forced to yield
pub const QUANTUM: u32 = 50;

/// Ticks of neglect before a runnable process is promoted one tier
pub const STARVATION_BOUNDARY: u64 = 800;

/// Burst estimate given to new processes
pub const DEFAULT_BURST_TIME: u32 = 2;

/// SJF confidence given to new processes
pub const DEFAULT_CONFIDENCE: u32 = 50;

/// Upper bound of a confidence value
pub const MAX_CONFIDENCE: u32 = 100;

/// Scheduling parameters of one kernel instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedConfig {
    /// Tier weights, indexed RR, SJF, FCFS
    pub weights: [u32; 3],
    /// Milliseconds in one budget share
    pub time_slice_unit: u32,
    /// Milliseconds per tick
    pub sys_tick: u32,
    /// Milliseconds before a forced yield
    pub quantum: u32,
    /// Ticks of neglect before promotion
    pub starvation_boundary: u64,
    /// Burst estimate of a new process
    pub default_burst: u32,
    /// Confidence of a new process
    pub default_confidence: u32,
}

impl SchedConfig {
    /// Configuration built from the constants above
    pub const DEFAULT: Self = Self {
        weights: [RR_WEIGHT, SJF_WEIGHT, FCFS_WEIGHT],
        time_slice_unit: TIME_SLICE_UNIT,
        sys_tick: SYS_TICK,
        quantum: QUANTUM,
        starvation_boundary: STARVATION_BOUNDARY,
        default_burst: DEFAULT_BURST_TIME,
        default_confidence: DEFAULT_CONFIDENCE,
    };

    /// Budget, in ticks, a tier of the given weight receives per rotation
    pub const fn budget_ticks(&self, weight: u32) -> u32 {
        weight * self.time_slice_unit / self.sys_tick
    }

    /// Quantum expressed in ticks
    pub const fn quantum_ticks(&self) -> u32 {
        let ticks = self.quantum / self.sys_tick;
        if ticks == 0 { 1 } else { ticks }
    }
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets() {
        let config = SchedConfig::DEFAULT;
        assert_eq!(config.budget_ticks(RR_WEIGHT), 30);
        assert_eq!(config.budget_ticks(SJF_WEIGHT), 20);
        assert_eq!(config.budget_ticks(FCFS_WEIGHT), 10);
    }

    #[test]
    fn test_quantum_never_zero() {
        let config = SchedConfig { quantum: 5, ..SchedConfig::DEFAULT };
        assert_eq!(config.quantum_ticks(), 1);
        assert_eq!(SchedConfig::DEFAULT.quantum_ticks(), 5);
    }
}

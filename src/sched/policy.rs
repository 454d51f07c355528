// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Tier Pick Policies
//!
//! Each policy looks at a snapshot of the slots and names the one to run,
//! or none. They never change the table; the scheduler loop does that.
//!
//! - **Round robin**: circular scan starting after the last pick
//! - **Shortest job first**: greedy on burst, each improvement gated by a
//!   confidence draw
//! - **First come, first served**: earliest tier entry, ties to the lowest slot

use crate::param::MAX_CONFIDENCE;
use crate::process::Proc;
use crate::sched::Tier;

/// ============================================================================
/// Random Source
/// ============================================================================

/// Uniform draw used by the SJF tie-break
///
/// Not cryptographic. The kernel default derives the value from the tick
/// counter; tests inject a fixed sequence.
pub trait RandomSource: Send + Sync {
    /// A value in `0..bound` at tick `now`
    fn draw(&self, now: u64, bound: u32) -> u32;
}

/// Tick counter modulo the bound
#[derive(Debug, Default, Clone, Copy)]
pub struct TickRandom;

impl RandomSource for TickRandom {
    fn draw(&self, now: u64, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        (now % u64::from(bound)) as u32
    }
}

/// ============================================================================
/// Policies
/// ============================================================================

/// First RUNNABLE round-robin slot after `last`, wrapping at the table end
///
/// `last` itself is considered last, so a lone candidate is picked again.
pub fn round_robin<C>(procs: &[Proc<C>], last: usize) -> Option<usize> {
    let n = procs.len();
    (1..=n)
        .map(|step| (last + step) % n)
        .find(|&slot| procs[slot].is_candidate(Tier::RoundRobin))
}

/// Probabilistic shortest job first
///
/// Scans in slot order keeping a running selection. A later candidate with
/// a strictly smaller burst replaces it only if a fresh draw in
/// `0..MAX_CONFIDENCE` falls below the candidate's confidence. Confidence
/// 100 is plain SJF; confidence 0 keeps the first candidate found.
pub fn shortest_job_first<C>(
    procs: &[Proc<C>],
    rng: &dyn RandomSource,
    now: u64,
) -> Option<usize> {
    let mut selected: Option<usize> = None;
    for (slot, p) in procs.iter().enumerate() {
        if !p.is_candidate(Tier::ShortestJobFirst) {
            continue;
        }
        match selected {
            None => selected = Some(slot),
            Some(best) => {
                if p.timing.burst < procs[best].timing.burst
                    && rng.draw(now, MAX_CONFIDENCE) < p.timing.confidence
                {
                    selected = Some(slot);
                }
            }
        }
    }
    selected
}

/// Earliest tier entry among RUNNABLE first-come-first-served slots
pub fn first_come_first_serve<C>(procs: &[Proc<C>]) -> Option<usize> {
    procs
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_candidate(Tier::FirstComeFirstServe))
        .fold(None, |best: Option<(usize, u64)>, (slot, p)| match best {
            Some((_, at)) if at <= p.timing.enter_tier => best,
            _ => Some((slot, p.timing.enter_tier)),
        })
        .map(|(slot, _)| slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::SchedConfig;
    use crate::process::{ProcState, ProcTable};
    use crate::testing::SequenceRandom;

    fn table_with(tiers: &[(usize, Tier)]) -> ProcTable<()> {
        let config = SchedConfig::DEFAULT;
        let mut t = ProcTable::new(&config);
        let top = tiers.iter().map(|&(s, _)| s).max().unwrap_or(0);
        for _ in 0..=top {
            t.claim(0, &config).unwrap();
        }
        for &(slot, tier) in tiers {
            t.proc_mut(slot).state = ProcState::Runnable;
            t.proc_mut(slot).timing.tier = tier;
        }
        t
    }

    #[test]
    fn test_round_robin_cycles_in_slot_order() {
        let rr = Tier::RoundRobin;
        let t = table_with(&[(2, rr), (5, rr), (7, rr)]);
        let mut last = 7;
        let mut order = [0; 3];
        for pick in order.iter_mut() {
            last = round_robin(t.procs(), last).unwrap();
            *pick = last;
        }
        assert_eq!(order, [2, 5, 7]);
    }

    #[test]
    fn test_round_robin_ignores_other_tiers() {
        let t = table_with(&[(1, Tier::ShortestJobFirst), (3, Tier::RoundRobin)]);
        assert_eq!(round_robin(t.procs(), 3), Some(3));
        let t = table_with(&[(1, Tier::FirstComeFirstServe)]);
        assert_eq!(round_robin(t.procs(), 0), None);
    }

    #[test]
    fn test_sjf_full_confidence_picks_shortest() {
        let sjf = Tier::ShortestJobFirst;
        let mut t = table_with(&[(0, sjf), (1, sjf)]);
        t.proc_mut(0).timing.burst = 10;
        t.proc_mut(1).timing.burst = 4;
        t.proc_mut(0).timing.confidence = 100;
        t.proc_mut(1).timing.confidence = 100;
        let rng = SequenceRandom::new(&[99, 0, 57]);
        assert_eq!(shortest_job_first(t.procs(), &rng, 0), Some(1));
    }

    #[test]
    fn test_sjf_zero_confidence_keeps_first() {
        let sjf = Tier::ShortestJobFirst;
        let mut t = table_with(&[(0, sjf), (1, sjf), (2, sjf)]);
        for (slot, burst) in [(0, 9), (1, 3), (2, 1)] {
            t.proc_mut(slot).timing.burst = burst;
            t.proc_mut(slot).timing.confidence = 0;
        }
        let rng = SequenceRandom::new(&[0]);
        assert_eq!(shortest_job_first(t.procs(), &rng, 0), Some(0));
    }

    #[test]
    fn test_sjf_draws_per_comparison() {
        let sjf = Tier::ShortestJobFirst;
        let mut t = table_with(&[(0, sjf), (1, sjf), (2, sjf)]);
        for (slot, burst) in [(0, 9), (1, 5), (2, 2)] {
            t.proc_mut(slot).timing.burst = burst;
            t.proc_mut(slot).timing.confidence = 50;
        }
        // First improvement loses its draw, second wins.
        let rng = SequenceRandom::new(&[80, 10]);
        assert_eq!(shortest_job_first(t.procs(), &rng, 0), Some(2));
        assert_eq!(rng.draws(), 2);
    }

    #[test]
    fn test_sjf_equal_burst_never_draws() {
        let sjf = Tier::ShortestJobFirst;
        let mut t = table_with(&[(0, sjf), (1, sjf)]);
        t.proc_mut(0).timing.burst = 4;
        t.proc_mut(1).timing.burst = 4;
        t.proc_mut(1).timing.confidence = 100;
        let rng = SequenceRandom::new(&[0]);
        assert_eq!(shortest_job_first(t.procs(), &rng, 0), Some(0));
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn test_fcfs_earliest_entry() {
        let fcfs = Tier::FirstComeFirstServe;
        let mut t = table_with(&[(0, fcfs), (1, fcfs)]);
        t.proc_mut(0).timing.enter_tier = 105;
        t.proc_mut(1).timing.enter_tier = 100;
        assert_eq!(first_come_first_serve(t.procs()), Some(1));
    }

    #[test]
    fn test_fcfs_tie_goes_to_lowest_slot() {
        let fcfs = Tier::FirstComeFirstServe;
        let mut t = table_with(&[(3, fcfs), (4, fcfs)]);
        t.proc_mut(3).timing.enter_tier = 100;
        t.proc_mut(4).timing.enter_tier = 100;
        assert_eq!(first_come_first_serve(t.procs()), Some(3));
    }

    #[test]
    fn test_tick_random_bounds() {
        assert_eq!(TickRandom.draw(1234, 100), 34);
        assert_eq!(TickRandom.draw(7, 0), 0);
    }
}

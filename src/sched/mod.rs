// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Three-Tier Scheduler
//!
//! # Design
//!
//! - **Tiers**: round robin, confidence-weighted shortest job first, and
//!   first come first served, tried in that order
//! - **Budgets**: each CPU holds a tick budget per tier, charged by the
//!   timer while a process of that tier runs there; a pass with nothing
//!   to run refills all three in proportion to the tier weights
//! - **Aging**: starved processes climb one tier at a time
//! - **Quantum**: a process is forced to yield after a fixed number of ticks

pub mod aging;
pub mod cpu;
pub mod policy;
pub mod preempt;
pub mod scheduler;
pub mod tier;

pub use cpu::Cpu;
pub use policy::{first_come_first_serve, round_robin, shortest_job_first, RandomSource, TickRandom};
pub use tier::{Tier, TimingInfo};

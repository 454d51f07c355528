// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! # Rustux Sched - Process Lifecycle and Three-Tier Scheduler
//!
//! The process core of a small multiprocessor Unix-like kernel:
//!
//! - **Process table**: fixed slots, each UNUSED, EMBRYO, SLEEPING,
//!   RUNNABLE, RUNNING or ZOMBIE
//! - **Lifecycle**: `user_init`, `fork`, `exit`, `wait`, `kill`
//! - **Scheduler**: per-CPU loop over round robin, confidence-weighted
//!   shortest job first, and first come first served, each tier limited
//!   by a per-CPU tick budget
//! - **Aging and preemption**: starving processes climb tiers; a process
//!   yields when its quantum runs out
//! - **Sleep/wakeup**: channel-keyed condition waits on the table lock
//! - **Diagnostics**: syscall counters and process listings
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── arch/       # x86-64 context switch and interrupt control
//! ├── process/    # table, slots, lifecycle
//! ├── sched/      # tiers, policies, scheduler loop, aging, preemption
//! ├── sync/       # spin locks, channels, sleep/wakeup
//! ├── syscall/    # syscall dispatch and counters
//! ├── clock.rs    # tick counter
//! ├── kernel.rs   # Kernel instance
//! ├── report.rs   # console reports
//! └── traits.rs   # collaborator traits
//! ```
//!
//! The surrounding kernel supplies paging, files, the console and the
//! context switch through [`traits::Machine`].
//!
//! ## Usage
//!
//! ```ignore
//! let kernel = Kernel::new(machine);
//! kernel.user_init(INITCODE, frame, root_dir)?;
//! kernel.scheduler(cpu);
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod arch;
pub mod clock;
pub mod error;
pub mod kernel;
pub mod param;
pub mod process;
pub mod report;
pub mod sched;
pub mod sync;
pub mod syscall;
pub mod traits;

#[cfg(test)]
mod testing;

#[cfg(test)]
mod tests;

pub use error::{ProcError, ProcResult};
pub use kernel::Kernel;
pub use process::{Pid, ProcState};
pub use sched::Tier;

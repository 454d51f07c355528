// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Tick Clock
//!
//! The global tick counter. Only the timekeeper CPU advances it, once per
//! timer interrupt; every advance wakes whatever sleeps on the counter's
//! channel. The kernel takes the counter lock with interrupts off.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ProcError, ProcResult};
use crate::kernel::Kernel;
use crate::sync::{Channel, SpinMutex};
use crate::traits::Machine;

/// Monotonic tick counter
pub struct Clock {
    ticks: SpinMutex<u64>,
    now: AtomicU64,
}

impl Clock {
    /// Clock at tick zero
    pub const fn new() -> Self {
        Self {
            ticks: SpinMutex::new(0),
            now: AtomicU64::new(0),
        }
    }

    /// Current tick without taking the clock lock
    pub fn now(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }

    /// Channel a timed sleeper waits on
    pub fn channel(&self) -> Channel {
        Channel::of(&self.ticks)
    }

    /// Advance the locked counter `ticks` by one; returns the new tick
    pub fn advance(&self, ticks: &mut u64) -> u64 {
        *ticks += 1;
        self.now.store(*ticks, Ordering::Release);
        *ticks
    }

    pub(crate) fn mutex(&self) -> &SpinMutex<u64> {
        &self.ticks
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Machine> Kernel<M> {
    /// Advance the clock and wake every timed sleeper
    pub fn clock_tick(&self) -> u64 {
        let clock = self.clock();
        let mut ticks = self.lock_irq(clock.mutex());
        let now = clock.advance(&mut ticks);
        self.wakeup(clock.channel());
        now
    }

    /// Ticks since boot
    pub fn uptime(&self) -> u64 {
        *self.lock_irq(self.clock().mutex())
    }

    /// Block the calling process for `n` ticks
    ///
    /// Checks the kill flag before every block and fails with
    /// [`ProcError::Killed`] if it is set.
    pub fn sleep_ticks(&self, n: u64) -> ProcResult<()> {
        let clock = self.clock();
        let mut ticks = self.lock_irq(clock.mutex());
        let start = *ticks;
        while *ticks - start < n {
            if self.current_killed() {
                return Err(ProcError::Killed);
            }
            ticks = self.sleep(clock.channel(), clock.mutex(), ticks);
        }
        Ok(())
    }
}

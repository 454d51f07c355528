// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! x86-64 Support
//!
//! Context switch and interrupt control for x86-64 CPUs.

pub mod switch;

pub use switch::{first_run_layout, switch, Context};

use x86_64::instructions::interrupts;

use crate::traits::InterruptControl;

/// ============================================================================
/// Interrupt Control Functions
/// ============================================================================

/// Whether the IF flag is set on this CPU
#[inline]
pub fn interrupts_enabled() -> bool {
    interrupts::are_enabled()
}

/// Enable interrupts (STI)
#[inline]
pub fn enable_interrupts() {
    interrupts::enable();
}

/// Disable interrupts (CLI)
#[inline]
pub fn disable_interrupts() {
    interrupts::disable();
}

/// Wait for the next interrupt with interrupts enabled
///
/// Used by an idle scheduler pass so a spinning CPU still takes the timer.
#[inline]
pub fn idle() {
    interrupts::enable_and_hlt();
}

/// IF flag of the executing CPU
///
/// A kernel's [`Machine`](crate::traits::Machine) can delegate its
/// [`InterruptControl`] to this.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalInterrupts;

impl InterruptControl for LocalInterrupts {
    fn interrupts_enabled(&self) -> bool {
        interrupts_enabled()
    }

    fn enable_interrupts(&self) {
        enable_interrupts();
    }

    fn disable_interrupts(&self) {
        disable_interrupts();
    }

    fn idle(&self) {
        idle();
    }
}

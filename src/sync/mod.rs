// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Kernel Synchronization Primitives
//!
//! # Primitives
//!
//! - **SpinMutex**: spin-based mutual exclusion (`spin::Mutex`)
//! - **IrqMutexGuard**: a `SpinMutex` held with interrupts off, nesting
//! - **Channel**: address-equality key a sleeping process waits on
//! - **sleep / wakeup**: condition signalling on the process-table lock
//!
//! # Lock order
//!
//! 1. the clock lock
//! 2. the process-table lock
//! 3. a slot's owned-resource lock
//!
//! A lock may be taken while holding one above it, never the reverse. The
//! clock and table locks are taken with interrupts off because the timer
//! interrupt takes both. The table lock is the only lock held across a
//! context switch: the process entering the switch holds it and whichever
//! context resumes releases it.

pub mod intr;
pub mod sleep;

pub use intr::{InterruptNesting, InterruptsOff, IrqMutexGuard};
pub use spin::{Mutex as SpinMutex, MutexGuard as SpinMutexGuard};

/// ============================================================================
/// Channel
/// ============================================================================

/// Sleep key
///
/// Two channels are equal when they were made from the same address. A
/// channel carries no data and is never dereferenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel(usize);

impl Channel {
    /// Channel keyed on the address of `obj`
    pub fn of<T: ?Sized>(obj: &T) -> Self {
        Self(obj as *const T as *const () as usize)
    }

    /// Channel from a raw key
    pub const fn from_raw(key: usize) -> Self {
        Self(key)
    }

    /// The raw key
    pub const fn key(self) -> usize {
        self.0
    }
}

// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Per-process kernel stack

use alloc::vec::Vec;

use crate::param::KSTACKSIZE;

/// Kernel stack of one process
///
/// Allocated when the slot is claimed and released when the slot is reaped,
/// never earlier: a zombie still runs on it until its final switch.
pub struct KernelStack {
    mem: Vec<u8>,
}

impl KernelStack {
    /// Allocate a zeroed stack of [`KSTACKSIZE`] bytes
    ///
    /// Returns `None` when the allocator cannot satisfy the request.
    pub fn new() -> Option<Self> {
        let mut mem = Vec::new();
        mem.try_reserve_exact(KSTACKSIZE).ok()?;
        mem.resize(KSTACKSIZE, 0);
        Some(Self { mem })
    }

    /// Lowest address of the stack
    pub fn base(&self) -> usize {
        self.mem.as_ptr() as usize
    }

    /// One past the highest address; stacks grow down from here
    pub fn top(&self) -> usize {
        self.base() + self.mem.len()
    }

    /// Stack size in bytes
    pub fn len(&self) -> usize {
        self.mem.len()
    }

    /// Whether the stack has no usable space
    pub fn is_empty(&self) -> bool {
        self.mem.is_empty()
    }

    /// Raw stack memory, used to lay out a first-run frame
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.mem
    }
}

impl core::fmt::Debug for KernelStack {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KernelStack")
            .field("base", &format_args!("{:#x}", self.base()))
            .field("len", &self.len())
            .finish()
    }
}

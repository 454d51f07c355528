// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Architecture support
//!
//! Building blocks a kernel uses to implement
//! [`ContextSwitch`](crate::traits::ContextSwitch) and
//! [`InterruptControl`](crate::traits::InterruptControl) on real hardware.

#[cfg(all(target_arch = "x86_64", any(feature = "amd64", test)))]
pub mod amd64;

// Copyright 2025 The Rustux Authors
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

//! Test machine and helpers
//!
//! [`MockMachine`] implements every collaborator trait with counters
//! instead of hardware. Its context switch returns immediately, so after a
//! switch the caller simply continues; tests move processes between CPUs
//! with [`run_on_cpu`] and [`park`].
//! Work another CPU would do while the caller is switched out goes through
//! [`while_switched_out`].
//!
//! # Usage
//! ```ignore
//! let (kernel, init) = boot();
//! let child = fork_child(&kernel);
//! run_on_cpu(&kernel, 1, child);
//! kernel.machine().set_cpu(1);
//! ```

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use crate::kernel::Kernel;
use crate::process::{KernelStack, Pid, ProcState};
use crate::sched::RandomSource;
use crate::sync::SpinMutex;
use crate::traits::{
    AddressSpaceOps, Console, ContextSwitch, FileOps, InterruptControl, Machine, TrapFrame,
};

const PAGE_SIZE: usize = 4096;

/// Image loaded into the root process by [`boot`]
pub const INIT_IMAGE: [u8; 100] = [0x90; 100];

/// ============================================================================
/// Mock Machine
/// ============================================================================

#[derive(Debug, Default)]
pub struct MockContext {
    pub stack_top: usize,
}

#[derive(Debug, PartialEq, Eq)]
pub struct MockSpace {
    pub id: u32,
    pub size: usize,
}

#[derive(Debug, PartialEq, Eq)]
pub struct MockFile(pub u32);

#[derive(Debug, PartialEq, Eq)]
pub struct MockInode(pub u32);

#[derive(Debug, Clone, Default)]
pub struct MockFrame {
    pub num: usize,
    pub args: [usize; 6],
    pub ret: isize,
}

impl TrapFrame for MockFrame {
    fn syscall_number(&self) -> usize {
        self.num
    }

    fn arg(&self, n: usize) -> usize {
        self.args.get(n).copied().unwrap_or(0)
    }

    fn set_return(&mut self, value: isize) {
        self.ret = value;
    }
}

type SwitchHook = Box<dyn FnOnce() + Send>;

pub struct MockMachine {
    cpu: AtomicUsize,
    interrupts: AtomicBool,
    switches: AtomicUsize,
    installs: AtomicUsize,
    next_space: AtomicU32,
    spaces_created: AtomicUsize,
    spaces_destroyed: AtomicUsize,
    fail_duplicate: AtomicBool,
    files_duped: AtomicUsize,
    files_closed: AtomicUsize,
    inodes_duped: AtomicUsize,
    inodes_put: AtomicUsize,
    output: SpinMutex<String>,
    on_switch: SpinMutex<Option<SwitchHook>>,
}

impl MockMachine {
    pub fn new() -> Self {
        Self {
            cpu: AtomicUsize::new(0),
            interrupts: AtomicBool::new(false),
            switches: AtomicUsize::new(0),
            installs: AtomicUsize::new(0),
            next_space: AtomicU32::new(1),
            spaces_created: AtomicUsize::new(0),
            spaces_destroyed: AtomicUsize::new(0),
            fail_duplicate: AtomicBool::new(false),
            files_duped: AtomicUsize::new(0),
            files_closed: AtomicUsize::new(0),
            inodes_duped: AtomicUsize::new(0),
            inodes_put: AtomicUsize::new(0),
            output: SpinMutex::new(String::new()),
            on_switch: SpinMutex::new(None),
        }
    }

    /// Make later calls appear to come from `cpu`
    pub fn set_cpu(&self, cpu: usize) {
        self.cpu.store(cpu, Ordering::SeqCst);
    }

    /// Run `hook` inside the next context switch, once
    pub fn on_next_switch(&self, hook: impl FnOnce() + Send + 'static) {
        *self.on_switch.lock() = Some(Box::new(hook));
    }

    pub fn switches(&self) -> usize {
        self.switches.load(Ordering::SeqCst)
    }

    /// User address-space installs
    pub fn installs(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }

    pub fn spaces_created(&self) -> usize {
        self.spaces_created.load(Ordering::SeqCst)
    }

    pub fn spaces_destroyed(&self) -> usize {
        self.spaces_destroyed.load(Ordering::SeqCst)
    }

    /// Make address-space duplication fail until reset
    pub fn fail_duplicate(&self, fail: bool) {
        self.fail_duplicate.store(fail, Ordering::SeqCst);
    }

    pub fn files_duped(&self) -> usize {
        self.files_duped.load(Ordering::SeqCst)
    }

    pub fn files_closed(&self) -> usize {
        self.files_closed.load(Ordering::SeqCst)
    }

    pub fn inodes_duped(&self) -> usize {
        self.inodes_duped.load(Ordering::SeqCst)
    }

    pub fn inodes_put(&self) -> usize {
        self.inodes_put.load(Ordering::SeqCst)
    }

    /// Everything written to the console so far
    pub fn output(&self) -> String {
        self.output.lock().clone()
    }

    /// Console output since the last call
    pub fn take_output(&self) -> String {
        core::mem::take(&mut *self.output.lock())
    }

    fn new_space(&self, size: usize) -> MockSpace {
        self.spaces_created.fetch_add(1, Ordering::SeqCst);
        MockSpace {
            id: self.next_space.fetch_add(1, Ordering::SeqCst),
            size,
        }
    }
}

impl Default for MockMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextSwitch for MockMachine {
    type Context = MockContext;

    unsafe fn switch(&self, _old: *mut MockContext, _new: *const MockContext) {
        self.switches.fetch_add(1, Ordering::SeqCst);
        let hook = self.on_switch.lock().take();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn first_run_context(&self, stack: &mut KernelStack) -> MockContext {
        MockContext { stack_top: stack.top() }
    }

    fn cpu_id(&self) -> usize {
        self.cpu.load(Ordering::SeqCst)
    }
}

impl InterruptControl for MockMachine {
    fn interrupts_enabled(&self) -> bool {
        self.interrupts.load(Ordering::SeqCst)
    }

    fn enable_interrupts(&self) {
        self.interrupts.store(true, Ordering::SeqCst);
    }

    fn disable_interrupts(&self) {
        self.interrupts.store(false, Ordering::SeqCst);
    }
}

impl AddressSpaceOps for MockMachine {
    type Space = MockSpace;

    fn create(&self) -> Option<MockSpace> {
        Some(self.new_space(0))
    }

    fn load(&self, space: &mut MockSpace, image: &[u8]) -> Option<usize> {
        space.size = (image.len() + PAGE_SIZE - 1) / PAGE_SIZE * PAGE_SIZE;
        Some(space.size)
    }

    fn duplicate(&self, space: &MockSpace, size: usize) -> Option<MockSpace> {
        if self.fail_duplicate.load(Ordering::SeqCst) {
            return None;
        }
        debug_assert!(size <= space.size);
        Some(self.new_space(size))
    }

    fn grow(&self, space: &mut MockSpace, _old_size: usize, new_size: usize) -> Option<usize> {
        space.size = new_size;
        Some(new_size)
    }

    fn destroy(&self, _space: MockSpace) {
        self.spaces_destroyed.fetch_add(1, Ordering::SeqCst);
    }

    fn install(&self, _space: &MockSpace, _kstack_top: usize) {
        self.installs.fetch_add(1, Ordering::SeqCst);
    }

    fn install_kernel(&self) {}
}

impl FileOps for MockMachine {
    type File = MockFile;
    type Inode = MockInode;

    fn dup(&self, file: &MockFile) -> MockFile {
        self.files_duped.fetch_add(1, Ordering::SeqCst);
        MockFile(file.0)
    }

    fn close(&self, _file: MockFile) {
        self.files_closed.fetch_add(1, Ordering::SeqCst);
    }

    fn idup(&self, inode: &MockInode) -> MockInode {
        self.inodes_duped.fetch_add(1, Ordering::SeqCst);
        MockInode(inode.0)
    }

    fn iput(&self, _inode: MockInode) {
        self.inodes_put.fetch_add(1, Ordering::SeqCst);
    }
}

impl Console for MockMachine {
    fn write_str(&self, s: &str) {
        self.output.lock().push_str(s);
    }

    fn halt(&self, msg: fmt::Arguments<'_>) -> ! {
        panic!("{}", msg)
    }
}

impl Machine for MockMachine {
    type Frame = MockFrame;
}

/// ============================================================================
/// Random Source
/// ============================================================================

/// Replays a fixed sequence of draws, cycling when it runs out
pub struct SequenceRandom {
    values: Vec<u32>,
    next: AtomicUsize,
}

impl SequenceRandom {
    pub fn new(values: &[u32]) -> Self {
        Self {
            values: values.to_vec(),
            next: AtomicUsize::new(0),
        }
    }

    /// Draws made so far
    pub fn draws(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }
}

impl RandomSource for SequenceRandom {
    fn draw(&self, _now: u64, bound: u32) -> u32 {
        let i = self.next.fetch_add(1, Ordering::SeqCst);
        if self.values.is_empty() || bound == 0 {
            return 0;
        }
        self.values[i % self.values.len()] % bound
    }
}

/// ============================================================================
/// Helpers
/// ============================================================================

/// Kernel with the root process created and running on CPU 0
pub fn boot() -> (Kernel<MockMachine>, Pid) {
    let kernel = Kernel::new(MockMachine::new());
    let frame = MockFrame {
        ret: -7,
        ..MockFrame::default()
    };
    let init = kernel.user_init(&INIT_IMAGE, frame, MockInode(1)).unwrap();
    run_on_cpu(&kernel, 0, init);
    (kernel, init)
}

/// Fork the process on the current CPU
pub fn fork_child(kernel: &Kernel<MockMachine>) -> Pid {
    kernel.fork().unwrap()
}

/// Put `pid` on `cpu` as the scheduler would
pub fn run_on_cpu(kernel: &Kernel<MockMachine>, cpu: usize, pid: Pid) {
    kernel.with_table(|t| {
        let slot = t.slot_of(pid).unwrap();
        t.set_state(slot, ProcState::Running).unwrap();
        t.cpus[cpu].proc = Some(slot);
    });
}

/// Take whatever runs on `cpu` off it, back to RUNNABLE
pub fn park(kernel: &Kernel<MockMachine>, cpu: usize) {
    kernel.with_table(|t| {
        if let Some(slot) = t.cpus[cpu].proc.take() {
            t.set_state(slot, ProcState::Runnable).unwrap();
        }
    });
}

/// Run `f` during the caller's next switch, as another CPU would
///
/// The scheduler on the far side of a switch releases the table lock and
/// takes it again before switching back; `f` runs in between.
pub fn while_switched_out(
    kernel: &Arc<Kernel<MockMachine>>,
    f: impl FnOnce(&Kernel<MockMachine>) + Send + 'static,
) {
    let weak = Arc::downgrade(kernel);
    kernel.machine().on_next_switch(move || {
        let Some(kernel) = weak.upgrade() else {
            return;
        };
        // SAFETY: the caller switching out holds the table lock and stays
        // inside the switch until this returns.
        unsafe { kernel.table_mutex().force_unlock() };
        f(&kernel);
        core::mem::forget(kernel.table_mutex().lock());
    });
}

/// Load a syscall request into the trap frame of `slot`
pub fn set_syscall(kernel: &Kernel<MockMachine>, slot: usize, num: usize, args: [usize; 3]) {
    let mut owned = kernel.owned(slot);
    owned.frame.num = num;
    owned.frame.args = [0; 6];
    owned.frame.args[..3].copy_from_slice(&args);
}

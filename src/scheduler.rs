//! # Scheduler
//!
//! Fixed-order round robin over a fixed set of tasks. There is no priority
//! and no preemption: one *pass* offers the current time to every task in
//! the order they were registered, and each task decides for itself whether
//! that time is late enough to run.
//!
//! ## Scheduling Algorithm
//!
//! For each task, in order:
//! 1. **Sample the clock**: a fresh instant per task, so a slow task does
//!    not make the ones after it see stale time
//! 2. **Offer it**: [`Schedulable::schedule`] runs the task's step if it is
//!    due or pending, and skips it otherwise
//!
//! A task that takes too long delays every other task by the same amount.
//! Nothing here measures or limits that.

use crate::clock::TimeSource;
use crate::task::Schedulable;

// ---------------------------------------------------------------------------
// Scheduler struct
// ---------------------------------------------------------------------------

/// The task list and a pass counter. Built once in `main` and handed to
/// [`kernel::run`](crate::kernel::run).
pub struct Scheduler<'t, const N: usize> {
    /// Tasks in the order they are offered time.
    tasks: [&'t mut dyn Schedulable; N],

    /// Completed passes, wrapping.
    passes: u32,
}

impl<'t, const N: usize> Scheduler<'t, N> {
    /// Schedule `tasks` in the given order.
    pub fn new(tasks: [&'t mut dyn Schedulable; N]) -> Self {
        Self { tasks, passes: 0 }
    }

    /// Offer the current time to every task once. Returns how many ran.
    pub fn pass(&mut self, clock: &impl TimeSource) -> usize {
        let mut ran = 0;
        for task in self.tasks.iter_mut() {
            if task.schedule(clock.now()) {
                ran += 1;
            }
        }
        self.passes = self.passes.wrapping_add(1);
        ran
    }

    /// Number of completed passes.
    #[inline]
    pub fn passes(&self) -> u32 {
        self.passes
    }

    /// Number of registered tasks.
    #[inline]
    pub const fn len(&self) -> usize {
        N
    }

    /// True if no tasks are registered.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Number of tasks that will run on the next pass regardless of time.
    pub fn ready_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_ready()).count()
    }

    /// Serial numbers in scheduling order.
    pub fn serials(&self) -> [u8; N] {
        core::array::from_fn(|i| self.tasks[i].serial())
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

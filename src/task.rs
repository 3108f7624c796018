//! # Cooperative Task
//!
//! A task is a small state machine that the scheduler offers the current
//! time to, over and over. Each task pairs two layers of state:
//!
//! - an **operational state** ([`OpState`]) owned by the kernel, which decides
//!   *whether* the task runs this pass, and
//! - an **application state** (the task's own closed enum, see
//!   [`Steppable::State`]), which decides *what* it does when it runs.
//!
//! ## Operational state machine
//!
//! ```text
//!                    now >= next_due
//!   ┌──────────┐ ───────────────────────► step() ──┐
//!   │ Waiting  │ ◄──────────────────────────────────┘ next_due += interval
//!   └──────────┘
//!     ▲     │ run_again_asap()
//!     │     ▼
//!     │ ┌──────────┐
//!     └─│ Pending  │  step() on the very next pass, due time ignored
//!       └──────────┘
//!
//!   suspend(): any ──► Suspended     (previous state saved)
//!   resume():  Suspended ──► saved state
//!
//!   Running / Blocked are never legal when the scheduler calls in;
//!   seeing one halts the system.
//! ```
//!
//! Before a step runs the task is put back to `Waiting`, so a step that does
//! nothing special leaves it periodic. A step may call
//! [`TaskControl::run_again_asap`] or [`TaskControl::suspend`] to change
//! that for the next pass.

use core::fmt;

use crate::kernel;
use crate::sync::{self, IrqCounter};
use crate::time::{Interval, TimeInstant};

// ---------------------------------------------------------------------------
// Operational state
// ---------------------------------------------------------------------------

/// Kernel-side state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpState {
    /// Runs once the clock reaches its due time.
    Waiting,
    /// Runs on the next pass regardless of the due time.
    Pending,
    /// Inside its step function. Never seen by the scheduler.
    Running,
    /// Waiting on something outside the scheduler. Never seen by the
    /// scheduler either.
    Blocked,
    /// Skipped until resumed.
    Suspended,
}

/// Serial numbers handed out to tasks in creation order.
static NEXT_SERIAL: IrqCounter<u8> = IrqCounter::new(0);

fn next_serial() -> u8 {
    sync::critical_section(|cs| {
        let serial = NEXT_SERIAL.get(cs);
        NEXT_SERIAL.set(cs, serial.wrapping_add(1));
        serial
    })
}

// ---------------------------------------------------------------------------
// Task control
// ---------------------------------------------------------------------------

/// Scheduling bookkeeping for one task. Step functions get a mutable
/// reference to it so they can ask to run again or suspend themselves.
#[derive(Debug, Clone)]
pub struct TaskControl {
    serial: u8,
    op_state: OpState,
    saved_op_state: OpState,
    interval: Interval,
    next_due: TimeInstant,
}

impl TaskControl {
    fn new(interval: Interval) -> Self {
        Self {
            serial: next_serial(),
            op_state: OpState::Waiting,
            saved_op_state: OpState::Waiting,
            interval,
            next_due: TimeInstant::ZERO,
        }
    }

    /// Run on the next scheduler pass without waiting for the due time.
    #[inline]
    pub fn run_again_asap(&mut self) {
        self.op_state = OpState::Pending;
    }

    /// Stop scheduling this task until [`resume`](Self::resume). Suspending
    /// a suspended task does nothing.
    pub fn suspend(&mut self) {
        if self.op_state != OpState::Suspended {
            self.saved_op_state = self.op_state;
            self.op_state = OpState::Suspended;
        }
    }

    /// Put the task back in the state it was suspended from. Does nothing
    /// if the task is not suspended.
    pub fn resume(&mut self) {
        if self.op_state == OpState::Suspended {
            self.op_state = self.saved_op_state;
        }
    }

    /// True if the task will run on the next pass no matter the time.
    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self.op_state, OpState::Pending | OpState::Running)
    }

    /// Serial number assigned at creation.
    #[inline]
    pub fn serial(&self) -> u8 {
        self.serial
    }

    /// Current operational state.
    #[inline]
    pub fn op_state(&self) -> OpState {
        self.op_state
    }

    /// Time between runs.
    #[inline]
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Next instant the task may run at.
    #[inline]
    pub fn next_due(&self) -> TimeInstant {
        self.next_due
    }

    /// Halt the system from inside a step function.
    pub fn error_stop(&self, message: &str) -> ! {
        kernel::error_stop(self.serial, &self.op_state, message)
    }
}

// ---------------------------------------------------------------------------
// Task behaviour
// ---------------------------------------------------------------------------

/// Per-task behaviour: one step of the task's own state machine.
pub trait Steppable {
    /// The task's application states.
    type State: Copy + PartialEq + fmt::Debug;

    /// Do one unit of work in `state`. Return the state to move to, or
    /// `None` to stay put.
    fn step(&mut self, ctl: &mut TaskControl, state: Self::State) -> Option<Self::State>;
}

/// What the scheduler needs from a task, independent of its state type.
pub trait Schedulable {
    /// Offer the task a chance to run at `now`. Returns true if it ran.
    fn schedule(&mut self, now: TimeInstant) -> bool;

    /// Serial number assigned at creation.
    fn serial(&self) -> u8;

    /// True if the task will run on the next pass no matter the time.
    fn is_ready(&self) -> bool;
}

/// A [`Steppable`] plus its scheduling bookkeeping.
pub struct Task<S: Steppable> {
    control: TaskControl,
    state: S::State,
    stepper: S,
}

impl<S: Steppable> Task<S> {
    /// A task that runs `stepper` every `interval`, starting in
    /// `initial_state`. It is due immediately.
    pub fn new(interval: Interval, initial_state: S::State, stepper: S) -> Self {
        Self {
            control: TaskControl::new(interval),
            state: initial_state,
            stepper,
        }
    }

    /// Change the time between runs. Takes effect after the next run.
    pub fn set_interval(&mut self, interval: Interval) {
        self.control.interval = interval;
    }

    /// Move the next due time.
    pub fn set_next_due(&mut self, next_due: TimeInstant) {
        self.control.next_due = next_due;
    }

    /// Overwrite the application state without running a step.
    pub fn set_initial_state(&mut self, state: S::State) {
        self.state = state;
    }

    /// Current application state.
    pub fn state(&self) -> S::State {
        self.state
    }

    /// Scheduling bookkeeping.
    pub fn control(&self) -> &TaskControl {
        &self.control
    }

    /// See [`TaskControl::suspend`].
    pub fn suspend(&mut self) {
        self.control.suspend();
    }

    /// See [`TaskControl::resume`].
    pub fn resume(&mut self) {
        self.control.resume();
    }

    /// See [`TaskControl::run_again_asap`].
    pub fn run_again_asap(&mut self) {
        self.control.run_again_asap();
    }

    /// The task's behaviour object.
    pub fn stepper(&self) -> &S {
        &self.stepper
    }

    /// The task's behaviour object, for sending it commands.
    pub fn stepper_mut(&mut self) -> &mut S {
        &mut self.stepper
    }

    /// Offer the task a chance to run at `now`. Returns true if it ran.
    pub fn schedule(&mut self, now: TimeInstant) -> bool {
        match self.control.op_state {
            OpState::Suspended => return false,
            OpState::Waiting if !now.is_at_or_after(self.control.next_due) => return false,
            OpState::Waiting | OpState::Pending => {}
            OpState::Running | OpState::Blocked => kernel::error_stop(
                self.control.serial,
                &self.control.op_state,
                "illegal state at schedule",
            ),
        }

        self.control.op_state = OpState::Waiting;
        if let Some(next) = self.stepper.step(&mut self.control, self.state) {
            #[cfg(feature = "trace_transitions")]
            log::trace!(
                "task {}: {:?} -> {:?}",
                self.control.serial,
                self.state,
                next
            );
            self.state = next;
        }

        if self.control.op_state == OpState::Waiting {
            self.control.next_due += self.control.interval;
        }
        true
    }
}

impl<S: Steppable> Schedulable for Task<S> {
    fn schedule(&mut self, now: TimeInstant) -> bool {
        Task::schedule(self, now)
    }

    fn serial(&self) -> u8 {
        self.control.serial
    }

    fn is_ready(&self) -> bool {
        self.control.is_ready()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

//! # Synchronization Primitives
//!
//! Interrupt-safe critical section helpers. The decoder counters and the
//! clock overflow tally are the only state shared between interrupt handlers
//! and the cooperative main loop, and both live in [`IrqCell`]s.
//!
//! On the target the critical section masks interrupts (the single-core
//! implementation from `cortex-m`). Host test builds use the `std`
//! implementation of the `critical-section` crate.

use core::cell::{Cell, RefCell};

pub use critical_section::CriticalSection;
use critical_section::Mutex;

/// Execute a closure within a critical section (interrupts disabled).
///
/// Keep the closure to a few loads and stores. Every microsecond spent here
/// delays the encoder edge interrupts, which bounds the fastest shaft speed
/// the decoder can follow.
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce(CriticalSection) -> R,
{
    critical_section::with(f)
}

/// A value shared with interrupt handlers, only reachable inside a
/// critical section.
pub struct IrqCell<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> IrqCell<T> {
    /// Wrap `value` for shared access.
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Run `f` with exclusive access to the value.
    #[inline]
    pub fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section(|cs| f(&mut *self.inner.borrow_ref_mut(cs)))
    }
}

impl<T: Copy> IrqCell<T> {
    /// Copy the value out.
    #[inline]
    pub fn snapshot(&self) -> T {
        critical_section(|cs| *self.inner.borrow_ref(cs))
    }
}

/// A plain counter shared with interrupt handlers.
pub struct IrqCounter<T> {
    inner: Mutex<Cell<T>>,
}

impl<T: Copy> IrqCounter<T> {
    /// Create a counter starting at `value`.
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(Cell::new(value)),
        }
    }

    /// Read the counter inside an already-open critical section.
    #[inline]
    pub fn get(&self, cs: CriticalSection) -> T {
        self.inner.borrow(cs).get()
    }

    /// Overwrite the counter inside an already-open critical section.
    #[inline]
    pub fn set(&self, cs: CriticalSection, value: T) {
        self.inner.borrow(cs).set(value)
    }
}

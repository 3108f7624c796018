//! # Monotonic Clock
//!
//! A 16-bit free-running hardware counter extended to 32 bits by a software
//! tally of its overflows. The timer's overflow interrupt calls
//! [`MonotonicClock::on_overflow`] once per wrap; everything else reads the
//! combined value with [`MonotonicClock::now`].
//!
//! ## Hazards
//!
//! - A wrap that happens while interrupts are masked is still pending when
//!   [`MonotonicClock::now`] runs. `now` sees the pending flag and counts it,
//!   so the result never pairs a fresh count with a stale tally.
//! - If interrupts stay masked for longer than one counter period (65.5 ms at
//!   1 MHz) a second overflow is lost and the clock silently falls back by
//!   one period. Nothing here detects that.
//! - [`MonotonicClock::reset`] to an earlier time is not corrected for.
//!   Instants compare by wrapped difference, so a task whose due time now
//!   sits less than half the range ahead waits out the jump, and one pushed
//!   more than half the range ahead looks overdue and runs back to back
//!   until its due time passes the clock.

use crate::sync::{self, IrqCounter};
use crate::time::TimeInstant;

/// A 16-bit hardware counter that counts up at the clock rate and wraps
/// from `0xFFFF` to `0`.
pub trait HardwareCounter {
    /// Current counter value.
    fn read(&self) -> u16;

    /// Load a new counter value.
    fn write(&self, value: u16);

    /// True if the counter has wrapped and the overflow interrupt has not
    /// run yet.
    fn overflow_pending(&self) -> bool;
}

/// Anything that can tell the scheduler what time it is.
pub trait TimeSource {
    /// Current time.
    fn now(&self) -> TimeInstant;
}

/// Hardware counter plus overflow tally, read as one 32-bit instant.
pub struct MonotonicClock<C> {
    counter: C,
    overflows: IrqCounter<u16>,
}

impl<C: HardwareCounter> MonotonicClock<C> {
    /// Build a clock on top of `counter`. The overflow tally starts at zero.
    pub const fn new(counter: C) -> Self {
        Self {
            counter,
            overflows: IrqCounter::new(0),
        }
    }

    /// Sample the counter and the tally together.
    ///
    /// Both halves are read inside one critical section so the overflow
    /// interrupt cannot land between them. A wrap the interrupt has not
    /// serviced yet is counted here, and the counter is read again after it.
    #[inline]
    pub fn now(&self) -> TimeInstant {
        sync::critical_section(|cs| {
            let overflows = self.overflows.get(cs);
            let count = self.counter.read();
            if self.counter.overflow_pending() {
                TimeInstant::from_halves(overflows.wrapping_add(1), self.counter.read())
            } else {
                TimeInstant::from_halves(overflows, count)
            }
        })
    }

    /// Set the clock to `to`.
    ///
    /// Not used in normal operation; see the module docs for what happens to
    /// task due times when the clock goes backward.
    pub fn reset(&self, to: TimeInstant) {
        let (overflows, count) = to.halves();
        sync::critical_section(|cs| {
            self.counter.write(count);
            self.overflows.set(cs, overflows);
        });
    }

    /// Count one hardware overflow. Call exactly once from the timer's
    /// overflow interrupt.
    #[inline]
    pub fn on_overflow(&self) {
        sync::critical_section(|cs| {
            let tally = self.overflows.get(cs);
            self.overflows.set(cs, tally.wrapping_add(1));
        });
    }

    /// The underlying hardware counter.
    pub fn counter(&self) -> &C {
        &self.counter
    }
}

impl<C: HardwareCounter> TimeSource for MonotonicClock<C> {
    #[inline]
    fn now(&self) -> TimeInstant {
        MonotonicClock::now(self)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use core::cell::Cell;

    /// Counter register and update flag stand-in.
    #[derive(Default)]
    pub(crate) struct FakeCounter {
        count: Cell<u16>,
        pending: Cell<bool>,
    }

    impl FakeCounter {
        /// Wrap to `count` without servicing the interrupt.
        pub(crate) fn wrap_to(&self, count: u16) {
            self.count.set(count);
            self.pending.set(true);
        }
    }

    impl HardwareCounter for FakeCounter {
        fn read(&self) -> u16 {
            self.count.get()
        }

        fn write(&self, value: u16) {
            self.count.set(value)
        }

        fn overflow_pending(&self) -> bool {
            self.pending.get()
        }
    }

    pub(crate) fn clock() -> MonotonicClock<FakeCounter> {
        MonotonicClock::new(FakeCounter::default())
    }

    /// What the timer interrupt does: clear the flag, count the wrap.
    fn service(clock: &MonotonicClock<FakeCounter>) {
        clock.counter().pending.set(false);
        clock.on_overflow();
    }

    #[test]
    fn test_counter_is_low_half() {
        let clock = clock();
        clock.counter().write(1234);
        assert_eq!(clock.now().as_micros(), 1234);
    }

    #[test]
    fn test_overflow_is_high_half() {
        let clock = clock();
        clock.counter().write(0xFFFF);
        assert_eq!(clock.now().as_micros(), 0xFFFF);

        // Hardware wraps and the interrupt fires
        clock.counter().wrap_to(0x0003);
        service(&clock);
        assert_eq!(clock.now().as_micros(), 0x0001_0003);
    }

    #[test]
    fn test_unserviced_wrap_is_counted() {
        let clock = clock();
        clock.counter().write(0xFFF0);
        let before = clock.now();

        // Wrapped with interrupts masked
        clock.counter().wrap_to(0x0002);
        assert_eq!(clock.now().as_micros(), 0x0001_0002);
        assert!(clock.now().is_at_or_after(before));

        // Once serviced the reading does not move
        service(&clock);
        assert_eq!(clock.now().as_micros(), 0x0001_0002);
    }

    #[test]
    fn test_reset_sets_both_halves() {
        let clock = clock();
        clock.reset(TimeInstant::from_micros(0x0042_0100));
        assert_eq!(clock.counter().read(), 0x0100);
        assert_eq!(clock.now().as_micros(), 0x0042_0100);
    }

    #[test]
    fn test_tally_wraps_to_zero() {
        let clock = clock();
        clock.reset(TimeInstant::from_micros(0xFFFF_FFF0));
        let before = clock.now();
        clock.counter().wrap_to(0x0010);
        service(&clock);
        let after = clock.now();
        assert_eq!(after.as_micros(), 0x10);
        assert!(after.is_at_or_after(before));
    }
}

//! # Time Values
//!
//! [`TimeInstant`] is a point on the free-running 32-bit microsecond clock
//! and [`Interval`] is a span between two such points. Both are plain `u32`
//! newtypes; all arithmetic wraps.
//!
//! ## Wraparound
//!
//! The clock wraps every 2^32 µs (about 71 minutes). Instants are compared
//! by subtracting them as unsigned numbers and reading the difference as
//! signed, so an instant just past the wrap is still "later" than one just
//! before it:
//!
//! ```text
//!   0xFFFF_FFF0 ──(+0x20)──► 0x0000_0010
//!   0x0000_0010 - 0xFFFF_FFF0 = 0x20  (as i32: +32, so later)
//! ```
//!
//! This holds as long as the real difference stays under 2^31 µs (about
//! 35 minutes). There is deliberately no `Ord` impl: the relation is not
//! transitive over the whole range.

use core::fmt;
use core::ops::{Add, AddAssign, Sub};

/// Microseconds in one second.
pub const MICROS_PER_SEC: u32 = 1_000_000;

/// A reading of the monotonic clock, in microseconds since an arbitrary
/// epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeInstant(u32);

impl TimeInstant {
    /// The clock epoch.
    pub const ZERO: TimeInstant = TimeInstant(0);

    /// Wrap a raw microsecond count.
    #[inline]
    pub const fn from_micros(micros: u32) -> Self {
        Self(micros)
    }

    /// Combine a hardware counter reading with the overflow tally.
    #[inline]
    pub const fn from_halves(overflows: u16, count: u16) -> Self {
        Self(((overflows as u32) << 16) | count as u32)
    }

    /// Split into `(overflows, count)`, the inverse of [`from_halves`](Self::from_halves).
    #[inline]
    pub const fn halves(self) -> (u16, u16) {
        ((self.0 >> 16) as u16, self.0 as u16)
    }

    /// Raw microsecond count.
    #[inline]
    pub const fn as_micros(self) -> u32 {
        self.0
    }

    /// True if `self` is at or after `other`, allowing for counter wrap.
    #[inline]
    pub const fn is_at_or_after(self, other: TimeInstant) -> bool {
        (self.0.wrapping_sub(other.0) as i32) >= 0
    }

    /// Time elapsed since `earlier`.
    #[inline]
    pub const fn since(self, earlier: TimeInstant) -> Interval {
        Interval(self.0.wrapping_sub(earlier.0))
    }
}

impl Add<Interval> for TimeInstant {
    type Output = TimeInstant;

    #[inline]
    fn add(self, rhs: Interval) -> TimeInstant {
        TimeInstant(self.0.wrapping_add(rhs.0))
    }
}

impl AddAssign<Interval> for TimeInstant {
    #[inline]
    fn add_assign(&mut self, rhs: Interval) {
        self.0 = self.0.wrapping_add(rhs.0);
    }
}

impl Sub<TimeInstant> for TimeInstant {
    type Output = Interval;

    #[inline]
    fn sub(self, rhs: TimeInstant) -> Interval {
        self.since(rhs)
    }
}

impl Sub<Interval> for TimeInstant {
    type Output = TimeInstant;

    #[inline]
    fn sub(self, rhs: Interval) -> TimeInstant {
        TimeInstant(self.0.wrapping_sub(rhs.0))
    }
}

impl fmt::Display for TimeInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Interval(self.0), f)
    }
}

/// A span of time in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Interval(u32);

impl Interval {
    /// No time at all. A task with this interval runs every time it is offered.
    pub const ZERO: Interval = Interval(0);

    /// Span of `micros` microseconds.
    #[inline]
    pub const fn from_micros(micros: u32) -> Self {
        Self(micros)
    }

    /// Span of `millis` milliseconds.
    #[inline]
    pub const fn from_millis(millis: u32) -> Self {
        Self(millis.wrapping_mul(1000))
    }

    /// Span of `secs` seconds.
    #[inline]
    pub const fn from_secs(secs: u32) -> Self {
        Self(secs.wrapping_mul(MICROS_PER_SEC))
    }

    /// Span of `secs` seconds plus `micros` microseconds.
    #[inline]
    pub const fn from_secs_micros(secs: u32, micros: u32) -> Self {
        Self(secs.wrapping_mul(MICROS_PER_SEC).wrapping_add(micros))
    }

    /// Raw microsecond count.
    #[inline]
    pub const fn as_micros(self) -> u32 {
        self.0
    }

    /// Split into whole seconds and the remaining microseconds. Only meant
    /// for display.
    #[inline]
    pub const fn to_seconds_and_fraction(self) -> (u32, u32) {
        (self.0 / MICROS_PER_SEC, self.0 % MICROS_PER_SEC)
    }
}

impl Add for Interval {
    type Output = Interval;

    #[inline]
    fn add(self, rhs: Interval) -> Interval {
        Interval(self.0.wrapping_add(rhs.0))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (secs, micros) = self.to_seconds_and_fraction();
        write!(f, "{}.{:06}", secs, micros)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::format;

    #[test]
    fn test_later_across_wrap() {
        let a = TimeInstant::from_micros(0xFFFF_FFF0);
        let b = a + Interval::from_micros(0x20);
        assert_eq!(b.as_micros(), 0x10);
        assert!(b.is_at_or_after(a));
        assert!(!a.is_at_or_after(b));
    }

    #[test]
    fn test_later_for_any_half_range_step() {
        for &start in &[0u32, 1, 0x7FFF_FFFF, 0x8000_0000, 0xFFFF_FFFF] {
            for &step in &[1u32, 1000, 0x7FFF_FFFF] {
                let a = TimeInstant::from_micros(start);
                let b = a + Interval::from_micros(step);
                assert!(b.is_at_or_after(a), "start {:#x} step {:#x}", start, step);
            }
        }
    }

    #[test]
    fn test_equal_instants_compare_at_or_after() {
        let t = TimeInstant::from_micros(1234);
        assert!(t.is_at_or_after(t));
    }

    #[test]
    fn test_difference_across_wrap() {
        let a = TimeInstant::from_micros(0xFFFF_FF00);
        let b = TimeInstant::from_micros(0x0000_0100);
        assert_eq!(b - a, Interval::from_micros(0x200));
        assert_eq!(b - Interval::from_micros(0x200), a);
    }

    #[test]
    fn test_halves() {
        let t = TimeInstant::from_halves(0x0012, 0x3456);
        assert_eq!(t.as_micros(), 0x0012_3456);
        assert_eq!(t.halves(), (0x0012, 0x3456));
    }

    #[test]
    fn test_seconds_and_fraction() {
        let span = Interval::from_secs_micros(3, 250_000);
        assert_eq!(span.to_seconds_and_fraction(), (3, 250_000));
        assert_eq!(format!("{}", span), "3.250000");
        assert_eq!(format!("{}", TimeInstant::from_micros(42)), "0.000042");
    }

    #[test]
    fn test_interval_constructors() {
        assert_eq!(Interval::from_millis(10).as_micros(), 10_000);
        assert_eq!(Interval::from_secs(2).as_micros(), 2_000_000);
    }
}

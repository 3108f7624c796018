//! Status task: one diagnostic line per run with the uptime and the
//! encoder counters.

use log::debug;

use crate::clock::TimeSource;
use crate::encoder::SharedEncoder;
use crate::task::{Steppable, TaskControl};

/// The status task has a single state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusState {
    /// Log one line and wait for the next interval.
    Report,
}

/// Periodic uptime and encoder report.
pub struct StatusTask<'a, T> {
    clock: &'a T,
    encoder: &'a SharedEncoder,
    reports: u32,
}

impl<'a, T: TimeSource> StatusTask<'a, T> {
    /// Report on `encoder`, stamping each line with `clock`.
    pub fn new(clock: &'a T, encoder: &'a SharedEncoder) -> Self {
        Self {
            clock,
            encoder,
            reports: 0,
        }
    }

    /// Reports written so far.
    pub fn reports(&self) -> u32 {
        self.reports
    }
}

impl<'a, T: TimeSource> Steppable for StatusTask<'a, T> {
    type State = StatusState;

    fn step(&mut self, ctl: &mut TaskControl, _state: StatusState) -> Option<StatusState> {
        // Uptime wraps with the clock, after about 71 minutes
        let uptime = self.clock.now();
        let encoder = self.encoder.read_positions();
        debug!("status {}: up {} s, {}", ctl.serial(), uptime, encoder);
        self.reports = self.reports.wrapping_add(1);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::EncoderConfig;
    use crate::task::{OpState, Task};
    use crate::time::{Interval, TimeInstant};

    struct FixedClock(TimeInstant);

    impl TimeSource for FixedClock {
        fn now(&self) -> TimeInstant {
            self.0
        }
    }

    #[test]
    fn test_reports_once_per_interval() {
        let clock = FixedClock(TimeInstant::from_micros(1_500_000));
        let encoder = SharedEncoder::new(EncoderConfig::new(20, 4));
        let mut t = Task::new(
            Interval::from_secs(1),
            StatusState::Report,
            StatusTask::new(&clock, &encoder),
        );

        let second = |s: u32| TimeInstant::from_micros(s * 1_000_000);
        assert!(t.schedule(second(0)));
        assert!(!t.schedule(TimeInstant::from_micros(999_999)));
        assert!(t.schedule(second(1)));
        assert!(t.schedule(second(2)));

        assert_eq!(t.stepper().reports(), 3);
        assert_eq!(t.state(), StatusState::Report);
        assert_eq!(t.control().op_state(), OpState::Waiting);
        assert_eq!(t.control().next_due(), second(3));
    }
}

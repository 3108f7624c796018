//! # Scanhead Configuration
//!
//! Compile-time constants for one deployment of the sensor head. There is
//! no runtime configuration: everything here is fixed when the firmware is
//! built.

use log::LevelFilter;

use crate::control::{ControllerConfig, Gains};
use crate::encoder::EncoderConfig;
use crate::tasks::motor::ScanConfig;
use crate::time::Interval;

/// Diagnostic serial port speed.
pub const BAUD_RATE: u32 = 115_200;

/// Most verbose log level written to the diagnostic port. `Debug` includes
/// the once-a-second status line.
pub const LOG_LEVEL: LevelFilter = LevelFilter::Debug;

/// Core clock frequency in Hz (STM32F401 running from the 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Rate of the free-running clock counter. One count is one microsecond, so
/// a [`TimeInstant`](crate::time::TimeInstant) wraps after about 71 minutes
/// and compares correctly for spans under about 35 minutes.
pub const CLOCK_COUNTER_HZ: u32 = 1_000_000;

/// Motor PWM carrier frequency, above the audible range.
pub const PWM_FREQUENCY_HZ: u32 = 20_000;

/// Encoder pulses per revolution of the motor shaft.
pub const TICKS_PER_REV: u32 = 2016;

/// Reduction between the motor shaft and the sensor head.
pub const GEAR_RATIO: u32 = 16;

/// Encoder geometry shared by the decoder and the controller.
pub const ENCODER: EncoderConfig = EncoderConfig::new(TICKS_PER_REV, GEAR_RATIO);

/// Position loop gains used when the motor task starts.
pub const POSITION_GAINS: Gains = Gains { kp: 7, ki: 0 };

/// Largest motor command magnitude. Power is an 8-bit duty cycle plus a
/// direction.
pub const POWER_LIMIT: i16 = 255;

/// Ceiling on the integral accumulator, in degree-updates.
///
/// With `ki = 1` this alone can reach `POWER_LIMIT`, so the accumulator can
/// saturate the output but never climb far past it.
pub const INTEGRAL_LIMIT: i32 = 255;

/// Position loop limits and starting gains.
pub const POSITION_LOOP: ControllerConfig = ControllerConfig {
    gains: POSITION_GAINS,
    power_limit: POWER_LIMIT,
    integral_limit: INTEGRAL_LIMIT,
};

/// Interval between runs of the motor task. The position loop runs at this
/// rate while the head is holding a target.
pub const MOTOR_TASK_INTERVAL: Interval = Interval::from_millis(1);

/// Interval between status reports.
pub const STATUS_TASK_INTERVAL: Interval = Interval::from_secs(1);

/// Motor power, in percent, used while sweeping.
pub const SCAN_POWER_PCT: i8 = 30;

/// Sweep turns around once the head passes this angle going forward.
pub const SCAN_UPPER_DEGREES: i32 = 350;

/// Sweep turns around once the head drops below this angle going backward.
pub const SCAN_LOWER_DEGREES: i32 = 10;

/// Motor task runs to wait after a reversal before checking the sweep
/// limits again, so the head has time to leave the limit zone.
pub const SCAN_REVERSAL_HOLDOFF: u16 = 1000;

/// A held position is considered stable when the angular error is smaller
/// than this many degrees.
pub const POSITION_TOLERANCE_DEGREES: i32 = 2;

/// Sweep parameters handed to the motor task.
pub const SCAN: ScanConfig = ScanConfig {
    power_pct: SCAN_POWER_PCT,
    upper_degrees: SCAN_UPPER_DEGREES,
    lower_degrees: SCAN_LOWER_DEGREES,
    reversal_holdoff: SCAN_REVERSAL_HOLDOFF,
    tolerance_degrees: POSITION_TOLERANCE_DEGREES,
};

//! # Position Control
//!
//! Integer PI position loop for a rotating axis fed by the quadrature
//! decoder.
//!
//! Each [`update`](PositionController::update):
//!
//! 1. snapshots the decoder and converts ticks to degrees,
//! 2. takes the shortest signed path to the target, in (-180, 180],
//! 3. adds that error to the integral, clamped to the anti-windup ceiling,
//! 4. computes `error * kp + integral * ki`,
//! 5. clamps the result to the motor's power range,
//! 6. sends it to the motor.
//!
//! All arithmetic is integer. Saturation is silent; a motor that refuses the
//! command (brake engaged) is logged and otherwise ignored.

use core::fmt;

use log::warn;

use crate::encoder::{EncoderSnapshot, SharedEncoder};
use crate::motor::MotorOutput;

/// Proportional and integral gains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gains {
    /// Power per degree of error.
    pub kp: i32,
    /// Power per accumulated degree-update.
    pub ki: i32,
}

/// Which encoder counter the loop closes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Motor shaft, one turn per `ticks_per_rev`.
    Shaft,
    /// Gear-train output, one turn per `ticks_per_rev * gear_ratio`.
    Gear,
}

/// Limits and starting gains for a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Gains used until [`PositionController::start_with_gains`] changes them.
    pub gains: Gains,
    /// Output clamp, applied symmetrically.
    pub power_limit: i16,
    /// Integral clamp, applied symmetrically.
    pub integral_limit: i32,
}

/// Signed shortest-path error from `current` to `target`, both in degrees,
/// folded into (-180, 180].
pub fn angular_error(target: i32, current: i32) -> i32 {
    let mut error = target - current;
    if error > 180 {
        error -= 360;
    } else if error <= -180 {
        error += 360;
    }
    error
}

/// Convert a tick count to whole degrees (truncating).
#[inline]
pub fn ticks_to_degrees(ticks: u32, ticks_per_turn: u32) -> i32 {
    ((ticks as u64 * 360) / ticks_per_turn as u64) as i32
}

/// Controller state worth printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerStatus {
    /// Active gains
    pub gains: Gains,
    /// Target in degrees
    pub target: i32,
    /// Error seen by the last update
    pub error: i32,
    /// Integral accumulator
    pub integral: i32,
    /// Last power command
    pub power: i16,
    /// Encoder counters at the time of the report
    pub encoder: EncoderSnapshot,
    /// Controlled axis position in degrees
    pub degrees: i32,
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "kp {} ki {} target {} at {} deg (err {}, sum {}) power {} [{}]",
            self.gains.kp,
            self.gains.ki,
            self.target,
            self.degrees,
            self.error,
            self.integral,
            self.power,
            self.encoder
        )
    }
}

/// PI position controller for one motor axis.
pub struct PositionController<'e, M> {
    encoder: &'e SharedEncoder,
    motor: M,
    axis: Axis,
    ticks_per_turn: u32,
    gains: Gains,
    power_limit: i16,
    integral_limit: i32,
    target: i32,
    integral: i32,
    error: i32,
    power: i16,
}

impl<'e, M: MotorOutput> PositionController<'e, M> {
    /// Controller for `axis`, reading `encoder` and driving `motor`. The
    /// target starts at 0 degrees.
    pub fn new(encoder: &'e SharedEncoder, motor: M, axis: Axis, config: ControllerConfig) -> Self {
        let geometry = encoder.config();
        let ticks_per_turn = match axis {
            Axis::Shaft => geometry.ticks_per_rev(),
            Axis::Gear => geometry.gear_ticks_per_rev(),
        };
        Self {
            encoder,
            motor,
            axis,
            ticks_per_turn,
            gains: config.gains,
            power_limit: config.power_limit,
            integral_limit: config.integral_limit,
            target: 0,
            integral: 0,
            error: 0,
            power: 0,
        }
    }

    /// Begin holding `target` degrees. Clears the integral; does not move
    /// the motor until the next [`update`](Self::update).
    pub fn start(&mut self, target: i32) {
        self.target = target;
        self.integral = 0;
    }

    /// Like [`start`](Self::start), replacing the gains as well.
    pub fn start_with_gains(&mut self, target: i32, kp: i32, ki: i32) {
        self.gains = Gains { kp, ki };
        self.start(target);
    }

    /// Move the target without clearing the integral.
    pub fn change_target(&mut self, target: i32) {
        self.target = target;
    }

    /// Run one control tick and return the power sent to the motor.
    pub fn update(&mut self) -> i16 {
        let current = self.position_degrees();
        self.error = angular_error(self.target, current);

        self.integral = (self.integral + self.error).clamp(-self.integral_limit, self.integral_limit);

        let demand = self.error as i64 * self.gains.kp as i64
            + self.integral as i64 * self.gains.ki as i64;
        let limit = self.power_limit as i64;
        self.power = demand.clamp(-limit, limit) as i16;

        if let Err(err) = self.motor.set_power(self.power) {
            warn!("position loop: motor rejected {}: {}", self.power, err);
        }
        self.power
    }

    /// Current position of the controlled axis in degrees.
    pub fn position_degrees(&self) -> i32 {
        let snapshot = self.encoder.read_positions();
        self.degrees_of(&snapshot)
    }

    /// Make the current encoder position the zero angle.
    pub fn set_reference(&mut self) {
        self.encoder.set_reference();
    }

    /// Target in degrees.
    pub fn target(&self) -> i32 {
        self.target
    }

    /// Active gains.
    pub fn gains(&self) -> Gains {
        self.gains
    }

    /// Integral accumulator.
    pub fn integral(&self) -> i32 {
        self.integral
    }

    /// Error from the last update.
    pub fn last_error(&self) -> i32 {
        self.error
    }

    /// Power from the last update.
    pub fn power(&self) -> i16 {
        self.power
    }

    /// Controlled axis.
    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// The motor, for open-loop commands while the loop is idle.
    pub fn motor_mut(&mut self) -> &mut M {
        &mut self.motor
    }

    /// Snapshot of everything worth logging.
    pub fn status(&self) -> ControllerStatus {
        let encoder = self.encoder.read_positions();
        ControllerStatus {
            gains: self.gains,
            target: self.target,
            error: self.error,
            integral: self.integral,
            power: self.power,
            degrees: self.degrees_of(&encoder),
            encoder,
        }
    }

    fn degrees_of(&self, snapshot: &EncoderSnapshot) -> i32 {
        let ticks = match self.axis {
            Axis::Shaft => snapshot.shaft_ticks,
            Axis::Gear => snapshot.gear_ticks,
        };
        ticks_to_degrees(ticks, self.ticks_per_turn)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::encoder::tests::spin;
    use crate::encoder::EncoderConfig;
    use crate::motor::tests::FakeMotor;
    use std::format;

    const GEOMETRY: EncoderConfig = EncoderConfig::new(2016, 16);

    const CONFIG: ControllerConfig = ControllerConfig {
        gains: Gains { kp: 7, ki: 0 },
        power_limit: 255,
        integral_limit: 255,
    };

    /// Gear ticks per degree is 89.6, so 896 ticks is exactly 10 degrees.
    const TEN_DEGREES: i32 = 896;

    #[test]
    fn test_angular_error_takes_short_way() {
        assert_eq!(angular_error(10, 350), 20);
        assert_eq!(angular_error(350, 10), -20);
        assert_eq!(angular_error(90, 0), 90);
        assert_eq!(angular_error(0, 180), 180);
        assert_eq!(angular_error(180, 0), 180);
        assert_eq!(angular_error(0, 0), 0);
    }

    #[test]
    fn test_ticks_to_degrees_truncates() {
        assert_eq!(ticks_to_degrees(0, 32256), 0);
        assert_eq!(ticks_to_degrees(89, 32256), 0);
        assert_eq!(ticks_to_degrees(90, 32256), 1);
        assert_eq!(ticks_to_degrees(32255, 32256), 359);
    }

    #[test]
    fn test_update_across_zero() {
        let encoder = SharedEncoder::new(GEOMETRY);
        spin(&encoder, -TEN_DEGREES);

        let mut pid = PositionController::new(&encoder, FakeMotor::default(), Axis::Gear, CONFIG);
        assert_eq!(pid.position_degrees(), 350);

        pid.start_with_gains(10, 1, 0);
        let power = pid.update();
        assert_eq!(pid.last_error(), 20);
        assert_eq!(power, 20);
        assert_eq!(pid.motor_mut().power, 20);
    }

    #[test]
    fn test_output_saturates_with_sign() {
        let encoder = SharedEncoder::new(GEOMETRY);
        let mut pid = PositionController::new(&encoder, FakeMotor::default(), Axis::Gear, CONFIG);

        pid.start_with_gains(90, 50, 0);
        assert_eq!(pid.update(), 255);
        assert_eq!(pid.motor_mut().power, 255);

        pid.start(270);
        assert_eq!(pid.last_error(), 90);
        assert_eq!(pid.update(), -255);
        assert_eq!(pid.motor_mut().power, -255);
    }

    #[test]
    fn test_integral_is_clamped() {
        let encoder = SharedEncoder::new(GEOMETRY);
        let mut pid = PositionController::new(&encoder, FakeMotor::default(), Axis::Gear, CONFIG);

        pid.start_with_gains(100, 0, 1);
        for _ in 0..10 {
            pid.update();
        }
        assert_eq!(pid.integral(), 255);
        assert_eq!(pid.power(), 255);

        // Unwinds immediately once the error flips
        pid.change_target(260);
        pid.update();
        assert_eq!(pid.integral(), 155);
    }

    #[test]
    fn test_change_target_keeps_integral() {
        let encoder = SharedEncoder::new(GEOMETRY);
        let mut pid = PositionController::new(&encoder, FakeMotor::default(), Axis::Gear, CONFIG);

        pid.start_with_gains(5, 1, 1);
        pid.update();
        pid.update();
        assert_eq!(pid.integral(), 10);

        pid.change_target(6);
        assert_eq!(pid.integral(), 10);
        assert_eq!(pid.update(), 6 + 16);

        pid.start(6);
        assert_eq!(pid.integral(), 0);
    }

    #[test]
    fn test_braked_motor_does_not_stop_loop() {
        let encoder = SharedEncoder::new(GEOMETRY);
        let mut pid = PositionController::new(&encoder, FakeMotor::default(), Axis::Gear, CONFIG);
        pid.motor_mut().set_brake(true).unwrap();

        pid.start(30);
        assert_eq!(pid.update(), 210);
        assert_eq!(pid.motor_mut().commands, 0);
    }

    #[test]
    fn test_shaft_axis_uses_shaft_counter() {
        let encoder = SharedEncoder::new(GEOMETRY);
        spin(&encoder, 504);
        let pid = PositionController::new(&encoder, FakeMotor::default(), Axis::Shaft, CONFIG);
        assert_eq!(pid.position_degrees(), 90);
    }

    #[test]
    fn test_status_display() {
        let encoder = SharedEncoder::new(GEOMETRY);
        let mut pid = PositionController::new(&encoder, FakeMotor::default(), Axis::Gear, CONFIG);
        pid.start(3);
        pid.update();
        let text = format!("{}", pid.status());
        assert_eq!(
            text,
            "kp 7 ki 0 target 3 at 0 deg (err 3, sum 3) power 21 [shaft 0 gear 0 errors 0]"
        );
    }

    #[test]
    fn test_set_reference_zeroes_position() {
        let encoder = SharedEncoder::new(GEOMETRY);
        spin(&encoder, 5000);
        let mut pid = PositionController::new(&encoder, FakeMotor::default(), Axis::Gear, CONFIG);
        assert_ne!(pid.position_degrees(), 0);
        pid.set_reference();
        assert_eq!(pid.position_degrees(), 0);
    }
}

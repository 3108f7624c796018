//! Motor task: sweeps the sensor head back and forth, or holds it at a
//! commanded angle with the position loop.
//!
//! ```text
//!   Init ──► Scanning ◄──────────────► MovingToTarget
//!               │  ▲   move_to_target()
//!   enable_brake│  │disable_brake()     return_to_scanning()
//!               ▼  │
//!              Brake
//! ```
//!
//! While scanning the motor runs open loop at a fixed power. Past the upper
//! limit it reverses, below the lower limit it goes forward again. After
//! each reversal the limit check is held off for a number of runs so the
//! head can leave the limit zone first.

use log::{info, warn};

use crate::control::{angular_error, PositionController};
use crate::motor::{MotorError, MotorOutput};
use crate::task::{Steppable, TaskControl};

/// Sweep limits and speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Open-loop power while sweeping, in percent.
    pub power_pct: i8,
    /// Reverse once the head is past this angle.
    pub upper_degrees: i32,
    /// Go forward once the head is below this angle.
    pub lower_degrees: i32,
    /// Runs to skip the limit check after a reversal.
    pub reversal_holdoff: u16,
    /// [`MotorTask::position_stable`] accepts errors smaller than this.
    pub tolerance_degrees: i32,
}

/// Motor task states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorState {
    /// Start the first sweep.
    Init,
    /// Sweeping open loop.
    Scanning,
    /// Position loop holding the target.
    MovingToTarget,
    /// Brake engaged.
    Brake,
}

/// The motor task and its command interface.
pub struct MotorTask<'e, M> {
    controller: PositionController<'e, M>,
    scan: ScanConfig,
    forward: bool,
    holdoff: u16,
    target: i32,
    brake_requested: bool,
    move_requested: bool,
}

impl<'e, M: MotorOutput> MotorTask<'e, M> {
    /// A task that starts sweeping forward with `controller`'s motor once
    /// scheduled. The target is 0° until changed.
    pub fn new(controller: PositionController<'e, M>, scan: ScanConfig) -> Self {
        Self {
            controller,
            scan,
            forward: true,
            holdoff: scan.reversal_holdoff,
            target: 0,
            brake_requested: false,
            move_requested: false,
        }
    }

    /// Set the target angle, in degrees. Wrapped into 0..360.
    pub fn change_position(&mut self, degrees: i32) {
        self.target = degrees.rem_euclid(360);
        self.controller.change_target(self.target);
    }

    /// Move the target angle by `delta` degrees.
    pub fn increment_position(&mut self, delta: i32) {
        // Both terms are below 360, so the sum cannot overflow
        self.change_position(self.target + delta.rem_euclid(360));
    }

    /// Leave the sweep and hold the target angle.
    pub fn move_to_target(&mut self) {
        self.move_requested = true;
    }

    /// Stop holding the target and go back to sweeping.
    pub fn return_to_scanning(&mut self) {
        self.move_requested = false;
    }

    /// Brake the motor. Honoured while scanning.
    pub fn enable_brake(&mut self) {
        info!("motor: brake requested");
        self.brake_requested = true;
    }

    /// Release the brake and resume sweeping.
    pub fn disable_brake(&mut self) {
        self.brake_requested = false;
    }

    /// True if the head is within tolerance of the target.
    pub fn position_stable(&self) -> bool {
        let error = angular_error(self.target, self.controller.position_degrees());
        error.abs() < self.scan.tolerance_degrees
    }

    /// Target angle in degrees.
    pub fn target(&self) -> i32 {
        self.target
    }

    /// Head angle in degrees.
    pub fn current_position(&self) -> i32 {
        self.controller.position_degrees()
    }

    /// The position loop.
    pub fn controller(&self) -> &PositionController<'e, M> {
        &self.controller
    }

    fn sweep(&mut self) {
        let pct = if self.forward {
            self.scan.power_pct
        } else {
            -self.scan.power_pct
        };
        let result = self.controller.motor_mut().set_power_pct(pct);
        report(result);
    }

    fn scanning(&mut self) -> Option<MotorState> {
        let current = self.controller.position_degrees();
        self.holdoff = self.holdoff.saturating_sub(1);

        if self.brake_requested {
            report(self.controller.motor_mut().set_brake(true));
            return Some(MotorState::Brake);
        }
        if self.move_requested {
            info!("motor: moving to {} deg", self.target);
            self.controller.start(self.target);
            return Some(MotorState::MovingToTarget);
        }

        if self.holdoff == 0 {
            if current > self.scan.upper_degrees {
                info!("motor: sweep back at {} deg", current);
                self.reverse(false);
            } else if current < self.scan.lower_degrees {
                info!("motor: sweep forward at {} deg", current);
                self.reverse(true);
            }
        }
        None
    }

    fn reverse(&mut self, forward: bool) {
        self.forward = forward;
        self.holdoff = self.scan.reversal_holdoff;
        self.sweep();
    }
}

fn report(result: Result<(), MotorError>) {
    if let Err(err) = result {
        warn!("motor: {}", err);
    }
}

impl<'e, M: MotorOutput> Steppable for MotorTask<'e, M> {
    type State = MotorState;

    fn step(&mut self, _ctl: &mut TaskControl, state: MotorState) -> Option<MotorState> {
        match state {
            MotorState::Init => {
                self.sweep();
                Some(MotorState::Scanning)
            }
            MotorState::Scanning => self.scanning(),
            MotorState::MovingToTarget => {
                self.controller.update();
                if self.move_requested {
                    return None;
                }
                info!("motor: back to scanning");
                self.sweep();
                Some(MotorState::Scanning)
            }
            MotorState::Brake => {
                if self.brake_requested {
                    return None;
                }
                info!("motor: brake released");
                report(self.controller.motor_mut().set_brake(false));
                self.sweep();
                Some(MotorState::Scanning)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{Axis, ControllerConfig, Gains};
    use crate::encoder::tests::spin;
    use crate::encoder::{EncoderConfig, SharedEncoder};
    use crate::motor::tests::FakeMotor;
    use crate::task::Task;
    use crate::time::{Interval, TimeInstant};

    const GEOMETRY: EncoderConfig = EncoderConfig::new(2016, 16);

    const LOOP: ControllerConfig = ControllerConfig {
        gains: Gains { kp: 7, ki: 0 },
        power_limit: 255,
        integral_limit: 255,
    };

    const SCAN: ScanConfig = ScanConfig {
        power_pct: 30,
        upper_degrees: 350,
        lower_degrees: 10,
        reversal_holdoff: 3,
        tolerance_degrees: 2,
    };

    /// 30 % of full power.
    const SWEEP: i16 = 76;

    fn task(encoder: &SharedEncoder) -> Task<MotorTask<'_, FakeMotor>> {
        let controller = PositionController::new(encoder, FakeMotor::default(), Axis::Gear, LOOP);
        Task::new(Interval::ZERO, MotorState::Init, MotorTask::new(controller, SCAN))
    }

    fn run(task: &mut Task<MotorTask<'_, FakeMotor>>, times: u32) {
        for _ in 0..times {
            assert!(task.schedule(TimeInstant::ZERO));
        }
    }

    fn power(task: &mut Task<MotorTask<'_, FakeMotor>>) -> i16 {
        task.stepper_mut().controller.motor_mut().power
    }

    #[test]
    fn test_init_starts_forward_sweep() {
        let encoder = SharedEncoder::new(GEOMETRY);
        let mut t = task(&encoder);
        run(&mut t, 1);
        assert_eq!(t.state(), MotorState::Scanning);
        assert_eq!(power(&mut t), SWEEP);
    }

    #[test]
    fn test_sweep_reverses_after_holdoff() {
        let encoder = SharedEncoder::new(GEOMETRY);
        let mut t = task(&encoder);
        run(&mut t, 1);

        // 800 ticks short of a full turn is 351 degrees
        spin(&encoder, -800);
        assert_eq!(t.stepper().current_position(), 351);
        run(&mut t, 2);
        assert_eq!(power(&mut t), SWEEP);
        run(&mut t, 1);
        assert_eq!(power(&mut t), -SWEEP);

        // Back round through zero to 5 degrees
        spin(&encoder, 800 + 448);
        assert_eq!(t.stepper().current_position(), 5);
        run(&mut t, 2);
        assert_eq!(power(&mut t), -SWEEP);
        run(&mut t, 1);
        assert_eq!(power(&mut t), SWEEP);
        assert_eq!(t.state(), MotorState::Scanning);
    }

    #[test]
    fn test_brake_and_release() {
        let encoder = SharedEncoder::new(GEOMETRY);
        let mut t = task(&encoder);
        run(&mut t, 1);

        t.stepper_mut().enable_brake();
        run(&mut t, 1);
        assert_eq!(t.state(), MotorState::Brake);
        assert!(t.stepper_mut().controller.motor_mut().braked);
        assert_eq!(power(&mut t), 0);

        run(&mut t, 5);
        assert_eq!(t.state(), MotorState::Brake);

        t.stepper_mut().disable_brake();
        run(&mut t, 1);
        assert_eq!(t.state(), MotorState::Scanning);
        assert!(!t.stepper_mut().controller.motor_mut().braked);
        assert_eq!(power(&mut t), SWEEP);
    }

    #[test]
    fn test_move_to_target_and_back() {
        let encoder = SharedEncoder::new(GEOMETRY);
        let mut t = task(&encoder);
        run(&mut t, 1);

        t.stepper_mut().change_position(90);
        t.stepper_mut().move_to_target();
        run(&mut t, 1);
        assert_eq!(t.state(), MotorState::MovingToTarget);

        run(&mut t, 1);
        assert_eq!(power(&mut t), 255);
        assert_eq!(t.stepper().controller().last_error(), 90);

        // 8064 ticks is exactly 90 degrees
        spin(&encoder, 8064);
        run(&mut t, 1);
        assert_eq!(power(&mut t), 0);
        assert!(t.stepper().position_stable());

        t.stepper_mut().return_to_scanning();
        run(&mut t, 1);
        assert_eq!(t.state(), MotorState::Scanning);
        assert_eq!(power(&mut t), SWEEP);
    }

    #[test]
    fn test_position_stable_tolerance() {
        let encoder = SharedEncoder::new(GEOMETRY);
        spin(&encoder, 8064);
        let mut t = task(&encoder);
        let motor = t.stepper_mut();

        motor.change_position(91);
        assert!(motor.position_stable());
        motor.change_position(88);
        assert!(!motor.position_stable());
        motor.change_position(93);
        assert!(!motor.position_stable());
    }

    #[test]
    fn test_target_wraps_into_one_turn() {
        let encoder = SharedEncoder::new(GEOMETRY);
        let mut t = task(&encoder);
        let motor = t.stepper_mut();

        motor.change_position(350);
        motor.increment_position(20);
        assert_eq!(motor.target(), 10);
        motor.increment_position(-30);
        assert_eq!(motor.target(), 340);
        assert_eq!(motor.controller().target(), 340);
    }

    #[test]
    fn test_extreme_increments_stay_in_one_turn() {
        let encoder = SharedEncoder::new(GEOMETRY);
        let mut t = task(&encoder);
        let motor = t.stepper_mut();

        motor.change_position(359);
        motor.increment_position(i32::MAX);
        // i32::MAX = 2147483647 = 5965232 * 360 + 127
        assert_eq!(motor.target(), 126);
        motor.increment_position(i32::MIN);
        // i32::MIN rem 360 = 232
        assert_eq!(motor.target(), 358);
    }
}

//! # Motor Output Stage
//!
//! The position controller and the motor task talk to the motor only
//! through [`MotorOutput`]: a signed power level (magnitude is duty cycle,
//! sign is direction) and a brake.
//!
//! [`HBridge`] drives a VNH3SP30-style bridge from `embedded-hal` pins: two
//! direction inputs (INA, INB) and one PWM line.
//!
//! | INA | INB | Bridge         |
//! |-----|-----|----------------|
//! | 1   | 0   | forward        |
//! | 0   | 1   | reverse        |
//! | 0   | 0   | brake to GND   |

use core::fmt;

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

/// Largest accepted power magnitude.
pub const MAX_POWER: i16 = 255;

/// Why the output stage refused a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorError {
    /// Requested magnitude above [`MAX_POWER`].
    OutOfRange(i16),
    /// Brake is engaged; release it before driving.
    Braked,
    /// A direction or PWM line could not be driven.
    Pin,
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorError::OutOfRange(power) => {
                write!(f, "power {} outside +/-{}", power, MAX_POWER)
            }
            MotorError::Braked => f.write_str("brake engaged"),
            MotorError::Pin => f.write_str("motor pin fault"),
        }
    }
}

/// A motor that accepts signed power commands and a brake.
pub trait MotorOutput {
    /// Drive at `power` in `-MAX_POWER..=MAX_POWER`.
    fn set_power(&mut self, power: i16) -> Result<(), MotorError>;

    /// Engage or release the brake.
    fn set_brake(&mut self, engaged: bool) -> Result<(), MotorError>;

    /// Drive at `pct` percent of full power, `-100..=100`.
    fn set_power_pct(&mut self, pct: i8) -> Result<(), MotorError> {
        let power = (pct as i32 * MAX_POWER as i32) / 100;
        self.set_power(power as i16)
    }
}

impl<M: MotorOutput + ?Sized> MotorOutput for &mut M {
    fn set_power(&mut self, power: i16) -> Result<(), MotorError> {
        (**self).set_power(power)
    }

    fn set_brake(&mut self, engaged: bool) -> Result<(), MotorError> {
        (**self).set_brake(engaged)
    }
}

/// Three-wire H-bridge driver.
pub struct HBridge<PWM, INA, INB> {
    pwm: PWM,
    ina: INA,
    inb: INB,
    braked: bool,
    power: i16,
}

impl<PWM, INA, INB> HBridge<PWM, INA, INB>
where
    PWM: SetDutyCycle,
    INA: OutputPin,
    INB: OutputPin,
{
    /// Take the pins and leave the bridge idle (both inputs low, zero duty).
    pub fn new(pwm: PWM, ina: INA, inb: INB) -> Result<Self, MotorError> {
        let mut bridge = Self {
            pwm,
            ina,
            inb,
            braked: false,
            power: 0,
        };
        bridge.pwm.set_duty_cycle_fully_off().map_err(|_| MotorError::Pin)?;
        bridge.ina.set_low().map_err(|_| MotorError::Pin)?;
        bridge.inb.set_low().map_err(|_| MotorError::Pin)?;
        Ok(bridge)
    }

    /// Last accepted power command.
    pub fn power(&self) -> i16 {
        self.power
    }

    /// True while the brake is engaged.
    pub fn is_braked(&self) -> bool {
        self.braked
    }

    /// Give the pins back.
    pub fn release(self) -> (PWM, INA, INB) {
        (self.pwm, self.ina, self.inb)
    }

    fn drive(&mut self, forward: bool, duty: u16) -> Result<(), MotorError> {
        if forward {
            self.inb.set_low().map_err(|_| MotorError::Pin)?;
            self.ina.set_high().map_err(|_| MotorError::Pin)?;
        } else {
            self.ina.set_low().map_err(|_| MotorError::Pin)?;
            self.inb.set_high().map_err(|_| MotorError::Pin)?;
        }
        self.pwm
            .set_duty_cycle_fraction(duty, MAX_POWER as u16)
            .map_err(|_| MotorError::Pin)
    }
}

impl<PWM, INA, INB> MotorOutput for HBridge<PWM, INA, INB>
where
    PWM: SetDutyCycle,
    INA: OutputPin,
    INB: OutputPin,
{
    fn set_power(&mut self, power: i16) -> Result<(), MotorError> {
        if power.unsigned_abs() > MAX_POWER as u16 {
            return Err(MotorError::OutOfRange(power));
        }
        if self.braked {
            return Err(MotorError::Braked);
        }
        self.drive(power >= 0, power.unsigned_abs())?;
        self.power = power;
        Ok(())
    }

    fn set_brake(&mut self, engaged: bool) -> Result<(), MotorError> {
        if engaged {
            // Both low shorts the windings to ground; full duty holds it hard
            self.ina.set_low().map_err(|_| MotorError::Pin)?;
            self.inb.set_low().map_err(|_| MotorError::Pin)?;
            self.pwm.set_duty_cycle_fully_on().map_err(|_| MotorError::Pin)?;
            self.power = 0;
        } else {
            self.pwm.set_duty_cycle_fully_off().map_err(|_| MotorError::Pin)?;
        }
        self.braked = engaged;
        Ok(())
    }
}

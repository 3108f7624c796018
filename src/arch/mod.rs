//! # Architecture Abstraction Layer
//!
//! Board support on `stm32f4xx-hal`, compiled only for firmware builds on
//! the bare-metal target. Everything above this layer talks to hardware
//! through traits (`HardwareCounter`, `MotorOutput`, `fmt::Write`) and
//! builds on the host for testing.

#[cfg(all(feature = "firmware", target_arch = "arm", target_os = "none"))]
pub mod stm32f401;

//! # Application Tasks
//!
//! | Task | Interval | States | Job |
//! |------|----------|--------|-----|
//! | [`motor::MotorTask`] | 1 ms | Init, Scanning, MovingToTarget, Brake | sweeps the head or holds a target angle |
//! | [`status::StatusTask`] | 1 s | Report | logs uptime and encoder counters |

pub mod motor;
pub mod status;

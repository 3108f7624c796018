//! # Scanhead: rotating sensor head firmware
//!
//! Cooperative firmware for a motor-driven sensor head on an STM32F401
//! (ARM Cortex-M4). A DC gearmotor with a quadrature encoder turns the head;
//! the firmware either sweeps it back and forth or holds it at a commanded
//! angle.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │            Application Tasks (tasks/)                  │
//! │        MotorTask: sweep / hold · StatusTask            │
//! ├────────────────────────────────────────────────────────┤
//! │     Kernel (kernel.rs) · Scheduler (scheduler.rs)      │
//! │        round robin · run() · error_stop()              │
//! ├──────────────┬──────────────────┬─────────────────────┤
//! │  Task Model  │ Position Control │  Logger             │
//! │  task.rs     │ control.rs       │  logger.rs          │
//! │  ─ OpState   │ ─ update()       │  ─ SinkLogger       │
//! │  ─ Steppable │ ─ angular_error()│                     │
//! ├──────────────┼──────────────────┼─────────────────────┤
//! │  Clock       │ Quadrature       │  Motor Output       │
//! │  clock.rs    │ encoder.rs       │  motor.rs           │
//! │  time.rs     │                  │  ─ HBridge          │
//! ├──────────────┴──────────────────┴─────────────────────┤
//! │      Sync Primitives (sync.rs): critical sections     │
//! ├────────────────────────────────────────────────────────┤
//! │      Board Port (arch/stm32f401.rs), target only      │
//! │    TIM3 clock · EXTI encoder · TIM4 PWM · USART2       │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Execution Model
//!
//! Two contexts only:
//!
//! - **Interrupts** extend the hardware clock and decode encoder edges.
//! - **The main loop** offers the current time to each task in turn; a task
//!   runs when its due time has come and returns promptly.
//!
//! The decoder counters and the clock overflow tally are the only state the
//! two share, and both sit behind critical sections that copy a few words
//! and leave.
//!
//! ## Memory Model
//!
//! - **No heap**: tasks are built on `main`'s stack, the scheduler holds
//!   `&mut dyn Schedulable` references in a fixed array
//! - **No `alloc`**: pure `core` only
//! - **Integer math only** in the control loop
//!
//! Everything except `arch` builds and tests on the host.

#![no_std]

pub mod arch;
pub mod clock;
pub mod config;
pub mod control;
pub mod encoder;
pub mod kernel;
pub mod logger;
pub mod motor;
pub mod scheduler;
pub mod sync;
pub mod task;
pub mod tasks;
pub mod time;

//! # Scanhead Firmware
//!
//! Two tasks on the cooperative scheduler:
//!
//! | Task | Interval | Job |
//! |------|----------|-----|
//! | motor | 1 ms | sweeps the head 10°..350° at 30 % power, or holds a target angle |
//! | status | 1 s | logs uptime and encoder counters over the serial port |
//!
//! Three interrupts feed them: the TIM3 overflow extends the clock, and
//! EXTI0/EXTI1 decode the encoder.

#![no_std]
#![no_main]

use cortex_m::peripheral::NVIC;
use cortex_m_rt::entry;
use log::info;
use panic_halt as _;
use stm32f4xx_hal::pac::{self, interrupt};
use stm32f4xx_hal::prelude::*;

use scanhead::arch::stm32f401::{self as board, SerialSink, CLOCK, ENCODER};
use scanhead::config;
use scanhead::control::{Axis, PositionController};
use scanhead::encoder::Line;
use scanhead::kernel;
use scanhead::logger::{self, SinkLogger};
use scanhead::scheduler::Scheduler;
use scanhead::task::{Schedulable, Task};
use scanhead::tasks::motor::{MotorState, MotorTask};
use scanhead::tasks::status::{StatusState, StatusTask};

static LOGGER: SinkLogger<SerialSink> = SinkLogger::new(config::LOG_LEVEL);

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Bring up the peripherals, build the tasks and run them. Does not return.
#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();

    let rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.sysclk(config::SYSTEM_CLOCK_HZ.Hz()).freeze();
    let gpioa = dp.GPIOA.split();
    let gpiob = dp.GPIOB.split();

    let serial = board::init_serial(dp.USART2, gpioa.pa2, &clocks).expect("serial port");
    logger::init(&LOGGER, serial).unwrap();
    info!(
        "scanhead: {} Hz core, {} ticks/rev, {}:1 gear",
        clocks.sysclk().raw(),
        config::TICKS_PER_REV,
        config::GEAR_RATIO
    );

    // Held for the life of the firmware so TIM3 stays claimed
    let _clock_timer = board::init_clock(dp.TIM3, &clocks).expect("clock timer");

    let mut syscfg = dp.SYSCFG.constrain();
    let mut exti = dp.EXTI;
    board::init_encoder(gpioa.pa0, gpioa.pa1, &mut syscfg, &mut exti);

    let motor = board::init_motor(dp.TIM4, gpiob.pb6, gpiob.pb4, gpiob.pb5, &clocks)
        .expect("motor bridge");

    unsafe {
        NVIC::unmask(pac::Interrupt::TIM3);
        NVIC::unmask(pac::Interrupt::EXTI0);
        NVIC::unmask(pac::Interrupt::EXTI1);
    }

    let controller = PositionController::new(&ENCODER, motor, Axis::Gear, config::POSITION_LOOP);
    let mut motor_task = Task::new(
        config::MOTOR_TASK_INTERVAL,
        MotorState::Init,
        MotorTask::new(controller, config::SCAN),
    );
    let mut status_task = Task::new(
        config::STATUS_TASK_INTERVAL,
        StatusState::Report,
        StatusTask::new(&CLOCK, &ENCODER),
    );

    let mut scheduler = Scheduler::new([
        &mut motor_task as &mut dyn Schedulable,
        &mut status_task,
    ]);
    kernel::run(&mut scheduler, &CLOCK)
}

// ---------------------------------------------------------------------------
// Interrupt handlers
// ---------------------------------------------------------------------------

#[interrupt]
fn TIM3() {
    board::on_tim3_update();
}

#[interrupt]
fn EXTI0() {
    board::on_encoder_edge(Line::A);
}

#[interrupt]
fn EXTI1() {
    board::on_encoder_edge(Line::B);
}

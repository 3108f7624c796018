//! # STM32F401 Port Layer
//!
//! Peripheral bring-up for the scanhead board on `stm32f4xx-hal`. Each
//! `init_*` function takes the peripherals and pins it needs from `main`
//! and hands back the driver, or parks it where its interrupt can reach it.
//!
//! | Function        | Peripheral       | Pins      |
//! |-----------------|------------------|-----------|
//! | Monotonic clock | TIM3, 1 MHz      | -         |
//! | Encoder A / B   | EXTI0 / EXTI1    | PA0 / PA1 |
//! | Motor PWM       | TIM4 CH1, 20 kHz | PB6       |
//! | Motor INA / INB | GPIO out         | PB4 / PB5 |
//! | Diagnostics     | USART2 TX        | PA2       |
//!
//! ## Interrupts
//!
//! - TIM3 update: one clock overflow, see [`on_tim3_update`]
//! - EXTI0 / EXTI1: one encoder edge, see [`on_encoder_edge`]
//!
//! All three share the default priority, so they never nest and the decoder
//! sees edges in order.

use core::fmt;

use stm32f4xx_hal::gpio::{Edge, ExtiPin, Input, PA0, PA1, PA2, PB4, PB5, PB6};
use stm32f4xx_hal::pac;
use stm32f4xx_hal::prelude::*;
use stm32f4xx_hal::rcc::Clocks;
use stm32f4xx_hal::serial::{config::InvalidConfig, Tx};
use stm32f4xx_hal::syscfg::SysCfg;
use stm32f4xx_hal::timer::{self, Counter, Event};

use crate::clock::{HardwareCounter, MonotonicClock};
use crate::config::{BAUD_RATE, CLOCK_COUNTER_HZ, ENCODER as ENCODER_GEOMETRY, PWM_FREQUENCY_HZ};
use crate::encoder::{Line, SharedEncoder};
use crate::motor::{HBridge, MotorError, MotorOutput};
use crate::sync::IrqCell;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// The system clock, extended from TIM3.
pub static CLOCK: MonotonicClock<Tim3Counter> = MonotonicClock::new(Tim3Counter);

/// The head encoder, fed by EXTI0 and EXTI1.
pub static ENCODER: SharedEncoder = SharedEncoder::new(ENCODER_GEOMETRY);

/// Encoder inputs, owned by the edge interrupts once configured.
static ENCODER_PINS: IrqCell<Option<EncoderPins>> = IrqCell::new(None);

struct EncoderPins {
    a: PA0<Input>,
    b: PA1<Input>,
}

// ---------------------------------------------------------------------------
// Monotonic clock: TIM3
// ---------------------------------------------------------------------------

/// Counts per TIM3 period: the full 16-bit range.
const COUNTER_PERIOD: u32 = 1 << 16;

/// Update interrupt flag in TIMx_SR.
const UIF: u32 = 1;

fn tim3() -> &'static pac::tim3::RegisterBlock {
    // SAFETY: reads of CNT/SR and the flag clear are single register
    // accesses; the HAL counter that configured TIM3 never touches them again
    unsafe { &*pac::TIM3::ptr() }
}

/// TIM3 counter register, read behind the HAL's back.
pub struct Tim3Counter;

impl HardwareCounter for Tim3Counter {
    #[inline]
    fn read(&self) -> u16 {
        tim3().cnt.read().bits() as u16
    }

    fn write(&self, value: u16) {
        tim3().cnt.write(|w| unsafe { w.bits(value as u32) });
    }

    #[inline]
    fn overflow_pending(&self) -> bool {
        tim3().sr.read().uif().bit_is_set()
    }
}

/// Start TIM3 free-running at `CLOCK_COUNTER_HZ` with the update interrupt
/// enabled in the timer (the NVIC line is left to the caller).
///
/// The returned counter must be kept alive for as long as the clock runs.
pub fn init_clock(
    tim: pac::TIM3,
    clocks: &Clocks,
) -> Result<Counter<pac::TIM3, CLOCK_COUNTER_HZ>, timer::Error> {
    let mut counter = tim.counter::<CLOCK_COUNTER_HZ>(clocks);
    // One count per microsecond, so the period in µs is the tick count
    counter.start(COUNTER_PERIOD.micros())?;
    clear_update_flag();
    counter.listen(Event::Update);
    Ok(counter)
}

fn clear_update_flag() {
    // rc_w0: writing 0 clears UIF, 1 leaves the other flags alone
    tim3().sr.write(|w| unsafe { w.bits(0xFFFF & !UIF) });
}

/// TIM3 update interrupt body.
#[inline]
pub fn on_tim3_update() {
    clear_update_flag();
    CLOCK.on_overflow();
}

// ---------------------------------------------------------------------------
// Encoder: PA0 / PA1 on EXTI0 / EXTI1
// ---------------------------------------------------------------------------

/// Configure the encoder pins as pulled-up inputs interrupting on both
/// edges, seed the decoder with their current levels, and hand the pins to
/// the edge interrupts.
pub fn init_encoder(a: PA0, b: PA1, syscfg: &mut SysCfg, exti: &mut pac::EXTI) {
    let mut a = a.into_pull_up_input();
    let mut b = b.into_pull_up_input();
    ENCODER.sync_levels(a.is_high(), b.is_high());

    listen_both_edges(&mut a, syscfg, exti);
    listen_both_edges(&mut b, syscfg, exti);
    ENCODER_PINS.lock(|pins| *pins = Some(EncoderPins { a, b }));
}

fn listen_both_edges(pin: &mut impl ExtiPin, syscfg: &mut SysCfg, exti: &mut pac::EXTI) {
    pin.make_interrupt_source(syscfg);
    pin.trigger_on_edge(exti, Edge::RisingFalling);
    pin.clear_interrupt_pending_bit();
    pin.enable_interrupt(exti);
}

/// EXTI0 / EXTI1 interrupt body for `line`.
#[inline]
pub fn on_encoder_edge(line: Line) {
    let level = ENCODER_PINS.lock(|pins| {
        let pins = pins.as_mut()?;
        Some(match line {
            Line::A => {
                pins.a.clear_interrupt_pending_bit();
                pins.a.is_high()
            }
            Line::B => {
                pins.b.clear_interrupt_pending_bit();
                pins.b.is_high()
            }
        })
    });
    if let Some(level) = level {
        ENCODER.on_edge(line, level);
    }
}

// ---------------------------------------------------------------------------
// Motor: TIM4 CH1 PWM plus two direction lines
// ---------------------------------------------------------------------------

/// Start TIM4 CH1 as the bridge PWM on PB6, drive INA/INB from PB4/PB5,
/// and hand back an idle bridge.
pub fn init_motor(
    tim: pac::TIM4,
    pwm: PB6,
    ina: PB4,
    inb: PB5,
    clocks: &Clocks,
) -> Result<impl MotorOutput, MotorError> {
    let (_, (ch1, ..)) = tim.pwm_hz(PWM_FREQUENCY_HZ.Hz(), clocks);
    let mut ch1 = ch1.with(pwm);
    ch1.enable();

    // Starts with zero duty and both direction lines low
    HBridge::new(ch1, ina.into_push_pull_output(), inb.into_push_pull_output())
}

// ---------------------------------------------------------------------------
// Diagnostics: USART2 TX on PA2
// ---------------------------------------------------------------------------

/// Blocking character sink on USART2.
pub struct SerialSink {
    tx: Tx<pac::USART2>,
}

/// Enable USART2 transmit on PA2 at `BAUD_RATE`, 8N1.
pub fn init_serial(
    usart: pac::USART2,
    tx: PA2,
    clocks: &Clocks,
) -> Result<SerialSink, InvalidConfig> {
    let tx = usart.tx(tx, BAUD_RATE.bps(), clocks)?;
    Ok(SerialSink { tx })
}

impl fmt::Write for SerialSink {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        fmt::Write::write_str(&mut self.tx, s)
    }
}

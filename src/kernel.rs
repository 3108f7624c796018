//! # Kernel
//!
//! The main loop and the fatal-error path.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset handler (cortex-m-rt)
//!   └─► main()
//!         ├─► RCC freeze, GPIO split ← HAL clocks and pins
//!         ├─► logger::init()         ← USART2 sink installed
//!         ├─► board init_clock()     ← TIM3 + overflow interrupt
//!         ├─► board init_encoder()   ← EXTI edges, decoder seeded
//!         ├─► board init_motor()     ← TIM4 PWM + direction lines
//!         ├─► Task::new() (×N)       ← tasks built on main's stack
//!         └─► kernel::run()          ← round robin, never returns
//! ```
//!
//! Interrupts only ever touch the clock tally and the decoder, so the loop
//! itself needs no locking.

use core::fmt;

use log::{error, info};

use crate::clock::TimeSource;
use crate::scheduler::Scheduler;

/// Run the scheduler forever. **Does not return.**
pub fn run<const N: usize>(scheduler: &mut Scheduler<'_, N>, clock: &impl TimeSource) -> ! {
    info!("kernel: starting {} tasks at {}", scheduler.len(), clock.now());
    loop {
        scheduler.pass(clock);
    }
}

/// Report an unrecoverable integrity error in task `serial` and halt.
pub fn error_stop(serial: u8, state: &dyn fmt::Debug, message: &str) -> ! {
    error!("task {} stopped in {:?}: {}", serial, state, message);
    halt()
}

/// Mask interrupts and spin forever.
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub fn halt() -> ! {
    cortex_m::interrupt::disable();
    loop {
        cortex_m::asm::nop();
    }
}

/// Hosted builds panic instead, so tests can watch for the halt.
#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub fn halt() -> ! {
    panic!("system halted")
}

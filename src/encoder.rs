//! # Quadrature Decoder
//!
//! Decodes the two encoder lines from edge interrupts. Each line has its own
//! both-edges interrupt; the handler passes in the line that fired and its
//! new level, and the decoder compares that against the *stored* levels of
//! both lines to work out the direction.
//!
//! ## Gray code
//!
//! ```text
//!   forward:  (A,B) 00 ─► 01 ─► 11 ─► 10 ─► 00
//!   reverse:  (A,B) 00 ─► 10 ─► 11 ─► 01 ─► 00
//! ```
//!
//! | Edge      | Forward if last (A,B) | Reverse if last (A,B) |
//! |-----------|-----------------------|-----------------------|
//! | A rising  | (0,1)                 | (0,0)                 |
//! | A falling | (1,0)                 | (1,1)                 |
//! | B rising  | (0,0)                 | (1,0)                 |
//! | B falling | (1,1)                 | (0,1)                 |
//!
//! Anything else (a repeated level, a missed edge) is a decode error: the
//! error tally goes up and neither counter moves. Both counters always move
//! together.

use core::fmt;

use crate::sync::IrqCell;

/// Encoder geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderConfig {
    ticks_per_rev: u32,
    gear_ratio: u32,
    gear_ticks_per_rev: u32,
}

impl EncoderConfig {
    /// Geometry for an encoder giving `ticks_per_rev` counts per motor shaft
    /// turn, driving the output through a `gear_ratio`:1 reduction.
    ///
    /// The output-shaft tick count is worked out here once.
    pub const fn new(ticks_per_rev: u32, gear_ratio: u32) -> Self {
        assert!(ticks_per_rev > 0 && gear_ratio > 0);
        Self {
            ticks_per_rev,
            gear_ratio,
            gear_ticks_per_rev: ticks_per_rev * gear_ratio,
        }
    }

    /// Counts per motor shaft revolution.
    #[inline]
    pub const fn ticks_per_rev(&self) -> u32 {
        self.ticks_per_rev
    }

    /// Gear reduction.
    #[inline]
    pub const fn gear_ratio(&self) -> u32 {
        self.gear_ratio
    }

    /// Counts per output shaft revolution.
    #[inline]
    pub const fn gear_ticks_per_rev(&self) -> u32 {
        self.gear_ticks_per_rev
    }
}

/// One of the two encoder lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    /// Channel A
    A,
    /// Channel B
    B,
}

/// What a single edge did to the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// One count forward.
    Forward,
    /// One count backward.
    Reverse,
    /// Edge did not fit the Gray sequence.
    Invalid,
}

/// Counters copied out of the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncoderSnapshot {
    /// Motor shaft position, `0..ticks_per_rev`.
    pub shaft_ticks: u32,
    /// Output shaft position, `0..ticks_per_rev * gear_ratio`.
    pub gear_ticks: u32,
    /// Decode errors since power-up.
    pub errors: u32,
}

impl fmt::Display for EncoderSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "shaft {} gear {} errors {}",
            self.shaft_ticks, self.gear_ticks, self.errors
        )
    }
}

/// Decoder state. Owned by the edge interrupts.
#[derive(Debug, Clone)]
pub struct QuadratureDecoder {
    config: EncoderConfig,
    level_a: bool,
    level_b: bool,
    shaft_ticks: u32,
    gear_ticks: u32,
    errors: u32,
}

impl QuadratureDecoder {
    /// Decoder at position zero with both lines assumed low.
    pub const fn new(config: EncoderConfig) -> Self {
        Self {
            config,
            level_a: false,
            level_b: false,
            shaft_ticks: 0,
            gear_ticks: 0,
            errors: 0,
        }
    }

    /// Replace the stored line levels, normally with the real pin levels at
    /// start-up.
    pub fn sync_levels(&mut self, level_a: bool, level_b: bool) {
        self.level_a = level_a;
        self.level_b = level_b;
    }

    /// Stored `(A, B)` levels.
    pub fn levels(&self) -> (bool, bool) {
        (self.level_a, self.level_b)
    }

    /// Handle one edge on `line`, which now reads `level`.
    pub fn on_edge(&mut self, line: Line, level: bool) -> Step {
        let (a, b) = (self.level_a, self.level_b);
        let step = match (line, level) {
            (Line::A, true) => classify(!a && b, !a && !b),
            (Line::A, false) => classify(a && !b, a && b),
            (Line::B, true) => classify(!a && !b, a && !b),
            (Line::B, false) => classify(a && b, !a && b),
        };

        match step {
            Step::Forward => self.forward(),
            Step::Reverse => self.reverse(),
            Step::Invalid => self.errors = self.errors.wrapping_add(1),
        }

        match line {
            Line::A => self.level_a = level,
            Line::B => self.level_b = level,
        }
        step
    }

    /// Zero both position counters. The error tally is kept.
    pub fn set_reference(&mut self) {
        self.shaft_ticks = 0;
        self.gear_ticks = 0;
    }

    /// Copy out the counters.
    pub fn snapshot(&self) -> EncoderSnapshot {
        EncoderSnapshot {
            shaft_ticks: self.shaft_ticks,
            gear_ticks: self.gear_ticks,
            errors: self.errors,
        }
    }

    fn forward(&mut self) {
        self.shaft_ticks = wrap_up(self.shaft_ticks, self.config.ticks_per_rev);
        self.gear_ticks = wrap_up(self.gear_ticks, self.config.gear_ticks_per_rev);
    }

    fn reverse(&mut self) {
        self.shaft_ticks = wrap_down(self.shaft_ticks, self.config.ticks_per_rev);
        self.gear_ticks = wrap_down(self.gear_ticks, self.config.gear_ticks_per_rev);
    }
}

#[inline]
fn classify(forward: bool, reverse: bool) -> Step {
    if forward {
        Step::Forward
    } else if reverse {
        Step::Reverse
    } else {
        Step::Invalid
    }
}

#[inline]
fn wrap_up(ticks: u32, modulus: u32) -> u32 {
    if ticks + 1 >= modulus {
        0
    } else {
        ticks + 1
    }
}

#[inline]
fn wrap_down(ticks: u32, modulus: u32) -> u32 {
    if ticks == 0 {
        modulus - 1
    } else {
        ticks - 1
    }
}

/// Decoder shared between the edge interrupts and the main loop.
///
/// The interrupts are the only writers. The main loop only ever takes a
/// [`snapshot`](Self::read_positions) (or zeroes the counters), each inside
/// a critical section that lasts a handful of loads and stores.
pub struct SharedEncoder {
    config: EncoderConfig,
    decoder: IrqCell<QuadratureDecoder>,
}

impl SharedEncoder {
    /// Shared decoder for the given geometry.
    pub const fn new(config: EncoderConfig) -> Self {
        Self {
            config,
            decoder: IrqCell::new(QuadratureDecoder::new(config)),
        }
    }

    /// Encoder geometry. Readable without a critical section.
    #[inline]
    pub fn config(&self) -> EncoderConfig {
        self.config
    }

    /// Seed the stored levels from the pins before edge interrupts are
    /// unmasked.
    pub fn sync_levels(&self, level_a: bool, level_b: bool) {
        self.decoder.lock(|d| d.sync_levels(level_a, level_b));
    }

    /// Edge interrupt entry point.
    #[inline]
    pub fn on_edge(&self, line: Line, level: bool) -> Step {
        self.decoder.lock(|d| d.on_edge(line, level))
    }

    /// Copy the shaft counter, gear counter and error tally out of the
    /// interrupt-owned state.
    #[inline]
    pub fn read_positions(&self) -> EncoderSnapshot {
        self.decoder.lock(|d| d.snapshot())
    }

    /// Make the current position the new zero.
    pub fn set_reference(&self) {
        self.decoder.lock(|d| d.set_reference());
    }

    /// Stored `(A, B)` levels.
    pub fn levels(&self) -> (bool, bool) {
        self.decoder.lock(|d| d.levels())
    }
}

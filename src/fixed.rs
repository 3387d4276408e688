//! Fixed-point helpers shared by the oscillator, envelope and sequencer.
//!
//! Two formats are used throughout the engine:
//!
//! - **Envelope levels** are unsigned 16.16: the integer part is the
//!   amplitude on a 0..=255 scale, the low 16 bits are the fraction.
//!   Full scale is `255 << 16`.
//! - **Oscillator phase** is a 32-bit accumulator covering one full cycle;
//!   it wraps modulo 2^32 and the high byte indexes the waveform.
//!
//! No floating point is used on the per-sample path.

/// Number of fractional bits in an envelope level.
pub const LEVEL_SHIFT: u32 = 16;

/// Full-scale envelope level (255.0 in 16.16).
pub const LEVEL_MAX: u32 = 255 << LEVEL_SHIFT;

/// Convert a 0..=255 amplitude to a 16.16 level.
#[inline]
pub const fn level_from_u8(amplitude: u8) -> u32 {
    (amplitude as u32) << LEVEL_SHIFT
}

/// Integer part of a 16.16 level.
#[inline]
pub const fn level_to_u8(level: u32) -> u8 {
    let whole = level >> LEVEL_SHIFT;
    if whole > 255 { 255 } else { whole as u8 }
}

/// Number of samples covering `ms` milliseconds at `sample_rate`,
/// saturating at `u32::MAX`.
#[inline]
pub const fn ms_to_samples(ms: u32, sample_rate: u32) -> u32 {
    let samples = (ms as u64 * sample_rate as u64) / 1000;
    if samples > u32::MAX as u64 { u32::MAX } else { samples as u32 }
}

/// Per-sample 16.16 increment that covers `delta` amplitude units in `ms`.
///
/// `rate = (delta << 16) / (ms * sample_rate / 1000)`. A zero-length stage
/// moves the whole delta in one sample. The result is never below one
/// fractional unit when `delta > 0`, so every stage terminates.
pub const fn rate_per_sample(delta: u8, ms: u16, sample_rate: u32) -> u32 {
    let span = level_from_u8(delta);
    let samples = ms_to_samples(ms as u32, sample_rate);
    if samples == 0 {
        return span;
    }
    let rate = span / samples;
    if rate == 0 && delta > 0 { 1 } else { rate }
}

/// 32-bit phase increment for `frequency` Hz: `frequency * 2^32 / sample_rate`.
#[inline]
pub const fn phase_increment(frequency: u32, sample_rate: u32) -> u32 {
    (((frequency as u64) << 32) / sample_rate as u64) as u32
}

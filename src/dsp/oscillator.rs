//! Phase-accumulator oscillator with table-driven sine.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::fixed::phase_increment;

/// Peak amplitude of a raw oscillator sample.
pub const PEAK: i16 = 127;

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Triangle,
    Sawtooth,
    Noise,
}

/// One cycle of sine in 256 steps, scaled to [-127, 127].
///
/// Built with Bhaskara's rational approximation so the table is a `const`
/// and needs no floating point: for `t = p * (128 - p)` over a half cycle,
/// `sin ≈ 4t / (20480 - t)`.
pub static SINE_TABLE: [i8; 256] = build_sine_table();

const fn build_sine_table() -> [i8; 256] {
    let mut table = [0i8; 256];
    let mut p = 0;
    while p < 256 {
        let half = (p & 127) as i32;
        let t = half * (128 - half);
        let magnitude = (PEAK as i32 * 4 * t) / (20480 - t);
        table[p] = if p < 128 {
            magnitude as i8
        } else {
            -magnitude as i8
        };
        p += 1;
    }
    table
}

/// A fixed-point oscillator.
///
/// The phase accumulator wraps modulo 2^32; its high byte selects the
/// position within the waveform.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    pub frequency: u32,
    phase: u32,
    increment: u32,
    noise: SmallRng,
}

impl Oscillator {
    /// Create an oscillator whose noise source is seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Oscillator {
            waveform: Waveform::Sine,
            frequency: 0,
            phase: 0,
            increment: 0,
            noise: SmallRng::seed_from_u64(seed),
        }
    }

    /// Retune and restart the oscillator from phase zero.
    pub fn start(&mut self, waveform: Waveform, frequency: u32, sample_rate: u32) {
        self.waveform = waveform;
        self.frequency = frequency;
        self.increment = phase_increment(frequency, sample_rate);
        self.phase = 0;
    }

    /// Sample the waveform at the current phase, then advance the phase.
    #[inline]
    pub fn next_sample(&mut self) -> i16 {
        let position = (self.phase >> 24) as u8;
        let sample = match self.waveform {
            Waveform::Sine => SINE_TABLE[position as usize] as i16,
            Waveform::Square => square(position),
            Waveform::Triangle => triangle(position),
            Waveform::Sawtooth => sawtooth(position),
            Waveform::Noise => centred(self.noise.random::<u8>()),
        };
        self.phase = self.phase.wrapping_add(self.increment);
        sample
    }
}

fn square(p: u8) -> i16 {
    if p < 128 { PEAK } else { -PEAK }
}

fn triangle(p: u8) -> i16 {
    let p = p as i16;
    if p < 128 { p * 2 - PEAK } else { 383 - p * 2 }
}

fn sawtooth(p: u8) -> i16 {
    centred(p)
}

/// Map an unsigned 0..=255 value onto [-127, 127].
fn centred(v: u8) -> i16 {
    (v as i16 - 128).max(-PEAK)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn osc(waveform: Waveform, frequency: u32) -> Oscillator {
        let mut osc = Oscillator::new(7);
        osc.start(waveform, frequency, 8000);
        osc
    }

    #[test]
    fn sine_table_shape() {
        assert_eq!(SINE_TABLE[0], 0);
        assert_eq!(SINE_TABLE[64], 127);
        assert_eq!(SINE_TABLE[128], 0);
        assert_eq!(SINE_TABLE[192], -127);
        // 30 degrees: sin = 0.5
        let thirty = SINE_TABLE[21] as i32;
        assert!((thirty - 63).abs() <= 2, "sin(30°) should be ~63, got {thirty}");
    }

    #[test]
    fn sine_zero_at_start() {
        let mut o = osc(Waveform::Sine, 440);
        assert_eq!(o.next_sample(), 0);
    }

    #[test]
    fn all_waveforms_in_range() {
        for waveform in [
            Waveform::Sine,
            Waveform::Square,
            Waveform::Triangle,
            Waveform::Sawtooth,
            Waveform::Noise,
        ] {
            let mut o = osc(waveform, 733);
            for _ in 0..8000 {
                let s = o.next_sample();
                assert!((-PEAK..=PEAK).contains(&s), "{waveform:?} out of range: {s}");
            }
        }
    }

    #[test]
    fn square_halves() {
        // 1 kHz at 8 kHz: 4 samples high, 4 samples low
        let mut o = osc(Waveform::Square, 1000);
        let cycle: Vec<i16> = (0..8).map(|_| o.next_sample()).collect();
        assert_eq!(cycle, vec![127, 127, 127, 127, -127, -127, -127, -127]);
    }

    #[test]
    fn triangle_peaks_mid_cycle() {
        assert_eq!(triangle(0), -127);
        assert_eq!(triangle(127), 127);
        assert_eq!(triangle(128), 127);
        assert_eq!(triangle(255), -127);
    }

    #[test]
    fn phase_wraps_each_cycle() {
        let mut o = osc(Waveform::Sawtooth, 1000);
        let first: Vec<i16> = (0..8).map(|_| o.next_sample()).collect();
        let second: Vec<i16> = (0..8).map(|_| o.next_sample()).collect();
        assert_eq!(first, second);
        assert_eq!(first[0], -127);
    }

    #[test]
    fn noise_is_deterministic_per_seed() {
        let mut a = osc(Waveform::Noise, 440);
        let mut b = osc(Waveform::Noise, 440);
        let run_a: Vec<i16> = (0..64).map(|_| a.next_sample()).collect();
        let run_b: Vec<i16> = (0..64).map(|_| b.next_sample()).collect();
        assert_eq!(run_a, run_b);
        assert!(run_a.iter().any(|&s| s != run_a[0]), "noise should vary");
    }
}

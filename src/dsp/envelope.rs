//! Fixed-point ADSR envelope generator.

use serde::{Deserialize, Serialize};

use crate::fixed::{LEVEL_MAX, level_from_u8, level_to_u8, ms_to_samples, rate_per_sample};

/// Envelope stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// ADSR settings in milliseconds, with the sustain level on a 0..=255 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdsrParams {
    pub attack_ms: u16,
    pub decay_ms: u16,
    pub sustain_level: u8,
    pub release_ms: u16,
}

impl AdsrParams {
    pub const fn new(attack_ms: u16, decay_ms: u16, sustain_level: u8, release_ms: u16) -> Self {
        AdsrParams {
            attack_ms,
            decay_ms,
            sustain_level,
            release_ms,
        }
    }
}

impl Default for AdsrParams {
    fn default() -> Self {
        AdsrParams::new(10, 50, 200, 100)
    }
}

/// ADSR envelope with linear segments in 16.16 fixed point.
///
/// Attack and decay rates are computed at [`Envelope::trigger`]. The
/// release slope is taken at [`Envelope::release`] from the level reached
/// so far, so a note cut off during Attack or Decay still falls to zero in
/// `release_ms`. The level never leaves `[0, 255 << 16]`.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    stage: Stage,
    level: u32,
    attack_rate: u32,
    decay_rate: u32,
    release_rate: u32,
    release_samples: u32,
    sustain_level: u32,
}

impl Envelope {
    pub fn new() -> Self {
        Envelope::default()
    }

    /// Start a note: restart from zero and enter Attack.
    pub fn trigger(&mut self, params: &AdsrParams, sample_rate: u32) {
        let sustain = params.sustain_level;
        self.attack_rate = rate_per_sample(255, params.attack_ms, sample_rate);
        self.decay_rate = rate_per_sample(255 - sustain, params.decay_ms, sample_rate);
        self.release_samples = ms_to_samples(params.release_ms as u32, sample_rate);
        self.release_rate = 0;
        self.sustain_level = level_from_u8(sustain);
        self.level = 0;
        self.stage = Stage::Attack;
    }

    /// Enter Release from any sounding stage. A zero release time reaches
    /// Idle on the next step.
    pub fn release(&mut self) {
        if matches!(self.stage, Stage::Attack | Stage::Decay | Stage::Sustain) {
            self.release_rate = if self.release_samples == 0 {
                self.level
            } else {
                self.level / self.release_samples
            }
            .max(1);
            self.stage = Stage::Release;
        }
    }

    /// Silence immediately.
    pub fn reset(&mut self) {
        self.stage = Stage::Idle;
        self.level = 0;
    }

    /// Advance one sample and return the new 16.16 level.
    #[inline]
    pub fn step(&mut self) -> u32 {
        match self.stage {
            Stage::Idle | Stage::Sustain => {}
            Stage::Attack => {
                self.level = self.level.saturating_add(self.attack_rate);
                if self.level >= LEVEL_MAX {
                    self.level = LEVEL_MAX;
                    self.stage = Stage::Decay;
                }
            }
            Stage::Decay => {
                self.level = self.level.saturating_sub(self.decay_rate);
                if self.level <= self.sustain_level {
                    self.level = self.sustain_level;
                    self.stage = Stage::Sustain;
                }
            }
            Stage::Release => {
                self.level = self.level.saturating_sub(self.release_rate);
                if self.level == 0 {
                    self.stage = Stage::Idle;
                }
            }
        }
        self.level
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Current level in 16.16.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Integer part of the current level (0..=255).
    pub fn amplitude(&self) -> u8 {
        level_to_u8(self.level)
    }

    pub fn is_idle(&self) -> bool {
        self.stage == Stage::Idle
    }
}

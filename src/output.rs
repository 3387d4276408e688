//! Output peripheral seam.
//!
//! The engine produces one 8-bit duty per sample. How that duty reaches a
//! pin (LEDC, timer compare register, DAC) belongs to the platform, which
//! implements [`PwmOutput`].

use serde::{Deserialize, Serialize};

/// Output channel of the audio peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Primary,
    Secondary,
}

/// How the mixed sample is presented on the two channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Primary channel only.
    #[default]
    Primary,
    /// The same duty on both channels.
    Both,
    /// Secondary carries the inverted duty, for bridge-tied amplifier stages.
    Differential,
}

/// A PWM-capable peripheral that accepts a duty per channel.
///
/// Called from the sample interrupt: implementations must not block or
/// allocate.
pub trait PwmOutput {
    fn set_duty(&mut self, channel: Channel, duty: u8);
}

impl<T: PwmOutput + ?Sized> PwmOutput for &mut T {
    fn set_duty(&mut self, channel: Channel, duty: u8) {
        (**self).set_duty(channel, duty);
    }
}

/// Write `duty` to the channels selected by `mode`.
#[inline]
pub fn emit<O: PwmOutput + ?Sized>(out: &mut O, mode: OutputMode, duty: u8) {
    out.set_duty(Channel::Primary, duty);
    match mode {
        OutputMode::Primary => {}
        OutputMode::Both => out.set_duty(Channel::Secondary, duty),
        OutputMode::Differential => out.set_duty(Channel::Secondary, 255 - duty),
    }
}

/// Discards every sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOutput;

impl PwmOutput for NullOutput {
    fn set_duty(&mut self, _channel: Channel, _duty: u8) {}
}

/// Records duties per channel. Used by the offline renderer and in tests;
/// it grows its buffers, so it does not belong in a real interrupt.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    pub primary: Vec<u8>,
    pub secondary: Vec<u8>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        RecordingOutput::default()
    }

    pub fn with_capacity(samples: usize) -> Self {
        RecordingOutput {
            primary: Vec::with_capacity(samples),
            secondary: Vec::new(),
        }
    }
}

impl PwmOutput for RecordingOutput {
    fn set_duty(&mut self, channel: Channel, duty: u8) {
        match channel {
            Channel::Primary => self.primary.push(duty),
            Channel::Secondary => self.secondary.push(duty),
        }
    }
}

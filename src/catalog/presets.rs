//! Named sound presets.

use serde::{Deserialize, Serialize};

use crate::dsp::envelope::AdsrParams;
use crate::dsp::oscillator::Waveform;

/// The settings a preset applies to the next note: waveform, envelope and
/// whether the note is routed into the echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    pub waveform: Waveform,
    pub adsr: AdsrParams,
    #[serde(default)]
    pub echo_send: bool,
}

impl Default for Patch {
    fn default() -> Self {
        SoundPreset::Default.patch()
    }
}

/// Instrument names used by songs and by application code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundPreset {
    #[default]
    Default,
    Pluck,
    Flute,
    SynthLead,
    Piano,
    Organ,
    Percussion,
    Beep,
}

impl SoundPreset {
    pub const ALL: [SoundPreset; 8] = [
        SoundPreset::Default,
        SoundPreset::Pluck,
        SoundPreset::Flute,
        SoundPreset::SynthLead,
        SoundPreset::Piano,
        SoundPreset::Organ,
        SoundPreset::Percussion,
        SoundPreset::Beep,
    ];

    pub const fn patch(self) -> Patch {
        match self {
            SoundPreset::Default => patch(Waveform::Sine, AdsrParams::new(10, 50, 200, 100), false),
            SoundPreset::Pluck => patch(Waveform::Triangle, AdsrParams::new(2, 120, 60, 150), true),
            SoundPreset::Flute => patch(Waveform::Sine, AdsrParams::new(40, 80, 180, 200), true),
            SoundPreset::SynthLead => patch(Waveform::Sawtooth, AdsrParams::new(5, 60, 170, 120), true),
            SoundPreset::Piano => patch(Waveform::Triangle, AdsrParams::new(5, 300, 90, 250), false),
            SoundPreset::Organ => patch(Waveform::Square, AdsrParams::new(10, 20, 230, 80), false),
            SoundPreset::Percussion => patch(Waveform::Noise, AdsrParams::new(1, 60, 0, 40), false),
            SoundPreset::Beep => patch(Waveform::Square, AdsrParams::new(1, 10, 200, 20), false),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SoundPreset::Default => "default",
            SoundPreset::Pluck => "pluck",
            SoundPreset::Flute => "flute",
            SoundPreset::SynthLead => "synth_lead",
            SoundPreset::Piano => "piano",
            SoundPreset::Organ => "organ",
            SoundPreset::Percussion => "percussion",
            SoundPreset::Beep => "beep",
        }
    }

    pub fn from_name(name: &str) -> Option<SoundPreset> {
        SoundPreset::ALL.into_iter().find(|p| p.name() == name)
    }
}

const fn patch(waveform: Waveform, adsr: AdsrParams, echo_send: bool) -> Patch {
    Patch {
        waveform,
        adsr,
        echo_send,
    }
}

//! Synthesizer — fixed voice pool, echo, and per-sample rendering.

use std::cmp::Reverse;

use crate::catalog::presets::{Patch, SoundPreset};
use crate::config::{EngineConfig, MAX_VOICES};
use crate::fixed::ms_to_samples;
use crate::output::{OutputMode, PwmOutput, emit};

use super::echo::{Echo, EchoSettings};
use super::envelope::AdsrParams;
use super::mixer::{MixBus, clip, to_duty};
use super::oscillator::Waveform;
use super::voice::{NoteId, NoteOn, Voice};

/// Polyphonic synthesizer with [`MAX_VOICES`] voices.
///
/// Setters (`set_waveform`, `set_adsr`, `set_sound_preset`) only change the
/// patch used by the *next* note; voices already sounding keep theirs.
///
/// # Voice allocation
///
/// `play_note` picks, in order:
/// 1. the first idle voice,
/// 2. otherwise the releasing voice with the lowest envelope level
///    (lowest index on a tie),
/// 3. otherwise the voice whose note started longest ago.
///
/// A request is never dropped for lack of a voice.
#[derive(Debug)]
pub struct Synthesizer {
    sample_rate: u32,
    output_mode: OutputMode,
    voices: [Voice; MAX_VOICES],
    patch: Patch,
    echo: Echo,
    echo_settings: EchoSettings,
    next_note: u32,
    /// Allocation counter, and its value when each voice was last started.
    allocations: u32,
    started: [u32; MAX_VOICES],
    last_mix: MixBus,
}

impl Synthesizer {
    /// Build a synthesizer with all voices idle and `preset` as the patch
    /// for the first note. Allocates the echo buffer.
    pub fn new(config: &EngineConfig, preset: SoundPreset) -> Self {
        let seed = config.noise_seed;
        Synthesizer {
            sample_rate: config.sample_rate,
            output_mode: config.output_mode,
            voices: std::array::from_fn(|i| Voice::new(seed.wrapping_add(i as u64))),
            patch: preset.patch(),
            echo: Echo::with_capacity(config.echo_capacity()),
            echo_settings: EchoSettings::default(),
            next_note: 1,
            allocations: 0,
            started: [0; MAX_VOICES],
            last_mix: MixBus::new(),
        }
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.patch.waveform = waveform;
    }

    pub fn set_adsr(&mut self, attack_ms: u16, decay_ms: u16, sustain_level: u8, release_ms: u16) {
        self.patch.adsr = AdsrParams::new(attack_ms, decay_ms, sustain_level, release_ms);
    }

    pub fn set_sound_preset(&mut self, preset: SoundPreset) {
        self.patch = preset.patch();
    }

    pub fn set_patch(&mut self, patch: Patch) {
        self.patch = patch;
    }

    /// Configure the echo. A delay longer than the buffer is clamped.
    pub fn set_echo(&mut self, enabled: bool, delay_ms: u16, feedback: u8, mix: u8) {
        self.echo_settings = EchoSettings {
            enabled,
            delay_ms,
            feedback,
            mix,
        };
        self.echo.configure(&self.echo_settings, self.sample_rate);
    }

    /// Start a note with the current patch.
    ///
    /// Returns `None` and does nothing for a rest: a frequency of zero or at
    /// or above Nyquist, or a duration shorter than one sample.
    pub fn play_note(&mut self, frequency: u16, duration_ms: u32, volume: u8) -> Option<NoteId> {
        let id = NoteId::local(self.next_note);
        if !self.start_note(id, frequency, duration_ms, volume) {
            return None;
        }
        self.next_note = self.next_note.wrapping_add(1);
        Some(id)
    }

    /// Start a note under a caller-chosen id. Returns false for a rest.
    /// The caller keeps its ids out of the local range.
    pub(crate) fn start_note(&mut self, id: NoteId, frequency: u16, duration_ms: u32, volume: u8) -> bool {
        let frequency = frequency as u32;
        let duration_samples = ms_to_samples(duration_ms, self.sample_rate);
        if frequency == 0 || frequency * 2 >= self.sample_rate || duration_samples == 0 {
            return false;
        }

        let slot = self.allocate_voice();
        let note = NoteOn {
            id,
            frequency,
            duration_samples,
            volume,
            waveform: self.patch.waveform,
            adsr: self.patch.adsr,
            echo_send: self.patch.echo_send,
        };
        self.voices[slot].note_on(&note, self.sample_rate);
        self.allocations = self.allocations.wrapping_add(1);
        self.started[slot] = self.allocations;
        true
    }

    fn allocate_voice(&self) -> usize {
        if let Some(free) = self.voices.iter().position(|v| !v.is_active()) {
            return free;
        }
        let quietest_release = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_releasing())
            .min_by_key(|&(i, v)| (v.envelope.level(), i))
            .map(|(i, _)| i);
        if let Some(slot) = quietest_release {
            return slot;
        }
        (0..MAX_VOICES)
            .max_by_key(|&i| (self.allocations.wrapping_sub(self.started[i]), Reverse(i)))
            .unwrap_or(0)
    }

    /// Release every sounding voice.
    pub fn stop_note(&mut self) {
        for voice in self.voices.iter_mut() {
            voice.note_off();
        }
    }

    /// Alias for [`Synthesizer::stop_note`].
    pub fn stop_all(&mut self) {
        self.stop_note();
    }

    /// Release the voice playing `id`. Returns false if that note already
    /// ended or its voice was reused.
    pub fn stop_voice(&mut self, id: NoteId) -> bool {
        match self.voices.iter_mut().find(|v| v.note() == Some(id)) {
            Some(voice) => {
                voice.note_off();
                true
            }
            None => false,
        }
    }

    /// True while at least one voice is not idle.
    pub fn is_playing(&self) -> bool {
        self.voices.iter().any(Voice::is_active)
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    /// Render one sample from every voice plus the echo tail.
    #[inline]
    pub fn render_sample(&mut self) -> i16 {
        let mut bus = MixBus::new();
        for voice in self.voices.iter_mut() {
            bus.add(voice.next_sample(), voice.echo_send);
        }
        self.last_mix = bus;
        clip(self.echo.process(bus.dry, bus.send))
    }

    /// The per-sample entry point: render and write to the output.
    #[inline]
    pub fn update_sample<O: PwmOutput + ?Sized>(&mut self, out: &mut O) {
        let sample = self.render_sample();
        emit(out, self.output_mode, to_duty(sample as i32));
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn echo(&self) -> &Echo {
        &self.echo
    }

    pub fn echo_settings(&self) -> EchoSettings {
        self.echo_settings
    }

    /// Patch applied to the next note.
    pub fn patch(&self) -> Patch {
        self.patch
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    /// Dry and echo-send sums of the last rendered sample.
    pub fn last_mix(&self) -> MixBus {
        self.last_mix
    }
}

//! Voice — one oscillator shaped by an ADSR envelope, with a note timer.

use super::envelope::{AdsrParams, Envelope, Stage};
use super::oscillator::{Oscillator, Waveform};

/// Identifies the note a voice was started for.
///
/// Ids from the synthesizer itself and ids issued by an engine handle live
/// in disjoint ranges: handle ids carry [`NoteId::HANDLE_BIT`]. A stale id
/// (its voice has since been reused) matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NoteId(pub u32);

impl NoteId {
    pub const HANDLE_BIT: u32 = 1 << 31;

    /// Id number `seq` in the synthesizer's own range.
    pub const fn local(seq: u32) -> Self {
        NoteId(seq & !Self::HANDLE_BIT)
    }

    /// Id number `seq` in the engine handle's range.
    pub const fn handle(seq: u32) -> Self {
        NoteId(seq | Self::HANDLE_BIT)
    }

    pub const fn is_handle(self) -> bool {
        self.0 & Self::HANDLE_BIT != 0
    }
}

/// Everything a voice needs to start sounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteOn {
    pub id: NoteId,
    pub frequency: u32,
    pub duration_samples: u32,
    pub volume: u8,
    pub waveform: Waveform,
    pub adsr: AdsrParams,
    pub echo_send: bool,
}

/// A single polyphonic voice.
#[derive(Debug, Clone)]
pub struct Voice {
    pub oscillator: Oscillator,
    pub envelope: Envelope,
    /// Whether this voice also feeds the echo buffer.
    pub echo_send: bool,
    /// Volume on a 0..=255 scale.
    pub base_volume: u8,
    /// Samples left before the note is forced into Release.
    samples_remaining: u32,
    note: Option<NoteId>,
}

impl Voice {
    pub fn new(noise_seed: u64) -> Self {
        Voice {
            oscillator: Oscillator::new(noise_seed),
            envelope: Envelope::new(),
            echo_send: false,
            base_volume: 0,
            samples_remaining: 0,
            note: None,
        }
    }

    /// Start a note. All fields are written before the envelope leaves Idle.
    pub fn note_on(&mut self, note: &NoteOn, sample_rate: u32) {
        self.oscillator.start(note.waveform, note.frequency, sample_rate);
        self.echo_send = note.echo_send;
        self.base_volume = note.volume;
        self.samples_remaining = note.duration_samples;
        self.note = Some(note.id);
        self.envelope.trigger(&note.adsr, sample_rate);
    }

    /// Release the note early.
    pub fn note_off(&mut self) {
        self.samples_remaining = 0;
        self.envelope.release();
    }

    /// Generate the next sample, scaled by envelope and volume.
    ///
    /// Output lies in [-127, 127]. An idle voice returns 0 without touching
    /// its oscillator.
    #[inline]
    pub fn next_sample(&mut self) -> i32 {
        if self.envelope.is_idle() {
            return 0;
        }

        if self.samples_remaining > 0 {
            self.samples_remaining -= 1;
            if self.samples_remaining == 0 {
                self.envelope.release();
            }
        }

        let amplitude = (self.envelope.step() >> crate::fixed::LEVEL_SHIFT) as i32;
        let raw = self.oscillator.next_sample() as i32;

        if self.envelope.is_idle() {
            self.note = None;
        }

        raw * amplitude * self.base_volume as i32 / (255 * 255)
    }

    /// A voice is active while its envelope is not Idle.
    pub fn is_active(&self) -> bool {
        !self.envelope.is_idle()
    }

    pub fn is_releasing(&self) -> bool {
        self.envelope.stage() == Stage::Release
    }

    pub fn stage(&self) -> Stage {
        self.envelope.stage()
    }

    /// The note currently held by this voice, if any.
    pub fn note(&self) -> Option<NoteId> {
        self.note
    }
}

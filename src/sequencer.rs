//! Sequencer — turns a scored note list into timed synthesizer calls.
//!
//! Time is counted in ticks of one sixteenth note. At `bpm` beats per
//! minute a tick lasts `15000 / bpm` ms, i.e. `sample_rate * 15 / bpm`
//! samples. [`Sequencer::update`] is called once per sample, before the
//! synthesizer renders.
//!
//! A note's `advance_ticks` is the wait after it before the next step. A
//! note with `advance_ticks == 0` that follows another joins it as a chord
//! and is dispatched in the same pass. When a chord's lead note itself has
//! an advance of zero, the next step starts in the same pass too.

use serde::{Deserialize, Serialize};

use crate::catalog::presets::SoundPreset;
use crate::dsp::synth::Synthesizer;

/// Tempo used when none (or zero) is given.
pub const DEFAULT_BPM: u16 = 120;

/// Volume the sequencer plays notes at.
pub const SEQUENCER_VOLUME: u8 = 255;

/// One scored note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicNote {
    /// Frequency in Hz; 0 is a rest.
    pub pitch: u16,
    /// How long the note sounds, in ticks.
    pub duration_ticks: u16,
    /// Ticks to wait after this note; 0 on a following note makes a chord.
    pub advance_ticks: u16,
    #[serde(default)]
    pub preset: SoundPreset,
}

impl MusicNote {
    pub const fn new(pitch: u16, duration_ticks: u16, advance_ticks: u16, preset: SoundPreset) -> Self {
        MusicNote {
            pitch,
            duration_ticks,
            advance_ticks,
            preset,
        }
    }

    pub const fn rest(ticks: u16) -> Self {
        MusicNote::new(0, ticks, ticks, SoundPreset::Default)
    }

    pub fn is_rest(&self) -> bool {
        self.pitch == 0
    }
}

/// A named melody with its tempo. Borrows its notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Song<'a> {
    pub name: &'a str,
    pub bpm: u16,
    pub notes: &'a [MusicNote],
}

impl Song<'_> {
    /// Length in ticks from the first note to the end of the last advance.
    pub fn length_ticks(&self) -> u32 {
        self.notes.iter().map(|n| n.advance_ticks as u32).sum()
    }
}

/// Where the sequencer sends its notes.
pub trait NoteSink {
    fn set_sound_preset(&mut self, preset: SoundPreset);
    fn play_note(&mut self, frequency: u16, duration_ms: u32, volume: u8);
}

impl NoteSink for Synthesizer {
    fn set_sound_preset(&mut self, preset: SoundPreset) {
        Synthesizer::set_sound_preset(self, preset);
    }

    fn play_note(&mut self, frequency: u16, duration_ms: u32, volume: u8) {
        Synthesizer::play_note(self, frequency, duration_ms, volume);
    }
}

/// Samples in one sixteenth-note tick.
pub const fn samples_per_tick(sample_rate: u32, bpm: u16) -> u32 {
    let samples = sample_rate * 15 / bpm as u32;
    if samples == 0 { 1 } else { samples }
}

/// Milliseconds in one tick, rounded to nearest.
pub const fn ms_per_tick(bpm: u16) -> u32 {
    let bpm = bpm as u32;
    (15_000 + bpm / 2) / bpm
}

/// Plays a borrowed note list against a [`NoteSink`].
#[derive(Debug, Clone)]
pub struct Sequencer<'a> {
    sample_rate: u32,
    melody: &'a [MusicNote],
    index: usize,
    playing: bool,
    bpm: u16,
    samples_per_tick: u32,
    ms_per_tick: u32,
    tick_sample_counter: u32,
    ticks_until_next_step: u32,
}

impl<'a> Sequencer<'a> {
    pub fn new(sample_rate: u32) -> Self {
        Sequencer {
            sample_rate,
            melody: &[],
            index: 0,
            playing: false,
            bpm: DEFAULT_BPM,
            samples_per_tick: samples_per_tick(sample_rate, DEFAULT_BPM),
            ms_per_tick: ms_per_tick(DEFAULT_BPM),
            tick_sample_counter: 0,
            ticks_until_next_step: 0,
        }
    }

    /// Start `melody` from its first note. The first note is dispatched on
    /// the next call to [`Sequencer::update`]. A `bpm` of 0 means 120.
    pub fn play(&mut self, melody: &'a [MusicNote], bpm: u16) {
        self.melody = melody;
        self.index = 0;
        self.set_bpm(if bpm == 0 { DEFAULT_BPM } else { bpm });
        self.tick_sample_counter = self.samples_per_tick - 1;
        self.ticks_until_next_step = 0;
        self.playing = !melody.is_empty();
    }

    pub fn play_song(&mut self, song: &Song<'a>) {
        self.play(song.notes, song.bpm);
    }

    /// Stop dispatching. Voices already sounding are left alone.
    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Change tempo without moving the play position. Zero is ignored.
    pub fn set_bpm(&mut self, bpm: u16) {
        if bpm == 0 {
            return;
        }
        self.bpm = bpm;
        self.samples_per_tick = samples_per_tick(self.sample_rate, bpm);
        self.ms_per_tick = ms_per_tick(bpm);
    }

    pub fn bpm(&self) -> u16 {
        self.bpm
    }

    pub fn samples_per_tick(&self) -> u32 {
        self.samples_per_tick
    }

    pub fn ms_per_tick(&self) -> u32 {
        self.ms_per_tick
    }

    /// Index of the next note to dispatch.
    pub fn position(&self) -> usize {
        self.index
    }

    /// Advance by one sample, dispatching any notes that fall due.
    #[inline]
    pub fn update<S: NoteSink + ?Sized>(&mut self, sink: &mut S) {
        if !self.playing {
            return;
        }
        self.tick_sample_counter += 1;
        if self.tick_sample_counter < self.samples_per_tick {
            return;
        }
        self.tick_sample_counter = 0;

        if self.ticks_until_next_step > 0 {
            self.ticks_until_next_step -= 1;
        }

        while self.ticks_until_next_step == 0 {
            let Some(&lead) = self.melody.get(self.index) else {
                self.playing = false;
                return;
            };
            self.dispatch(&lead, sink);
            self.index += 1;

            while let Some(&follower) = self.melody.get(self.index) {
                if follower.advance_ticks != 0 {
                    break;
                }
                self.dispatch(&follower, sink);
                self.index += 1;
            }

            self.ticks_until_next_step = lead.advance_ticks as u32;
        }
    }

    fn dispatch<S: NoteSink + ?Sized>(&self, note: &MusicNote, sink: &mut S) {
        if note.is_rest() {
            return;
        }
        sink.set_sound_preset(note.preset);
        sink.play_note(
            note.pitch,
            note.duration_ticks as u32 * self.ms_per_tick,
            SEQUENCER_VOLUME,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    const SR: u32 = 8000;

    /// Records every call along with the update count it happened on.
    #[derive(Default)]
    struct Recorder {
        now: u32,
        preset: SoundPreset,
        played: Vec<(u32, u16, u32, SoundPreset)>,
    }

    impl NoteSink for Recorder {
        fn set_sound_preset(&mut self, preset: SoundPreset) {
            self.preset = preset;
        }

        fn play_note(&mut self, frequency: u16, duration_ms: u32, _volume: u8) {
            self.played.push((self.now, frequency, duration_ms, self.preset));
        }
    }

    fn run(seq: &mut Sequencer<'_>, rec: &mut Recorder, samples: u32) {
        for _ in 0..samples {
            rec.now += 1;
            seq.update(rec);
        }
    }

    #[test]
    fn tick_math_at_120_bpm() {
        let notes = [MusicNote::rest(1)];
        let mut seq = Sequencer::new(SR);
        seq.play(&notes, 120);
        assert_eq!(seq.ms_per_tick(), 125);
        assert_eq!(seq.samples_per_tick(), 1000);
    }

    #[test]
    fn quarter_rests_finish_after_sixteen_ticks() {
        let rests = [MusicNote::rest(4); 4];
        let mut seq = Sequencer::new(SR);
        let mut rec = Recorder::default();
        seq.play(&rests, 120);

        run(&mut seq, &mut rec, 16_000);
        assert!(seq.is_playing(), "should still be waiting out the last rest");
        run(&mut seq, &mut rec, 1);
        assert!(!seq.is_playing());
        assert!(rec.played.is_empty(), "rests never play a note");
        assert_eq!(seq.position(), 4);
    }

    #[test]
    fn first_note_plays_immediately() {
        let notes = [MusicNote::new(440, 2, 4, SoundPreset::Flute)];
        let mut seq = Sequencer::new(SR);
        let mut rec = Recorder::default();
        seq.play(&notes, 120);
        run(&mut seq, &mut rec, 1);
        assert_eq!(rec.played, vec![(1, 440, 250, SoundPreset::Flute)]);
    }

    #[test]
    fn notes_spaced_by_advance() {
        let notes = [
            MusicNote::new(262, 1, 2, SoundPreset::Pluck),
            MusicNote::new(330, 1, 1, SoundPreset::Pluck),
            MusicNote::new(392, 1, 1, SoundPreset::Organ),
        ];
        let mut seq = Sequencer::new(SR);
        let mut rec = Recorder::default();
        seq.play(&notes, 120);
        run(&mut seq, &mut rec, 5000);
        let starts: Vec<(u32, u16)> = rec.played.iter().map(|p| (p.0, p.1)).collect();
        assert_eq!(starts, vec![(1, 262), (2001, 330), (3001, 392)]);
        assert_eq!(rec.played[2].3, SoundPreset::Organ);
        assert!(!seq.is_playing());
    }

    #[test]
    fn chord_dispatches_in_one_pass() {
        let notes = [
            MusicNote::new(262, 4, 4, SoundPreset::Piano),
            MusicNote::new(330, 4, 0, SoundPreset::Piano),
            MusicNote::new(392, 4, 4, SoundPreset::Piano),
        ];
        let mut seq = Sequencer::new(SR);
        let mut rec = Recorder::default();
        seq.play(&notes, 120);
        run(&mut seq, &mut rec, 1);
        assert_eq!(rec.played.len(), 2);
        assert!(rec.played.iter().all(|p| p.0 == 1));
        run(&mut seq, &mut rec, 4000);
        assert_eq!(rec.played.len(), 3);
        assert_eq!(rec.played[2].0, 4001);
    }

    #[test]
    fn chord_takes_distinct_voices() {
        let notes = [
            MusicNote::new(262, 4, 4, SoundPreset::Piano),
            MusicNote::new(330, 4, 0, SoundPreset::Piano),
        ];
        let mut synth = Synthesizer::new(&EngineConfig::default(), SoundPreset::Default);
        let mut seq = Sequencer::new(SR);
        seq.play(&notes, 120);
        seq.update(&mut synth);
        assert_eq!(synth.active_voices(), 2);
        let pitches: Vec<u32> = synth.voices()[..2].iter().map(|v| v.oscillator.frequency).collect();
        assert_eq!(pitches, vec![262, 330]);
    }

    #[test]
    fn zero_advance_lead_joins_next_step() {
        let notes = [
            MusicNote::rest(0),
            MusicNote::new(262, 8, 0, SoundPreset::Piano),
            MusicNote::new(330, 8, 8, SoundPreset::Piano),
        ];
        let mut seq = Sequencer::new(SR);
        let mut rec = Recorder::default();
        seq.play(&notes, 120);
        run(&mut seq, &mut rec, 1);
        assert_eq!(rec.played.len(), 2);
    }

    #[test]
    fn set_bpm_keeps_position() {
        let notes = [MusicNote::new(440, 1, 1, SoundPreset::Beep); 4];
        let mut seq = Sequencer::new(SR);
        let mut rec = Recorder::default();
        seq.play(&notes, 120);
        run(&mut seq, &mut rec, 1001);
        assert_eq!(seq.position(), 2);
        seq.set_bpm(60);
        assert_eq!(seq.position(), 2);
        assert_eq!(seq.samples_per_tick(), 2000);
        run(&mut seq, &mut rec, 2000);
        assert_eq!(rec.played.len(), 3);
        assert_eq!(rec.played[2].2, 250, "duration follows the new tempo");
    }

    #[test]
    fn stop_halts_dispatch() {
        let notes = [MusicNote::new(440, 1, 1, SoundPreset::Beep); 4];
        let mut seq = Sequencer::new(SR);
        let mut rec = Recorder::default();
        seq.play(&notes, 120);
        run(&mut seq, &mut rec, 1);
        seq.stop();
        run(&mut seq, &mut rec, 10_000);
        assert_eq!(rec.played.len(), 1);
    }

    #[test]
    fn empty_melody_does_not_play() {
        let mut seq = Sequencer::new(SR);
        seq.play(&[], 120);
        assert!(!seq.is_playing());
    }

    #[test]
    fn zero_bpm_falls_back() {
        let notes = [MusicNote::rest(1)];
        let mut seq = Sequencer::new(SR);
        seq.play(&notes, 0);
        assert_eq!(seq.bpm(), DEFAULT_BPM);
        seq.set_bpm(0);
        assert_eq!(seq.bpm(), DEFAULT_BPM);
    }

    #[test]
    fn song_length() {
        let notes = [
            MusicNote::new(262, 16, 0, SoundPreset::Piano),
            MusicNote::new(330, 4, 4, SoundPreset::Flute),
            MusicNote::rest(8),
        ];
        let song = Song {
            name: "t",
            bpm: 100,
            notes: &notes,
        };
        assert_eq!(song.length_ticks(), 12);
    }
}

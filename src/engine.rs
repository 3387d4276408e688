//! Engine — splits the synthesizer and sequencer across two contexts.
//!
//! [`AudioEngine::begin`] returns an [`EngineHandle`] for the main thread and an
//! [`AudioCore`] for the sample interrupt. The handle never touches voice
//! or sequencer state: it enqueues [`Command`]s into a bounded queue that
//! the core drains at the top of every tick. The core reports back through
//! a few atomics the handle can read.
//!
//! All memory (queue slots, echo buffer, voice pool) is allocated in
//! [`AudioEngine::begin`]. [`AudioCore::tick`] neither allocates nor blocks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};

use crate::catalog::presets::{Patch, SoundPreset};
use crate::config::EngineConfig;
use crate::dsp::echo::EchoSettings;
use crate::dsp::envelope::AdsrParams;
use crate::dsp::oscillator::Waveform;
use crate::dsp::synth::Synthesizer;
use crate::dsp::voice::NoteId;
use crate::error::{ConfigError, EngineError};
use crate::output::PwmOutput;
use crate::sequencer::{MusicNote, Sequencer, Song};

/// A request from the main thread, applied at the start of the next tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command<'a> {
    PlayNote {
        id: NoteId,
        frequency: u16,
        duration_ms: u32,
        volume: u8,
    },
    StopNote(NoteId),
    StopAll,
    SetWaveform(Waveform),
    SetAdsr(AdsrParams),
    SetPreset(SoundPreset),
    SetPatch(Patch),
    SetEcho(EchoSettings),
    PlayMelody { notes: &'a [MusicNote], bpm: u16 },
    StopMelody,
    SetBpm(u16),
}

/// State published by the core after every tick.
#[derive(Debug, Default)]
struct Status {
    synth_busy: AtomicBool,
    melody_playing: AtomicBool,
    dropped: AtomicU32,
    ticks: AtomicU32,
}

/// Entry point: builds the two halves of an engine.
pub struct AudioEngine;

impl AudioEngine {
    /// Build an engine whose first notes use `preset`. Validates `config`.
    pub fn begin<'a>(
        config: &EngineConfig,
        preset: SoundPreset,
    ) -> Result<(EngineHandle<'a>, AudioCore<'a>), ConfigError> {
        config.validate()?;
        let (tx, rx) = bounded(config.command_queue_depth);
        let status = Arc::new(Status::default());

        let synth = Synthesizer::new(config, preset);
        log::info!(
            "audio engine ready: {} Hz, echo buffer {} samples, queue depth {}",
            config.sample_rate,
            synth.echo().capacity(),
            config.command_queue_depth
        );

        let handle = EngineHandle {
            tx,
            status: Arc::clone(&status),
            next_note: 1,
        };
        let core = AudioCore {
            synth,
            sequencer: Sequencer::new(config.sample_rate),
            rx,
            status,
            drain_limit: config.command_queue_depth,
        };
        Ok((handle, core))
    }

    /// [`AudioEngine::begin`] with the config's default preset.
    pub fn begin_default<'a>(config: &EngineConfig) -> Result<(EngineHandle<'a>, AudioCore<'a>), ConfigError> {
        Self::begin(config, config.default_preset)
    }
}

/// Main-thread side of the engine.
///
/// Every call only enqueues; the effect happens on the next tick. Queries
/// reflect the state after the most recent tick.
#[derive(Debug)]
pub struct EngineHandle<'a> {
    tx: Sender<Command<'a>>,
    status: Arc<Status>,
    next_note: u32,
}

impl<'a> EngineHandle<'a> {
    fn send(&self, command: Command<'a>) -> Result<(), EngineError> {
        match self.tx.try_send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(dropped)) => {
                self.status.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!("command queue full, dropping {dropped:?}");
                Err(EngineError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(EngineError::Disconnected),
        }
    }

    /// Queue a note. The returned id can stop this note alone; it matches
    /// nothing if the note turns out to be a rest. Handle ids never collide
    /// with the ids of notes the sequencer plays.
    pub fn play_note(&mut self, frequency: u16, duration_ms: u32, volume: u8) -> Result<NoteId, EngineError> {
        let id = NoteId::handle(self.next_note);
        self.send(Command::PlayNote {
            id,
            frequency,
            duration_ms,
            volume,
        })?;
        self.next_note = self.next_note.wrapping_add(1);
        Ok(id)
    }

    pub fn stop_note(&self, id: NoteId) -> Result<(), EngineError> {
        self.send(Command::StopNote(id))
    }

    /// Release every voice.
    pub fn stop_all(&self) -> Result<(), EngineError> {
        self.send(Command::StopAll)
    }

    pub fn set_waveform(&self, waveform: Waveform) -> Result<(), EngineError> {
        self.send(Command::SetWaveform(waveform))
    }

    pub fn set_adsr(&self, attack_ms: u16, decay_ms: u16, sustain_level: u8, release_ms: u16) -> Result<(), EngineError> {
        self.send(Command::SetAdsr(AdsrParams::new(
            attack_ms,
            decay_ms,
            sustain_level,
            release_ms,
        )))
    }

    pub fn set_sound_preset(&self, preset: SoundPreset) -> Result<(), EngineError> {
        self.send(Command::SetPreset(preset))
    }

    pub fn set_patch(&self, patch: Patch) -> Result<(), EngineError> {
        self.send(Command::SetPatch(patch))
    }

    pub fn set_echo(&self, enabled: bool, delay_ms: u16, feedback: u8, mix: u8) -> Result<(), EngineError> {
        self.send(Command::SetEcho(EchoSettings {
            enabled,
            delay_ms,
            feedback,
            mix,
        }))
    }

    /// Play a note list. `notes` must stay alive while the engine exists.
    pub fn play(&self, notes: &'a [MusicNote], bpm: u16) -> Result<(), EngineError> {
        self.send(Command::PlayMelody { notes, bpm })
    }

    pub fn play_song(&self, song: &Song<'a>) -> Result<(), EngineError> {
        self.play(song.notes, song.bpm)
    }

    /// Stop the melody and release whatever it left sounding.
    pub fn stop(&self) -> Result<(), EngineError> {
        self.send(Command::StopMelody)
    }

    pub fn set_bpm(&self, bpm: u16) -> Result<(), EngineError> {
        self.send(Command::SetBpm(bpm))
    }

    /// True if any voice was sounding after the last tick.
    pub fn is_playing(&self) -> bool {
        self.status.synth_busy.load(Ordering::Acquire)
    }

    /// True if the sequencer was playing after the last tick.
    pub fn is_melody_playing(&self) -> bool {
        self.status.melody_playing.load(Ordering::Acquire)
    }

    /// Commands lost to a full queue since construction.
    pub fn dropped_commands(&self) -> u32 {
        self.status.dropped.load(Ordering::Relaxed)
    }

    /// Ticks processed by the core (wraps).
    pub fn ticks(&self) -> u32 {
        self.status.ticks.load(Ordering::Relaxed)
    }
}

/// Interrupt side of the engine. Owns the synthesizer and the sequencer.
#[derive(Debug)]
pub struct AudioCore<'a> {
    synth: Synthesizer,
    sequencer: Sequencer<'a>,
    rx: Receiver<Command<'a>>,
    status: Arc<Status>,
    drain_limit: usize,
}

impl<'a> AudioCore<'a> {
    /// Process one sample period: apply pending commands, advance the
    /// sequencer, render and write one sample.
    #[inline]
    pub fn tick<O: PwmOutput + ?Sized>(&mut self, out: &mut O) {
        for _ in 0..self.drain_limit {
            match self.rx.try_recv() {
                Ok(command) => self.apply(command),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }

        self.sequencer.update(&mut self.synth);
        self.synth.update_sample(out);

        self.status.synth_busy.store(self.synth.is_playing(), Ordering::Release);
        self.status.melody_playing.store(self.sequencer.is_playing(), Ordering::Release);
        self.status.ticks.fetch_add(1, Ordering::Relaxed);
    }

    fn apply(&mut self, command: Command<'a>) {
        match command {
            Command::PlayNote {
                id,
                frequency,
                duration_ms,
                volume,
            } => {
                self.synth.start_note(id, frequency, duration_ms, volume);
            }
            Command::StopNote(id) => {
                self.synth.stop_voice(id);
            }
            Command::StopAll => self.synth.stop_all(),
            Command::SetWaveform(waveform) => self.synth.set_waveform(waveform),
            Command::SetAdsr(adsr) => {
                self.synth
                    .set_adsr(adsr.attack_ms, adsr.decay_ms, adsr.sustain_level, adsr.release_ms)
            }
            Command::SetPreset(preset) => self.synth.set_sound_preset(preset),
            Command::SetPatch(patch) => self.synth.set_patch(patch),
            Command::SetEcho(echo) => {
                self.synth
                    .set_echo(echo.enabled, echo.delay_ms, echo.feedback, echo.mix)
            }
            Command::PlayMelody { notes, bpm } => self.sequencer.play(notes, bpm),
            Command::StopMelody => {
                self.sequencer.stop();
                self.synth.stop_all();
            }
            Command::SetBpm(bpm) => self.sequencer.set_bpm(bpm),
        }
    }

    pub fn synth(&self) -> &Synthesizer {
        &self.synth
    }

    pub fn sequencer(&self) -> &Sequencer<'a> {
        &self.sequencer
    }

    /// Wrap the core and its output into the closure a timer interrupt calls.
    pub fn into_isr<'o, O>(mut self, mut out: O) -> impl FnMut() + Send + 'o
    where
        O: PwmOutput + Send + 'o,
        'a: 'o,
    {
        move || self.tick(&mut out)
    }

    /// Hand the core to a platform timer, firing at the configured rate.
    pub fn attach<'o, T, O>(self, timer: &mut T, out: O)
    where
        T: SampleTimer<'o>,
        O: PwmOutput + Send + 'o,
        'a: 'o,
    {
        let sample_rate = self.synth.sample_rate();
        timer.attach(sample_rate, Box::new(self.into_isr(out)));
    }
}

/// A periodic timer that calls the engine once per sample.
pub trait SampleTimer<'o> {
    fn attach(&mut self, sample_rate: u32, isr: Box<dyn FnMut() + Send + 'o>);
}

/// A timer fired by hand; drives the engine on a host or in tests.
#[derive(Default)]
pub struct ManualTimer<'o> {
    sample_rate: u32,
    isr: Option<Box<dyn FnMut() + Send + 'o>>,
}

impl<'o> ManualTimer<'o> {
    pub fn new() -> Self {
        ManualTimer {
            sample_rate: 0,
            isr: None,
        }
    }

    /// Run `periods` sample periods. Does nothing until attached.
    pub fn fire(&mut self, periods: u32) {
        if let Some(isr) = self.isr.as_mut() {
            for _ in 0..periods {
                isr();
            }
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_attached(&self) -> bool {
        self.isr.is_some()
    }
}

impl<'o> SampleTimer<'o> for ManualTimer<'o> {
    fn attach(&mut self, sample_rate: u32, isr: Box<dyn FnMut() + Send + 'o>) {
        self.sample_rate = sample_rate;
        self.isr = Some(isr);
    }
}

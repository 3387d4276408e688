//! Offline renderer — plays a song through the engine and captures the duties.

use crate::config::EngineConfig;
use crate::engine::{AudioCore, AudioEngine};
use crate::error::PropSoundError;
use crate::output::{OutputMode, RecordingOutput};
use crate::sequencer::{Song, samples_per_tick};

/// Longest ring-out allowed after the last note, in seconds.
const MAX_TAIL_SECONDS: u32 = 10;

/// Render `song` until the melody and every voice have finished.
///
/// When echo is enabled a further buffer's worth of samples is rendered so
/// the repeats can die away.
pub fn render_song(song: &Song<'_>, config: &EngineConfig) -> Result<RecordingOutput, PropSoundError> {
    let (handle, mut core) = AudioEngine::begin_default(config)?;
    handle.play_song(song)?;

    let body = song.length_ticks() as usize * samples_per_tick(config.sample_rate, song.bpm.max(1)) as usize;
    let limit = body + (MAX_TAIL_SECONDS * config.sample_rate) as usize;
    let mut out = RecordingOutput::with_capacity(body);

    // first tick applies the play command
    core.tick(&mut out);
    while busy(&core) && out.primary.len() < limit {
        core.tick(&mut out);
    }
    if core.synth().echo_settings().enabled {
        for _ in 0..core.synth().echo().capacity() {
            core.tick(&mut out);
        }
    }

    log::debug!(
        "rendered '{}': {} samples at {} Hz",
        song.name,
        out.primary.len(),
        config.sample_rate
    );
    Ok(out)
}

fn busy(core: &AudioCore<'_>) -> bool {
    core.sequencer().is_playing() || core.synth().is_playing()
}

/// Render `song` to an 8-bit WAV. Stereo unless the output mode is
/// [`OutputMode::Primary`].
pub fn render_wav(song: &Song<'_>, config: &EngineConfig) -> Result<Vec<u8>, PropSoundError> {
    let rendered = render_song(song, config)?;
    Ok(match config.output_mode {
        OutputMode::Primary => encode_wav(&rendered.primary, config.sample_rate, 1),
        OutputMode::Both | OutputMode::Differential => {
            let interleaved: Vec<u8> = rendered
                .primary
                .iter()
                .zip(&rendered.secondary)
                .flat_map(|(&l, &r)| [l, r])
                .collect();
            encode_wav(&interleaved, config.sample_rate, 2)
        }
    })
}

/// Encode interleaved unsigned 8-bit PCM to a WAV byte buffer. Duties map
/// directly: 128 is silence.
pub fn encode_wav(samples: &[u8], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 8;
    let byte_rate = sample_rate * channels as u32;
    let block_align = channels;
    let data_size = samples.len() as u32;
    // data chunks are padded to an even length
    let pad = samples.len() % 2;
    let file_size = 36 + data_size + pad as u32;

    let mut buf = Vec::with_capacity(44 + samples.len() + pad);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    buf.extend_from_slice(samples);
    if pad == 1 {
        buf.push(0);
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::songs::{SONG_COMPLEX, SONG_ERROR, SONG_INTRO};

    fn u32_at(wav: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([wav[at], wav[at + 1], wav[at + 2], wav[at + 3]])
    }

    fn u16_at(wav: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([wav[at], wav[at + 1]])
    }

    #[test]
    fn wav_header_valid() {
        let wav = encode_wav(&[128, 200, 56, 128], 8000, 1);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 4), 36 + 4);
        assert_eq!(u16_at(&wav, 22), 1, "channels");
        assert_eq!(u32_at(&wav, 24), 8000, "sample rate");
        assert_eq!(u32_at(&wav, 28), 8000, "byte rate");
        assert_eq!(u16_at(&wav, 34), 8, "bits per sample");
        assert_eq!(u32_at(&wav, 40), 4);
        assert_eq!(&wav[44..], &[128, 200, 56, 128]);
    }

    #[test]
    fn odd_data_is_padded() {
        let wav = encode_wav(&[1, 2, 3], 8000, 1);
        assert_eq!(u32_at(&wav, 40), 3);
        assert_eq!(wav.len(), 44 + 4);
        assert_eq!(u32_at(&wav, 4) as usize, wav.len() - 8);
    }

    #[test]
    fn song_renders_to_silence() {
        let config = EngineConfig::default();
        let out = render_song(&SONG_INTRO, &config).unwrap();
        // 14 ticks of 1000 samples before the melody ends
        assert!(out.primary.len() > 14_000, "only {} samples", out.primary.len());
        assert!(out.primary.iter().any(|&d| d != 128), "render is silent");
        let last = *out.primary.last().unwrap();
        assert!((126..=130).contains(&last), "tail ends at duty {last}");
        assert!(out.secondary.is_empty());
    }

    #[test]
    fn differential_render_is_stereo() {
        let config = EngineConfig {
            output_mode: OutputMode::Differential,
            ..EngineConfig::default()
        };
        let wav = render_wav(&SONG_ERROR, &config).unwrap();
        assert_eq!(u16_at(&wav, 22), 2);
        let data = &wav[44..44 + u32_at(&wav, 40) as usize];
        assert!(data.chunks(2).all(|frame| frame[0] as u16 + frame[1] as u16 == 255));
    }

    #[test]
    fn render_is_deterministic() {
        let config = EngineConfig::default();
        let a = render_wav(&SONG_COMPLEX, &config).unwrap();
        let b = render_wav(&SONG_COMPLEX, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_config_is_an_error() {
        let config = EngineConfig {
            sample_rate: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            render_song(&SONG_INTRO, &config),
            Err(PropSoundError::Config(_))
        ));
    }
}

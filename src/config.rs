//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::catalog::presets::SoundPreset;
use crate::error::ConfigError;
use crate::fixed::ms_to_samples;
use crate::output::OutputMode;

/// Number of voices in the pool. Fixed at compile time.
pub const MAX_VOICES: usize = 4;

pub const MIN_SAMPLE_RATE: u32 = 1000;
pub const MAX_SAMPLE_RATE: u32 = 48_000;

/// Settings fixed for the lifetime of an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Sample (interrupt) rate in Hz.
    pub sample_rate: u32,
    /// Longest echo delay the buffer must hold.
    pub max_echo_ms: u16,
    pub output_mode: OutputMode,
    /// Commands that may be pending between two ticks.
    pub command_queue_depth: usize,
    /// Seed for the noise waveform; each voice derives its own stream.
    pub noise_seed: u64,
    /// Preset applied at startup.
    pub default_preset: SoundPreset,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: 8000,
            max_echo_ms: 250,
            output_mode: OutputMode::Primary,
            command_queue_depth: 32,
            noise_seed: 0x5EED_F00D,
            default_preset: SoundPreset::Default,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json).map_err(ConfigError::Json)?;
        config.validate()?;
        log::debug!("loaded engine config: {config:?}");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(ConfigError::InvalidSampleRate {
                hz: self.sample_rate,
            });
        }
        if self.command_queue_depth == 0 {
            return Err(ConfigError::ZeroQueueDepth);
        }
        Ok(())
    }

    /// Echo buffer capacity in samples.
    pub fn echo_capacity(&self) -> usize {
        ms_to_samples(self.max_echo_ms as u32, self.sample_rate) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.echo_capacity(), 2000);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config =
            EngineConfig::from_json(r#"{"sampleRate": 16000, "outputMode": "differential"}"#)
                .unwrap();
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.output_mode, OutputMode::Differential);
        assert_eq!(config.command_queue_depth, 32);
        assert_eq!(config.default_preset, SoundPreset::Default);
    }

    #[test]
    fn rejects_bad_sample_rate() {
        let err = EngineConfig::from_json(r#"{"sampleRate": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSampleRate { hz: 0 }));
        let err = EngineConfig::from_json(r#"{"sampleRate": 96000}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSampleRate { hz: 96000 }));
    }

    #[test]
    fn rejects_zero_queue() {
        let err = EngineConfig::from_json(r#"{"commandQueueDepth": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroQueueDepth));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = EngineConfig::from_json("{sampleRate:").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
        assert!(err.to_string().starts_with("Invalid config JSON"));
    }
}

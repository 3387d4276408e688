pub mod catalog;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod fixed;
pub mod output;
pub mod sequencer;

use crate::config::EngineConfig;
use crate::error::PropSoundError;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the propsound-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Names of the built-in songs, in catalog order.
pub fn built_in_song_names() -> Vec<&'static str> {
    catalog::songs::SONGS.iter().map(|s| s.name).collect()
}

/// Render a built-in song by name to an 8-bit mono WAV.
pub fn render_built_in_wav(name: &str, sample_rate: u32) -> Result<Vec<u8>, PropSoundError> {
    let song = catalog::songs::find_song(name)?;
    let config = EngineConfig {
        sample_rate,
        ..EngineConfig::default()
    };
    dsp::renderer::render_wav(song, &config)
}

/// WASM-exposed: list the built-in song names as a JS array.
#[wasm_bindgen]
pub fn song_names() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&built_in_song_names()).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: render a built-in song to a WAV byte array.
#[wasm_bindgen]
pub fn render_song_wav(name: &str, sample_rate: u32) -> Result<Vec<u8>, JsValue> {
    render_built_in_wav(name, sample_rate).map_err(|e| JsValue::from_str(&format!("{e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_built_in_songs() {
        assert_eq!(built_in_song_names(), vec!["intro", "success", "error", "complex"]);
    }

    #[test]
    fn renders_by_name() {
        let wav = render_built_in_wav("success", 11025).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 11025);
        assert!(wav.len() > 44);
    }

    #[test]
    fn unknown_song_reported() {
        let err = render_built_in_wav("polka", 8000).unwrap_err();
        assert!(matches!(err, PropSoundError::Catalog(_)));
        assert!(err.to_string().contains("polka"));
    }
}

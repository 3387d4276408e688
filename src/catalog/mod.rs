//! Data the engine consumes: note pitches, sound presets and songs.

pub mod notes;
pub mod presets;
pub mod songs;

//! Built-in songs and loading of external song catalogs.
//!
//! Chords are written lead-first: the lead note carries the wait before the
//! next step, and the notes sounding with it have an advance of zero.

use serde::{Deserialize, Serialize};

use super::notes::*;
use super::presets::SoundPreset::{self, Flute, Organ, Piano, Pluck, SynthLead};
use crate::error::CatalogError;
use crate::sequencer::{MusicNote, Song};

const fn n(pitch: u16, duration: u16, advance: u16, preset: SoundPreset) -> MusicNote {
    MusicNote::new(pitch, duration, advance, preset)
}

static NOTES_INTRO: [MusicNote; 4] = [
    n(NOTE_C4, DUR_8, DUR_8, Pluck),
    n(NOTE_E4, DUR_8, DUR_8, Pluck),
    n(NOTE_G4, DUR_8, DUR_8, Pluck),
    n(NOTE_C5, DUR_2, DUR_2, Flute),
];

static NOTES_SUCCESS: [MusicNote; 7] = [
    n(NOTE_C5, DUR_16, DUR_16, SynthLead),
    n(NOTE_E5, DUR_16, DUR_16, SynthLead),
    n(NOTE_G5, DUR_16, DUR_16, SynthLead),
    n(NOTE_C6, DUR_4, DUR_4, SynthLead),
    n(NOTE_C4, DUR_2, DUR_2, Piano),
    n(NOTE_E4, DUR_2, 0, Piano),
    n(NOTE_G4, DUR_2, 0, Piano),
];

static NOTES_ERROR: [MusicNote; 2] = [
    n(NOTE_G3, DUR_4, DUR_4, Organ),
    n(NOTE_CS3, DUR_2, DUR_2, Organ),
];

static NOTES_COMPLEX: [MusicNote; 30] = [
    // C major under an ascending line
    n(NOTE_C5, DUR_4, DUR_4, Flute),
    n(NOTE_C3, DUR_1, 0, Piano),
    n(NOTE_E3, DUR_1, 0, Piano),
    n(NOTE_G3, DUR_1, 0, Piano),
    n(NOTE_D5, DUR_4, DUR_4, Flute),
    n(NOTE_E5, DUR_4, DUR_4, Flute),
    n(NOTE_F5, DUR_4, DUR_4, Flute),
    // G major, descending
    n(NOTE_G5, DUR_4, DUR_4, Flute),
    n(NOTE_G2, DUR_1, 0, Piano),
    n(NOTE_B2, DUR_1, 0, Piano),
    n(NOTE_D3, DUR_1, 0, Piano),
    n(NOTE_F5, DUR_4, DUR_4, Flute),
    n(NOTE_E5, DUR_4, DUR_4, Flute),
    n(NOTE_D5, DUR_4, DUR_4, Flute),
    // A minor, eighth-note run
    n(NOTE_C6, DUR_8, DUR_8, Flute),
    n(NOTE_A2, DUR_1, 0, Piano),
    n(NOTE_C3, DUR_1, 0, Piano),
    n(NOTE_E3, DUR_1, 0, Piano),
    n(NOTE_B5, DUR_8, DUR_8, Flute),
    n(NOTE_A5, DUR_8, DUR_8, Flute),
    n(NOTE_G5, DUR_8, DUR_8, Flute),
    n(NOTE_F5, DUR_8, DUR_8, Flute),
    n(NOTE_E5, DUR_8, DUR_8, Flute),
    n(NOTE_D5, DUR_8, DUR_8, Flute),
    n(NOTE_C5, DUR_8, DUR_8, Flute),
    // Final C major
    n(NOTE_C4, DUR_2, DUR_2, Piano),
    n(NOTE_C3, DUR_2, 0, Piano),
    n(NOTE_E3, DUR_2, 0, Piano),
    n(NOTE_G3, DUR_2, 0, Piano),
    MusicNote::rest(DUR_4),
];

pub static SONG_INTRO: Song<'static> = Song {
    name: "intro",
    bpm: 120,
    notes: &NOTES_INTRO,
};

pub static SONG_SUCCESS: Song<'static> = Song {
    name: "success",
    bpm: 150,
    notes: &NOTES_SUCCESS,
};

pub static SONG_ERROR: Song<'static> = Song {
    name: "error",
    bpm: 100,
    notes: &NOTES_ERROR,
};

pub static SONG_COMPLEX: Song<'static> = Song {
    name: "complex",
    bpm: 100,
    notes: &NOTES_COMPLEX,
};

/// Every built-in song.
pub static SONGS: [&Song<'static>; 4] = [&SONG_INTRO, &SONG_SUCCESS, &SONG_ERROR, &SONG_COMPLEX];

/// Look up a built-in song by name.
pub fn find_song(name: &str) -> Result<&'static Song<'static>, CatalogError> {
    SONGS
        .iter()
        .copied()
        .find(|s| s.name == name)
        .ok_or_else(|| CatalogError::UnknownSong {
            name: name.to_string(),
        })
}

/// An owned song, as stored in an external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongDef {
    pub name: String,
    pub bpm: u16,
    pub notes: Vec<MusicNote>,
}

impl SongDef {
    /// Borrow as a playable song. The definition must outlive playback.
    pub fn song(&self) -> Song<'_> {
        Song {
            name: &self.name,
            bpm: self.bpm,
            notes: &self.notes,
        }
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.notes.is_empty() {
            return Err(CatalogError::EmptySong {
                name: self.name.clone(),
            });
        }
        if self.bpm == 0 {
            return Err(CatalogError::ZeroTempo {
                name: self.name.clone(),
            });
        }
        Ok(())
    }
}

impl From<&Song<'_>> for SongDef {
    fn from(song: &Song<'_>) -> Self {
        SongDef {
            name: song.name.to_string(),
            bpm: song.bpm,
            notes: song.notes.to_vec(),
        }
    }
}

/// Parse a JSON array of songs and validate each one.
pub fn load_songs_json(json: &str) -> Result<Vec<SongDef>, CatalogError> {
    let songs: Vec<SongDef> = serde_json::from_str(json).map_err(CatalogError::Json)?;
    for song in &songs {
        song.validate()?;
    }
    log::info!("loaded {} songs from catalog", songs.len());
    Ok(songs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name() {
        assert_eq!(find_song("error").unwrap().bpm, 100);
        assert!(matches!(
            find_song("polka"),
            Err(CatalogError::UnknownSong { name }) if name == "polka"
        ));
    }

    #[test]
    fn built_in_songs_are_valid() {
        for song in SONGS {
            SongDef::from(song).validate().unwrap();
            assert!(song.length_ticks() > 0, "{} has no length", song.name);
        }
    }

    #[test]
    fn complex_bars_are_sixteen_ticks() {
        // Three bars of 16 plus a half-note chord and a quarter rest
        assert_eq!(SONG_COMPLEX.length_ticks(), 3 * 16 + 8 + 4);
    }

    #[test]
    fn pitches_playable_at_default_rate() {
        for song in SONGS {
            assert!(song.notes.iter().all(|n| (n.pitch as u32) * 2 < 8000));
        }
    }

    #[test]
    fn load_json_catalog() {
        let json = r#"[
            {"name": "door", "bpm": 90, "notes": [
                {"pitch": 440, "durationTicks": 2, "advanceTicks": 2, "preset": "beep"},
                {"pitch": 0, "durationTicks": 2, "advanceTicks": 2},
                {"pitch": 660, "durationTicks": 4, "advanceTicks": 4, "preset": "synth_lead"}
            ]}
        ]"#;
        let songs = load_songs_json(json).unwrap();
        assert_eq!(songs.len(), 1);
        let song = songs[0].song();
        assert_eq!(song.name, "door");
        assert_eq!(song.notes[0].preset, SoundPreset::Beep);
        assert_eq!(song.notes[1].preset, SoundPreset::Default);
        assert!(song.notes[1].is_rest());
    }

    #[test]
    fn rejects_bad_catalogs() {
        assert!(matches!(
            load_songs_json(r#"[{"name": "x", "bpm": 0, "notes": [{"pitch": 1, "durationTicks": 1, "advanceTicks": 1}]}]"#),
            Err(CatalogError::ZeroTempo { .. })
        ));
        assert!(matches!(
            load_songs_json(r#"[{"name": "x", "bpm": 90, "notes": []}]"#),
            Err(CatalogError::EmptySong { .. })
        ));
        assert!(matches!(load_songs_json("nope"), Err(CatalogError::Json(_))));
    }

    #[test]
    fn song_def_round_trips_through_json() {
        let def = SongDef::from(&SONG_SUCCESS);
        let json = serde_json::to_string(&vec![def.clone()]).unwrap();
        assert_eq!(load_songs_json(&json).unwrap(), vec![def]);
    }
}

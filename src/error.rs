use std::fmt;

/// Any error surfaced by the main-thread API.
#[derive(Debug)]
pub enum PropSoundError {
    Config(ConfigError),
    Catalog(CatalogError),
    Engine(EngineError),
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidSampleRate { hz: u32 },
    ZeroQueueDepth,
    Json(serde_json::Error),
}

#[derive(Debug)]
pub enum CatalogError {
    Json(serde_json::Error),
    UnknownSong { name: String },
    EmptySong { name: String },
    ZeroTempo { name: String },
}

/// Failure to hand a command to the audio core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// The command queue is full; the command was dropped.
    QueueFull,
    /// The audio core has been dropped.
    Disconnected,
}

impl fmt::Display for PropSoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropSoundError::Config(e) => write!(f, "Config error: {e}"),
            PropSoundError::Catalog(e) => write!(f, "Catalog error: {e}"),
            PropSoundError::Engine(e) => write!(f, "Engine error: {e}"),
        }
    }
}

impl std::error::Error for PropSoundError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidSampleRate { hz } => {
                write!(f, "Sample rate {hz} Hz outside supported range 1000..=48000")
            }
            ConfigError::ZeroQueueDepth => write!(f, "Command queue depth must be at least 1"),
            ConfigError::Json(e) => write!(f, "Invalid config JSON: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Json(e) => write!(f, "Invalid song catalog JSON: {e}"),
            CatalogError::UnknownSong { name } => write!(f, "Unknown song '{name}'"),
            CatalogError::EmptySong { name } => write!(f, "Song '{name}' has no notes"),
            CatalogError::ZeroTempo { name } => write!(f, "Song '{name}' has a tempo of 0 bpm"),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::QueueFull => write!(f, "Command queue full, command dropped"),
            EngineError::Disconnected => write!(f, "Audio core is gone"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<ConfigError> for PropSoundError {
    fn from(e: ConfigError) -> Self {
        PropSoundError::Config(e)
    }
}

impl From<CatalogError> for PropSoundError {
    fn from(e: CatalogError) -> Self {
        PropSoundError::Catalog(e)
    }
}

impl From<EngineError> for PropSoundError {
    fn from(e: EngineError) -> Self {
        PropSoundError::Engine(e)
    }
}

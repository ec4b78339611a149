// Error handling for the playback engine

use std::fmt;

/// Playback engine error types
#[derive(Debug, Clone)]
pub enum PlaybackError {
    /// Renderer transport failure (configure/prepare/start/seek)
    Renderer(String),

    /// The requested source cannot be used
    Source(String),

    /// Operation not valid in the current state
    InvalidState(String),

    /// Network error (catalog queries, stream setup)
    Network(String),

    /// Malformed payload from the catalog service
    Parse(String),

    /// IO error
    Io(String),

    /// Generic error
    Other(String),
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PlaybackError::Renderer(msg) => write!(f, "Renderer error: {}", msg),
            PlaybackError::Source(msg) => write!(f, "Source error: {}", msg),
            PlaybackError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            PlaybackError::Network(msg) => write!(f, "Network error: {}", msg),
            PlaybackError::Parse(msg) => write!(f, "Parse error: {}", msg),
            PlaybackError::Io(msg) => write!(f, "IO error: {}", msg),
            PlaybackError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for PlaybackError {}

/// Result type alias for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

// Conversion implementations
impl From<std::io::Error> for PlaybackError {
    fn from(err: std::io::Error) -> Self {
        PlaybackError::Io(err.to_string())
    }
}

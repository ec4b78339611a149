// Session-level playback state

use std::fmt;

/// Playback state of the session
///
/// Reflects session intent, not renderer ground truth, and is the single
/// source of truth for whether the progress reporter runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    /// No playback in progress; also the implicit condition while a new
    /// stream is being prepared
    #[default]
    Stopped,
    /// The active stream is rendering
    Playing,
    /// The active stream is suspended at its current position
    Paused,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

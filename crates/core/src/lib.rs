// Core types for the bookshelf playback engine

pub mod error;
pub mod observer;
pub mod state;
pub mod time;
pub mod track;

// Re-export commonly used types
pub use error::{PlaybackError, Result};
pub use observer::{ProgressEvent, SessionEvent, SessionObserver};
pub use state::PlaybackState;
pub use time::{Millis, Seconds};
pub use track::{SourceLocator, TrackRef};

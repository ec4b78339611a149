// Observer event model for the playback session

use crate::time::Seconds;
use crate::track::TrackRef;

/// Periodic progress report for the active track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub track: TrackRef,
    /// Elapsed playback position in whole seconds
    pub elapsed: Seconds,
}

/// Events delivered to the bound observer
///
/// Events are produced at emission time only: nothing is queued for an
/// absent observer and nothing is replayed to a newly bound one. A fresh
/// observer pulls the session's synchronous status instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Position update for the active track
    Progress(ProgressEvent),

    /// The reporter observed a pause racing its tick; no position attached
    Paused,

    /// The active track played to the end
    Completed { track: TrackRef },

    /// The stream could not be configured or prepared
    Failed { message: String },
}

/// Receiver for session events
///
/// Invoked from background threads; implementations should return
/// quickly to avoid delaying the reporter loop.
pub trait SessionObserver: Send + Sync {
    fn on_event(&self, event: SessionEvent);
}

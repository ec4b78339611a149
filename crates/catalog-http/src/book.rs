// Catalog book records

use bookshelf_core::{Seconds, TrackRef};
use serde::{Deserialize, Serialize};

/// One catalog entry from a book search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: u32,
    pub title: String,
    pub author: String,
    pub cover_url: String,
    /// Running time in whole seconds
    pub duration: u32,
}

impl Book {
    /// Track reference for handing this book to the playback session
    pub fn track_ref(&self) -> TrackRef {
        TrackRef::Catalog(self.id)
    }

    pub fn duration_seconds(&self) -> Seconds {
        Seconds(u64::from(self.duration))
    }
}

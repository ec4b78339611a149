// Track identity and renderer source locators

use std::fmt;

/// Identity of the audio content targeted for playback
///
/// Exactly one of the two forms is set for any given playback; a new
/// `play` replaces the reference wholesale, never mutates it in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackRef {
    /// A catalog entry, streamed from the book service
    Catalog(u32),
    /// Local content addressed by an opaque URI
    Local(String),
}

impl TrackRef {
    /// Map this track to the locator handed to the renderer
    ///
    /// Catalog ids are appended to the configured download endpoint;
    /// local URIs pass through untouched.
    pub fn to_locator(&self, stream_base_url: &str) -> SourceLocator {
        match self {
            TrackRef::Catalog(id) => SourceLocator::Remote(format!("{}{}", stream_base_url, id)),
            TrackRef::Local(uri) => SourceLocator::Local(uri.clone()),
        }
    }
}

impl fmt::Display for TrackRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TrackRef::Catalog(id) => write!(f, "catalog #{}", id),
            TrackRef::Local(uri) => write!(f, "{}", uri),
        }
    }
}

/// What the renderer is configured with for one stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    /// A network locator the renderer streams from
    Remote(String),
    /// A locator for content already on the device
    Local(String),
}

impl SourceLocator {
    pub fn as_str(&self) -> &str {
        match self {
            SourceLocator::Remote(url) => url,
            SourceLocator::Local(uri) => uri,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_locator_appends_id() {
        let track = TrackRef::Catalog(42);
        let locator = track.to_locator("https://books.example/stream?id=");
        assert_eq!(
            locator,
            SourceLocator::Remote("https://books.example/stream?id=42".to_string())
        );
    }

    #[test]
    fn test_local_locator_passes_through() {
        let track = TrackRef::Local("file:///sdcard/book.mp3".to_string());
        let locator = track.to_locator("https://books.example/stream?id=");
        assert_eq!(locator.as_str(), "file:///sdcard/book.mp3");
    }
}

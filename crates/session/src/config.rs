// Session tuning parameters

use std::time::Duration;

/// Catalog download endpoint; a catalog track id is appended to form the
/// stream locator
pub const DEFAULT_STREAM_BASE_URL: &str = "https://kamorris.com/lab/audlib/download.php?id=";

/// Progress reporting period
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Settle delay before a recorded start offset is applied after prepare
pub const DEFAULT_SEEK_SETTLE: Duration = Duration::from_millis(500);

/// Tuning knobs for a playback session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL catalog track ids are appended to
    pub stream_base_url: String,

    /// Period of the progress reporter loop
    pub tick: Duration,

    /// Delay between starting a prepared stream and seeking to the
    /// recorded start offset
    pub seek_settle: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stream_base_url: DEFAULT_STREAM_BASE_URL.to_string(),
            tick: DEFAULT_TICK,
            seek_settle: DEFAULT_SEEK_SETTLE,
        }
    }
}

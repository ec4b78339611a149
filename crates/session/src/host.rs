// Host environment hooks
//
// The platform owns foreground presentation and process lifetime; the
// session only signals intent through this seam.

/// Platform session chrome driven by the playback session
pub trait HostEnvironment: Send + Sync {
    /// Playback is starting; the session wants visible presentation
    fn enter_foreground(&self);

    /// Playback stopped; visible presentation may be withdrawn
    fn exit_foreground(&self);

    /// The active track finished; the host may tear the session down
    fn request_shutdown(&self);
}

/// No-op host for embedding and tests
#[derive(Debug, Default)]
pub struct DetachedHost;

impl HostEnvironment for DetachedHost {
    fn enter_foreground(&self) {}

    fn exit_foreground(&self) {}

    fn request_shutdown(&self) {}
}

// Audio renderer capability interface
//
// The decode/output engine is an external collaborator; the session
// drives it through this seam and platform adapters implement it.

use bookshelf_core::{Millis, Result, SourceLocator};
use std::sync::Arc;

/// Monotonic tag for asynchronous prepare requests
///
/// Lifecycle events echo the id of the request that produced them, so a
/// superseded prepare can be told apart from the current one when its
/// event finally arrives.
pub type RequestId = u64;

/// Lifecycle events emitted by the renderer
#[derive(Debug, Clone)]
pub enum RendererEvent {
    /// The stream for the given request is ready to start
    Prepared { request: RequestId },

    /// The stream for the given request played to the end
    Completed { request: RequestId },

    /// The stream for the given request could not be delivered
    Failed { request: RequestId, message: String },
}

/// Receiver for renderer lifecycle events
///
/// Invoked from the renderer's internal thread, never synchronously from
/// within a control call. Implementations should return quickly.
pub trait RendererListener: Send + Sync {
    fn on_event(&self, event: RendererEvent);
}

/// One-stream audio renderer
///
/// Asynchronous prepare, synchronous transport once prepared. At most
/// one stream is active at a time; configuring a new source always goes
/// through `reset` first. All time values cross this boundary in the
/// renderer's native milliseconds.
pub trait AudioRenderer: Send {
    /// Register the listener for lifecycle events, replacing any
    /// previous one
    fn set_listener(&mut self, listener: Option<Arc<dyn RendererListener>>);

    /// Return to the idle-ready condition, abandoning any configured or
    /// in-flight stream
    ///
    /// A prepare abandoned here may still deliver its event later;
    /// callers discard it by request id.
    fn reset(&mut self);

    /// Select the source for the next prepare
    fn configure(&mut self, source: &SourceLocator) -> Result<()>;

    /// Begin asynchronous preparation of the configured source
    ///
    /// Readiness is signalled with `RendererEvent::Prepared` carrying
    /// the same request id; this call returns without waiting.
    fn prepare_async(&mut self, request: RequestId) -> Result<()>;

    /// Start or restart output of the prepared stream
    fn start(&mut self) -> Result<()>;

    /// Suspend output, keeping the stream position
    fn pause(&mut self) -> Result<()>;

    /// Halt output
    fn stop(&mut self) -> Result<()>;

    /// Jump to a position within the prepared stream
    fn seek_to(&mut self, position: Millis) -> Result<()>;

    /// Current position of the prepared stream
    ///
    /// Returns `InvalidState` when no stream is prepared; any other
    /// error is transient and safe to retry on the next sample.
    fn position(&self) -> Result<Millis>;

    /// Total duration of the prepared stream
    ///
    /// Returns `InvalidState` when no stream is prepared.
    fn duration(&self) -> Result<Millis>;

    /// Whether output is actually running right now
    fn is_playing(&self) -> bool;
}

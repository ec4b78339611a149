// Shared fakes for session and reporter tests

use bookshelf_core::{
    Millis, PlaybackError, Result, SessionEvent, SessionObserver, SourceLocator,
};
use bookshelf_renderer_api::{AudioRenderer, RendererEvent, RendererListener, RequestId};
use crate::host::HostEnvironment;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Simulated stream position clock
///
/// Advances with wall time while started, freezes while paused, and
/// jumps on seek, so sampled positions behave like a real renderer's.
struct FakeClock {
    base_ms: u64,
    started_at: Option<Instant>,
}

impl FakeClock {
    fn new() -> Self {
        Self {
            base_ms: 0,
            started_at: None,
        }
    }

    fn now_ms(&self) -> u64 {
        let running = self
            .started_at
            .map(|at| at.elapsed().as_millis() as u64)
            .unwrap_or(0);
        self.base_ms + running
    }

    fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    fn freeze(&mut self) {
        self.base_ms = self.now_ms();
        self.started_at = None;
    }

    fn seek(&mut self, position_ms: u64) {
        let running = self.started_at.is_some();
        self.base_ms = position_ms;
        if running {
            self.started_at = Some(Instant::now());
        }
    }

    fn reset(&mut self) {
        self.base_ms = 0;
        self.started_at = None;
    }
}

struct FakeRendererInner {
    listener: Mutex<Option<Arc<dyn RendererListener>>>,
    clock: Mutex<FakeClock>,
    configured: Mutex<Option<SourceLocator>>,
    prepare_requests: Mutex<Vec<RequestId>>,
    prepared: AtomicBool,
    playing: AtomicBool,
    duration_ms: AtomicU64,
    resets: AtomicU64,
    fail_configure: AtomicBool,
    fail_position: AtomicBool,
}

/// Scripted renderer with a simulated position clock
///
/// Cheap to clone: the test keeps one handle while the session owns the
/// other. Prepare completion and the other lifecycle events are fired
/// manually so tests control event ordering exactly.
#[derive(Clone)]
pub(crate) struct FakeRenderer {
    inner: Arc<FakeRendererInner>,
}

impl FakeRenderer {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(FakeRendererInner {
                listener: Mutex::new(None),
                clock: Mutex::new(FakeClock::new()),
                configured: Mutex::new(None),
                prepare_requests: Mutex::new(Vec::new()),
                prepared: AtomicBool::new(false),
                playing: AtomicBool::new(false),
                duration_ms: AtomicU64::new(600_000),
                resets: AtomicU64::new(0),
                fail_configure: AtomicBool::new(false),
                fail_position: AtomicBool::new(false),
            }),
        }
    }

    fn emit(&self, event: RendererEvent) {
        let listener = self.inner.listener.lock().clone();
        if let Some(listener) = listener {
            listener.on_event(event);
        }
    }

    fn latest_request(&self) -> RequestId {
        self.inner
            .prepare_requests
            .lock()
            .last()
            .copied()
            .expect("no prepare issued")
    }

    pub(crate) fn fire_prepared_latest(&self) {
        let request = self.latest_request();
        self.fire_prepared_for(request);
    }

    pub(crate) fn fire_prepared_for(&self, request: RequestId) {
        // The stream is ready before the event goes out, as a real
        // renderer would have it
        self.inner.prepared.store(true, Ordering::SeqCst);
        self.emit(RendererEvent::Prepared { request });
    }

    pub(crate) fn fire_completed_latest(&self) {
        let request = self.latest_request();
        self.inner.playing.store(false, Ordering::SeqCst);
        self.emit(RendererEvent::Completed { request });
    }

    pub(crate) fn fire_failed_latest(&self, message: &str) {
        let request = self.latest_request();
        self.emit(RendererEvent::Failed {
            request,
            message: message.to_string(),
        });
    }

    pub(crate) fn configured_locator(&self) -> Option<SourceLocator> {
        self.inner.configured.lock().clone()
    }

    pub(crate) fn prepare_requests(&self) -> Vec<RequestId> {
        self.inner.prepare_requests.lock().clone()
    }

    pub(crate) fn reset_count(&self) -> u64 {
        self.inner.resets.load(Ordering::SeqCst)
    }

    pub(crate) fn set_duration(&self, duration: Millis) {
        self.inner.duration_ms.store(duration.get(), Ordering::SeqCst);
    }

    pub(crate) fn fail_next_configure(&self) {
        self.inner.fail_configure.store(true, Ordering::SeqCst);
    }

    pub(crate) fn set_position_failing(&self, failing: bool) {
        self.inner.fail_position.store(failing, Ordering::SeqCst);
    }

    // Direct state setup for reporter tests that bypass the session

    pub(crate) fn make_prepared(&self) {
        self.inner.prepared.store(true, Ordering::SeqCst);
    }

    pub(crate) fn begin_playback(&self) {
        self.inner.clock.lock().start();
        self.inner.playing.store(true, Ordering::SeqCst);
    }

    pub(crate) fn seek_base(&self, position: Millis) {
        self.inner.clock.lock().seek(position.get());
    }
}

impl AudioRenderer for FakeRenderer {
    fn set_listener(&mut self, listener: Option<Arc<dyn RendererListener>>) {
        *self.inner.listener.lock() = listener;
    }

    fn reset(&mut self) {
        *self.inner.configured.lock() = None;
        self.inner.prepared.store(false, Ordering::SeqCst);
        self.inner.playing.store(false, Ordering::SeqCst);
        self.inner.clock.lock().reset();
        self.inner.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn configure(&mut self, source: &SourceLocator) -> Result<()> {
        if self.inner.fail_configure.swap(false, Ordering::SeqCst) {
            return Err(PlaybackError::Source("configure refused".to_string()));
        }
        *self.inner.configured.lock() = Some(source.clone());
        Ok(())
    }

    fn prepare_async(&mut self, request: RequestId) -> Result<()> {
        self.inner.prepare_requests.lock().push(request);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        if !self.inner.prepared.load(Ordering::SeqCst) {
            return Err(PlaybackError::InvalidState(
                "start without a prepared stream".to_string(),
            ));
        }
        self.inner.clock.lock().start();
        self.inner.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.inner.clock.lock().freeze();
        self.inner.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.inner.clock.lock().freeze();
        self.inner.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn seek_to(&mut self, position: Millis) -> Result<()> {
        if !self.inner.prepared.load(Ordering::SeqCst) {
            return Err(PlaybackError::InvalidState(
                "seek without a prepared stream".to_string(),
            ));
        }
        self.inner.clock.lock().seek(position.get());
        Ok(())
    }

    fn position(&self) -> Result<Millis> {
        if !self.inner.prepared.load(Ordering::SeqCst) {
            return Err(PlaybackError::InvalidState(
                "no prepared stream".to_string(),
            ));
        }
        if self.inner.fail_position.load(Ordering::SeqCst) {
            return Err(PlaybackError::Renderer("sample glitch".to_string()));
        }
        Ok(Millis(self.inner.clock.lock().now_ms()))
    }

    fn duration(&self) -> Result<Millis> {
        if !self.inner.prepared.load(Ordering::SeqCst) {
            return Err(PlaybackError::InvalidState(
                "no prepared stream".to_string(),
            ));
        }
        Ok(Millis(self.inner.duration_ms.load(Ordering::SeqCst)))
    }

    fn is_playing(&self) -> bool {
        self.inner.playing.load(Ordering::SeqCst)
    }
}

/// Observer that records every delivered event
pub(crate) struct RecordingObserver {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingObserver {
    pub(crate) fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }

    /// Poll until the recorded events satisfy `pred` or the timeout runs out
    pub(crate) fn wait_for<F>(&self, pred: F, timeout: Duration) -> bool
    where
        F: Fn(&[SessionEvent]) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if pred(&self.events.lock()) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl SessionObserver for RecordingObserver {
    fn on_event(&self, event: SessionEvent) {
        self.events.lock().push(event);
    }
}

/// Host that counts the lifecycle signals it receives
pub(crate) struct RecordingHost {
    entered: AtomicU64,
    exited: AtomicU64,
    shutdowns: AtomicU64,
}

impl RecordingHost {
    pub(crate) fn new() -> Self {
        Self {
            entered: AtomicU64::new(0),
            exited: AtomicU64::new(0),
            shutdowns: AtomicU64::new(0),
        }
    }

    pub(crate) fn is_foreground(&self) -> bool {
        self.entered.load(Ordering::SeqCst) > self.exited.load(Ordering::SeqCst)
    }

    pub(crate) fn shutdown_requests(&self) -> u64 {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl HostEnvironment for RecordingHost {
    fn enter_foreground(&self) {
        self.entered.fetch_add(1, Ordering::SeqCst);
    }

    fn exit_foreground(&self) {
        self.exited.fetch_add(1, Ordering::SeqCst);
    }

    fn request_shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

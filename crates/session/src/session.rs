// Playback session state machine
//
// Serializes all control operations, drives the renderer through the
// capability seam, applies its lifecycle events, and runs the progress
// reporter while playing. Playback state, track reference, start offset,
// generation and the observer binding share one lock; the renderer and
// the reporter handle sit behind their own. The renderer lock may be
// held while briefly taking the state lock, never the reverse, and no
// lock is held across an observer callback or a thread join.

use crate::config::SessionConfig;
use crate::host::{DetachedHost, HostEnvironment};
use crate::reporter::ProgressReporter;
use bookshelf_core::{
    Millis, PlaybackError, PlaybackState, Result, Seconds, SessionEvent, SessionObserver, TrackRef,
};
use bookshelf_renderer_api::{AudioRenderer, RendererEvent, RendererListener, RequestId};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::thread;

/// Shared playback state guarded by a single lock
///
/// The observer binding is a weak back-reference: the observer's
/// lifecycle belongs to whichever UI component holds it, never to the
/// session.
pub(crate) struct SessionState {
    pub(crate) playback: PlaybackState,
    pub(crate) track: Option<TrackRef>,
    pub(crate) start_offset: Seconds,
    pub(crate) generation: RequestId,
    pub(crate) observer: Option<Weak<dyn SessionObserver>>,
}

/// Synchronous snapshot of the session
///
/// Progress events are never replayed to a newly bound observer; it
/// pulls this instead.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub state: PlaybackState,
    /// Stays defined after stop and completion
    pub track: Option<TrackRef>,
    /// Last renderer position, when a stream is prepared
    pub position: Option<Seconds>,
}

struct SessionShared {
    state: Arc<Mutex<SessionState>>,
    renderer: Arc<Mutex<Box<dyn AudioRenderer>>>,
    reporter: Mutex<Option<ProgressReporter>>,
    host: Arc<dyn HostEnvironment>,
    config: SessionConfig,
}

/// The single logical owner of "what is currently playing"
///
/// Cheap to clone; every handle drives the same session. The UI binds
/// and unbinds an observer for progress events while any handle issues
/// transport calls, independent of each other.
#[derive(Clone)]
pub struct PlaybackSession {
    shared: Arc<SessionShared>,
}

impl PlaybackSession {
    pub fn new(
        renderer: Box<dyn AudioRenderer>,
        host: Arc<dyn HostEnvironment>,
        config: SessionConfig,
    ) -> Self {
        let shared = Arc::new(SessionShared {
            state: Arc::new(Mutex::new(SessionState {
                playback: PlaybackState::Stopped,
                track: None,
                start_offset: Seconds::ZERO,
                generation: 0,
                observer: None,
            })),
            renderer: Arc::new(Mutex::new(renderer)),
            reporter: Mutex::new(None),
            host,
            config,
        });

        let listener = Arc::new(SessionListener {
            shared: Arc::downgrade(&shared),
        });
        shared.renderer.lock().set_listener(Some(listener));

        Self { shared }
    }

    /// Session with a detached host and default tuning
    pub fn with_defaults(renderer: Box<dyn AudioRenderer>) -> Self {
        Self::new(renderer, Arc::new(DetachedHost), SessionConfig::default())
    }

    /// Begin playback of a track, optionally resuming from an offset
    ///
    /// Always permitted; any current playback is torn down first. The
    /// offset is recorded now and applied once, after the renderer
    /// signals prepared. Returns as soon as preparation has been issued;
    /// the transition to Playing happens on the prepared event.
    pub fn play(&self, track: TrackRef, start_offset: Seconds) -> Result<()> {
        log::info!("play {} from {}", track, start_offset);

        let (generation, locator) = {
            let mut state = self.shared.state.lock();
            state.generation += 1;
            // Preparing: the renderer is not ready yet
            state.playback = PlaybackState::Stopped;
            state.track = Some(track.clone());
            state.start_offset = start_offset;
            (
                state.generation,
                track.to_locator(&self.shared.config.stream_base_url),
            )
        };

        // The previous stream's reporter must not outlive its epoch
        self.shared.cancel_reporter();

        let issued = {
            let mut renderer = self.shared.renderer.lock();
            renderer.reset();
            renderer
                .configure(&locator)
                .and_then(|_| renderer.prepare_async(generation))
        };

        if let Err(err) = issued {
            log::error!("failed to prepare {}: {}", track, err);
            self.shared.fail(generation, err.to_string());
            return Err(err);
        }

        self.shared.host.enter_foreground();
        Ok(())
    }

    /// Begin playback from the start of a track
    pub fn play_from_start(&self, track: TrackRef) -> Result<()> {
        self.play(track, Seconds::ZERO)
    }

    /// Toggle between Playing and Paused; a no-op when stopped
    ///
    /// Double duty mirrors a single transport button. Callers that need
    /// idempotent behavior use `pause` and `resume` directly.
    pub fn toggle_pause(&self) -> Result<()> {
        let playback = self.shared.state.lock().playback;
        match playback {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused => self.resume(),
            PlaybackState::Stopped => Ok(()),
        }
    }

    /// Suspend playback; a no-op unless currently Playing
    ///
    /// The renderer is paused before this returns, and no progress event
    /// for the suspended stream is delivered afterwards other than the
    /// reporter's single paused signal.
    pub fn pause(&self) -> Result<()> {
        {
            let mut state = self.shared.state.lock();
            if state.playback != PlaybackState::Playing {
                return Ok(());
            }
            state.playback = PlaybackState::Paused;
        }

        let paused = self.shared.renderer.lock().pause();
        self.shared.retire_reporter();
        log::info!("playback paused");
        paused
    }

    /// Resume playback; a no-op unless currently Paused
    pub fn resume(&self) -> Result<()> {
        let (generation, track) = {
            let mut state = self.shared.state.lock();
            if state.playback != PlaybackState::Paused {
                return Ok(());
            }
            state.playback = PlaybackState::Playing;
            (state.generation, state.track.clone())
        };

        let started = self.shared.renderer.lock().start();
        if let Some(track) = track {
            self.shared.spawn_reporter_if_current(generation, track);
        }
        log::info!("playback resumed");
        started
    }

    /// Halt playback from any state and withdraw the session's
    /// foreground presentation
    ///
    /// The track reference stays defined and readable. An in-flight
    /// prepare is invalidated: its event will arrive stale and be
    /// discarded.
    pub fn stop(&self) -> Result<()> {
        let had_track = {
            let mut state = self.shared.state.lock();
            let had_track = state.track.is_some();
            state.generation += 1;
            state.playback = PlaybackState::Stopped;
            state.start_offset = Seconds::ZERO;
            had_track
        };

        self.shared.cancel_reporter();

        if !had_track {
            return Ok(());
        }

        let halted = self.shared.renderer.lock().stop();
        self.shared.host.exit_foreground();
        log::info!("playback stopped");

        match halted {
            // Nothing was rendering; stopping it is not an error
            Err(PlaybackError::InvalidState(_)) | Ok(()) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Jump to a position in the active track
    ///
    /// Ignored while nothing is loaded and for positions past the end of
    /// the track. The bound check is performed in the renderer's native
    /// unit.
    pub fn seek_to(&self, position: Seconds) -> Result<()> {
        if self.shared.state.lock().track.is_none() {
            return Ok(());
        }

        let target = position.to_millis();
        let mut renderer = self.shared.renderer.lock();
        let duration = match renderer.duration() {
            Ok(duration) => duration,
            // Nothing prepared yet; nothing to seek
            Err(_) => return Ok(()),
        };
        if target > duration {
            log::debug!("seek to {} past duration {}, ignored", target, duration);
            return Ok(());
        }

        log::info!("seek to {}", target);
        renderer.seek_to(target)
    }

    /// Ground truth from the renderer, as opposed to session intent
    pub fn is_playing(&self) -> bool {
        self.shared.renderer.lock().is_playing()
    }

    /// Synchronous snapshot for a freshly attached observer
    pub fn status(&self) -> SessionStatus {
        let (state, track) = {
            let guard = self.shared.state.lock();
            (guard.playback, guard.track.clone())
        };
        let position = self
            .shared
            .renderer
            .lock()
            .position()
            .ok()
            .map(Millis::to_whole_seconds);

        SessionStatus {
            state,
            track,
            position,
        }
    }

    /// Attach an observer, replacing any current binding
    ///
    /// The binding is orthogonal to playback state and survives play,
    /// pause and stop. Only a weak reference is kept: dropping the last
    /// strong handle detaches the observer implicitly. No snapshot is
    /// replayed; pull `status` on attach.
    pub fn bind(&self, observer: Arc<dyn SessionObserver>) {
        self.shared.state.lock().observer = Some(Arc::downgrade(&observer));
    }

    /// Detach the current observer; subsequent events are dropped
    pub fn unbind(&self) {
        self.shared.state.lock().observer = None;
    }
}

impl SessionShared {
    fn cancel_reporter(&self) {
        if let Some(reporter) = self.reporter.lock().take() {
            reporter.cancel();
        }
    }

    fn retire_reporter(&self) {
        if let Some(reporter) = self.reporter.lock().take() {
            reporter.retire();
        }
    }

    /// Start a fresh reporter unless the request has been superseded
    fn spawn_reporter_if_current(&self, request: RequestId, track: TrackRef) {
        let mut slot = self.reporter.lock();
        if self.state.lock().generation != request {
            log::debug!("reporter for superseded request {} not started", request);
            return;
        }
        if let Some(previous) = slot.take() {
            previous.cancel();
        }
        *slot = Some(ProgressReporter::spawn(
            track,
            self.config.tick,
            self.state.clone(),
            self.renderer.clone(),
        ));
    }

    fn emit(&self, event: SessionEvent) {
        let observer = self.state.lock().observer.clone();
        if let Some(observer) = observer.and_then(|observer| observer.upgrade()) {
            observer.on_event(event);
        }
    }

    /// The renderer finished preparing a stream
    fn on_prepared(&self, request: RequestId) {
        let (track, offset) = {
            let mut state = self.state.lock();
            if state.generation != request {
                log::debug!(
                    "stale prepare for request {} ignored (current {})",
                    request,
                    state.generation
                );
                return;
            }
            let track = match state.track.clone() {
                Some(track) => track,
                None => return,
            };
            state.playback = PlaybackState::Playing;
            // The offset is consumed exactly once, never reapplied to a
            // later prepare
            let offset = state.start_offset;
            state.start_offset = Seconds::ZERO;
            (track, offset)
        };

        log::info!("{} prepared, starting playback", track);

        {
            let mut renderer = self.renderer.lock();
            // A newer play may have taken over since the state lock above
            // was released
            if self.state.lock().generation != request {
                return;
            }
            if let Err(err) = renderer.start() {
                drop(renderer);
                log::error!("failed to start {}: {}", track, err);
                self.fail(request, err.to_string());
                return;
            }
        }

        if !offset.is_zero() {
            self.schedule_start_offset_seek(request, offset);
        }

        self.spawn_reporter_if_current(request, track);
    }

    /// One-shot delayed seek applying a recorded start offset once the
    /// started stream has settled
    fn schedule_start_offset_seek(&self, request: RequestId, offset: Seconds) {
        let state = self.state.clone();
        let renderer = self.renderer.clone();
        let settle = self.config.seek_settle;
        thread::spawn(move || {
            thread::sleep(settle);

            let mut renderer = renderer.lock();
            {
                let state = state.lock();
                if state.generation != request || state.playback != PlaybackState::Playing {
                    log::debug!("start offset for superseded request {} dropped", request);
                    return;
                }
            }
            if let Err(err) = renderer.seek_to(offset.to_millis()) {
                log::warn!("start offset seek failed: {}", err);
            }
        });
    }

    /// The renderer played the current stream to the end
    fn on_completed(&self, request: RequestId) {
        let track = {
            let mut state = self.state.lock();
            if state.generation != request {
                log::debug!("stale completion for request {} ignored", request);
                return;
            }
            state.playback = PlaybackState::Stopped;
            state.track.clone()
        };

        self.cancel_reporter();
        self.renderer.lock().reset();

        if let Some(track) = track {
            log::info!("{} completed", track);
            self.emit(SessionEvent::Completed { track });
        }
        self.host.exit_foreground();
        self.host.request_shutdown();
    }

    /// Return to Stopped after a transport failure and report it once
    fn fail(&self, request: RequestId, message: String) {
        {
            let mut state = self.state.lock();
            if state.generation != request {
                log::debug!("stale failure for request {} ignored", request);
                return;
            }
            state.playback = PlaybackState::Stopped;
            state.start_offset = Seconds::ZERO;
        }

        self.cancel_reporter();
        self.host.exit_foreground();
        self.emit(SessionEvent::Failed { message });
    }
}

impl Drop for SessionShared {
    fn drop(&mut self) {
        if let Some(reporter) = self.reporter.get_mut().take() {
            reporter.cancel();
        }
    }
}

/// Routes renderer lifecycle events back into the session
///
/// Holds a weak back-reference so the renderer keeping its listener
/// alive never keeps the session alive.
struct SessionListener {
    shared: Weak<SessionShared>,
}

impl RendererListener for SessionListener {
    fn on_event(&self, event: RendererEvent) {
        let shared = match self.shared.upgrade() {
            Some(shared) => shared,
            None => return,
        };
        match event {
            RendererEvent::Prepared { request } => shared.on_prepared(request),
            RendererEvent::Completed { request } => shared.on_completed(request),
            RendererEvent::Failed { request, message } => shared.fail(request, message),
        }
    }
}

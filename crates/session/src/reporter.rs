// Progress reporting loop
//
// One background thread per active playback samples the renderer
// position once per tick and forwards it to the bound observer. The
// loop runs exactly while the session is Playing.

use crate::session::SessionState;
use bookshelf_core::{PlaybackError, PlaybackState, ProgressEvent, SessionEvent, TrackRef};
use bookshelf_renderer_api::AudioRenderer;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Cooperative cancellation with an interruptible sleep
///
/// `cancel` ends the loop silently; `wake` only cuts the current sleep
/// short so a state change is observed without waiting out the tick.
pub struct CancelToken {
    cancelled: AtomicBool,
    woken: Mutex<bool>,
    signal: Condvar,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            woken: Mutex::new(false),
            signal: Condvar::new(),
        }
    }

    /// Flag the loop to exit and cut any in-flight sleep short
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let mut woken = self.woken.lock();
        *woken = true;
        self.signal.notify_all();
    }

    /// Cut the current sleep short without ending the loop
    pub fn wake(&self) {
        let mut woken = self.woken.lock();
        *woken = true;
        self.signal.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Sleep for `period` unless cancelled or woken first
    pub fn sleep(&self, period: Duration) {
        let deadline = Instant::now() + period;
        let mut woken = self.woken.lock();
        loop {
            if *woken || self.is_cancelled() {
                break;
            }
            if self.signal.wait_until(&mut woken, deadline).timed_out() {
                break;
            }
        }
        // Consume the wake so the next sleep runs a full period
        *woken = false;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a live reporter thread
///
/// At most one instance exists per session; starting a new one always
/// goes through retiring the previous handle first.
pub(crate) struct ProgressReporter {
    token: Arc<CancelToken>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ProgressReporter {
    /// Spawn the reporting loop for the given track
    pub(crate) fn spawn(
        track: TrackRef,
        tick: Duration,
        state: Arc<Mutex<SessionState>>,
        renderer: Arc<Mutex<Box<dyn AudioRenderer>>>,
    ) -> Self {
        let token = Arc::new(CancelToken::new());
        let loop_token = token.clone();
        let thread = thread::spawn(move || {
            run_loop(track, tick, state, renderer, loop_token);
        });
        Self {
            token,
            thread: Some(thread),
        }
    }

    /// End the loop without any further event and wait for it to finish
    pub(crate) fn cancel(mut self) {
        self.token.cancel();
        self.join();
    }

    /// Cut the current sleep short so the loop observes the state it was
    /// retired under (emitting its single paused signal if applicable),
    /// then wait for it to finish
    pub(crate) fn retire(mut self) {
        self.token.wake();
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.token.cancel();
        self.join();
    }
}

fn run_loop(
    track: TrackRef,
    tick: Duration,
    state: Arc<Mutex<SessionState>>,
    renderer: Arc<Mutex<Box<dyn AudioRenderer>>>,
    token: Arc<CancelToken>,
) {
    log::debug!("progress reporter started for {}", track);

    while !token.is_cancelled() {
        token.sleep(tick);
        if token.is_cancelled() {
            break;
        }

        // Snapshot state and observer under the session lock, emit
        // outside it. A binding whose owner is gone counts as absent.
        let (playback, observer) = {
            let guard = state.lock();
            (guard.playback, guard.observer.clone())
        };
        let observer = observer.and_then(|observer| observer.upgrade());

        match playback {
            PlaybackState::Playing => {
                let sampled = renderer.lock().position();
                match sampled {
                    Ok(position) => {
                        if let Some(observer) = observer {
                            observer.on_event(SessionEvent::Progress(ProgressEvent {
                                track: track.clone(),
                                elapsed: position.to_whole_seconds(),
                            }));
                        }
                    }
                    Err(PlaybackError::InvalidState(_)) => {
                        // Renderer torn down under us; nothing left to sample
                        log::debug!("progress reporter for {} lost its stream", track);
                        break;
                    }
                    Err(err) => {
                        log::warn!("progress sample for {} failed, skipping tick: {}", track, err);
                    }
                }
            }
            PlaybackState::Paused => {
                if let Some(observer) = observer {
                    observer.on_event(SessionEvent::Paused);
                }
                break;
            }
            PlaybackState::Stopped => break,
        }
    }

    log::debug!("progress reporter for {} exited", track);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{FakeRenderer, RecordingObserver};
    use bookshelf_core::Millis;

    fn reporter_state(observer: Arc<RecordingObserver>) -> Arc<Mutex<SessionState>> {
        let observer: Arc<dyn bookshelf_core::SessionObserver> = observer;
        Arc::new(Mutex::new(SessionState {
            playback: PlaybackState::Playing,
            track: Some(TrackRef::Catalog(1)),
            start_offset: bookshelf_core::Seconds::ZERO,
            generation: 1,
            observer: Some(Arc::downgrade(&observer)),
        }))
    }

    fn boxed(renderer: &FakeRenderer) -> Arc<Mutex<Box<dyn AudioRenderer>>> {
        Arc::new(Mutex::new(Box::new(renderer.clone()) as Box<dyn AudioRenderer>))
    }

    #[test]
    fn test_cancel_interrupts_sleep() {
        let token = Arc::new(CancelToken::new());
        let sleeper = token.clone();
        let started = Instant::now();
        let handle = thread::spawn(move || {
            sleeper.sleep(Duration::from_secs(10));
        });

        thread::sleep(Duration::from_millis(20));
        token.cancel();
        handle.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_wake_interrupts_sleep_without_cancelling() {
        let token = Arc::new(CancelToken::new());
        let sleeper = token.clone();
        let started = Instant::now();
        let handle = thread::spawn(move || {
            sleeper.sleep(Duration::from_secs(10));
        });

        thread::sleep(Duration::from_millis(20));
        token.wake();
        handle.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_sleep_runs_out_the_period_when_undisturbed() {
        let token = CancelToken::new();
        let started = Instant::now();
        token.sleep(Duration::from_millis(50));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_reporter_emits_progress_each_tick() {
        let renderer = FakeRenderer::new();
        renderer.make_prepared();
        renderer.begin_playback();
        let observer = Arc::new(RecordingObserver::new());
        let state = reporter_state(observer.clone());

        let reporter = ProgressReporter::spawn(
            TrackRef::Catalog(1),
            Duration::from_millis(20),
            state,
            boxed(&renderer),
        );

        assert!(observer.wait_for(|events| events.len() >= 3, Duration::from_secs(2)));
        reporter.cancel();

        for event in observer.events() {
            match event {
                SessionEvent::Progress(progress) => {
                    assert_eq!(progress.track, TrackRef::Catalog(1));
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[test]
    fn test_reporter_skips_tick_on_transient_sample_error() {
        let renderer = FakeRenderer::new();
        renderer.make_prepared();
        renderer.begin_playback();
        renderer.set_position_failing(true);
        let observer = Arc::new(RecordingObserver::new());
        let state = reporter_state(observer.clone());

        let reporter = ProgressReporter::spawn(
            TrackRef::Catalog(1),
            Duration::from_millis(20),
            state,
            boxed(&renderer),
        );

        // Several failing ticks pass without events or loop exit
        thread::sleep(Duration::from_millis(100));
        assert!(observer.events().is_empty());

        renderer.set_position_failing(false);
        assert!(observer.wait_for(|events| !events.is_empty(), Duration::from_secs(2)));
        reporter.cancel();
    }

    #[test]
    fn test_reporter_exits_when_renderer_is_torn_down() {
        let renderer = FakeRenderer::new();
        // Never prepared: position() reports InvalidState
        let observer = Arc::new(RecordingObserver::new());
        let state = reporter_state(observer.clone());

        let reporter = ProgressReporter::spawn(
            TrackRef::Catalog(1),
            Duration::from_millis(20),
            state,
            boxed(&renderer),
        );

        thread::sleep(Duration::from_millis(100));
        assert!(observer.events().is_empty());
        // The loop is already gone; cancel only reaps the thread
        reporter.cancel();
    }

    #[test]
    fn test_reporter_signs_off_with_one_paused_event() {
        let renderer = FakeRenderer::new();
        renderer.make_prepared();
        renderer.begin_playback();
        let observer = Arc::new(RecordingObserver::new());
        let state = reporter_state(observer.clone());

        let reporter = ProgressReporter::spawn(
            TrackRef::Catalog(1),
            Duration::from_millis(20),
            state.clone(),
            boxed(&renderer),
        );

        assert!(observer.wait_for(|events| !events.is_empty(), Duration::from_secs(2)));
        state.lock().playback = PlaybackState::Paused;
        reporter.retire();

        let events = observer.events();
        let paused = events
            .iter()
            .filter(|event| matches!(event, SessionEvent::Paused))
            .count();
        assert_eq!(paused, 1);
        assert!(matches!(events.last(), Some(SessionEvent::Paused)));
    }

    #[test]
    fn test_position_is_reported_in_whole_seconds() {
        let renderer = FakeRenderer::new();
        renderer.make_prepared();
        renderer.seek_base(Millis(63_400));
        renderer.begin_playback();
        let observer = Arc::new(RecordingObserver::new());
        let state = reporter_state(observer.clone());

        let reporter = ProgressReporter::spawn(
            TrackRef::Catalog(1),
            Duration::from_millis(20),
            state,
            boxed(&renderer),
        );

        assert!(observer.wait_for(|events| !events.is_empty(), Duration::from_secs(2)));
        reporter.cancel();

        match observer.events().first() {
            Some(SessionEvent::Progress(progress)) => {
                assert_eq!(progress.elapsed.get(), 63);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}

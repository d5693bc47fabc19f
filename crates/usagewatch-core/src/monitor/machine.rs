//! The polling state machine: capture loop, countdown loop, and the
//! start / refresh / stop lifecycle around them.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::state::{CaptureOutcome, MonitorState};
use super::MSG_STARTING;
use crate::config::MonitorSettings;
use crate::error::MonitorError;
use crate::tmux::ScreenSource;
use crate::usage::{UsageState, UsageView};

/// Receiver for published [`UsageView`] snapshots
pub type UsageViewReceiver = watch::Receiver<UsageView>;

/// One generation of the two periodic tasks
struct LoopSet {
    cancel: CancellationToken,
    capture: JoinHandle<()>,
    countdown: JoinHandle<()>,
}

impl LoopSet {
    /// Cancel both loops and wait until they have returned
    async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.capture.await {
            warn!("Capture loop ended abnormally: {}", e);
        }
        if let Err(e) = self.countdown.await {
            warn!("Countdown loop ended abnormally: {}", e);
        }
    }
}

struct Inner<S: ScreenSource> {
    source: Arc<S>,
    settings: MonitorSettings,
    /// Single owner of all mutable monitor state
    state: Mutex<MonitorState>,
    view_tx: watch::Sender<UsageView>,
    /// Running loops; held across the whole restart sequence
    loops: tokio::sync::Mutex<Option<LoopSet>>,
    /// Token of the current loop generation
    current: Mutex<CancellationToken>,
    /// Parent of every generation token; cancelled by `stop()`
    shutdown: CancellationToken,
    generation: AtomicU64,
}

/// Watches the usage screen of a [`ScreenSource`] and publishes [`UsageView`]s.
///
/// Cloning is cheap; all clones drive the same monitor.
pub struct UsageMonitor<S: ScreenSource> {
    inner: Arc<Inner<S>>,
}

impl<S: ScreenSource> Clone for UsageMonitor<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ScreenSource> UsageMonitor<S> {
    /// Create an idle monitor in `Loading("Starting…")`
    pub fn new(source: Arc<S>, settings: MonitorSettings) -> Self {
        let state = MonitorState::new();
        let (view_tx, _) = watch::channel(state.view());
        let shutdown = CancellationToken::new();

        Self {
            inner: Arc::new(Inner {
                source,
                settings,
                state: Mutex::new(state),
                view_tx,
                loops: tokio::sync::Mutex::new(None),
                current: Mutex::new(shutdown.child_token()),
                shutdown,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> UsageViewReceiver {
        self.inner.view_tx.subscribe()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> UsageView {
        self.inner.view_tx.borrow().clone()
    }

    /// Number of loop generations spawned so far
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Start the capture and countdown loops.
    ///
    /// An unavailable screen source puts the monitor into `Error` and is not
    /// retried.
    pub async fn start(&self) -> Result<(), MonitorError> {
        if self.inner.shutdown.is_cancelled() {
            return Err(MonitorError::Stopped);
        }

        if let Err(e) = self.inner.source.check_available() {
            error!("Screen source unavailable: {}", e);
            self.inner
                .update(|state| state.set_state(UsageState::Error(e.to_string())));
            return Err(e);
        }

        let mut loops = self.inner.loops.lock().await;
        if loops.is_some() {
            return Err(MonitorError::AlreadyStarted);
        }
        *loops = Some(self.inner.spawn_loops());
        Ok(())
    }

    /// Kill the session and restart both loops from scratch.
    ///
    /// Returns `None` without doing anything while a previous refresh is
    /// still in progress (or after `stop()`). The returned handle completes
    /// once the new loops are running.
    pub fn refresh(&self) -> Option<JoinHandle<()>> {
        if self.inner.shutdown.is_cancelled() {
            return None;
        }

        {
            let mut state = self.inner.state.lock();
            if state.is_refreshing() {
                debug!("Refresh already in progress");
                return None;
            }
            state.set_refreshing(true);
            // Cancelled under the state lock so the old generation cannot
            // publish anything after the reset below.
            self.inner.current.lock().cancel();
            state.reset_for_refresh();
            self.inner.view_tx.send_replace(state.view());
        }

        info!("Refresh requested, restarting session");
        let inner = Arc::clone(&self.inner);
        Some(tokio::spawn(async move { inner.restart().await }))
    }

    /// Cancel both loops and kill the session in the background.
    ///
    /// Does not wait for the loops. The returned handle (if a runtime is
    /// available) completes when the session has been terminated.
    pub fn stop(&self) -> Option<JoinHandle<()>> {
        info!("Stopping usage monitor");
        self.inner.shutdown.cancel();

        let source = Arc::clone(&self.inner.source);
        tokio::runtime::Handle::try_current()
            .ok()
            .map(|handle| handle.spawn(async move { source.terminate_session().await }))
    }
}

impl<S: ScreenSource> Inner<S> {
    /// Mutate state and publish the result as one step
    fn update(&self, f: impl FnOnce(&mut MonitorState)) {
        let mut state = self.state.lock();
        f(&mut state);
        self.view_tx.send_replace(state.view());
    }

    /// Like [`update`](Self::update), but a no-op once `cancel` fired
    fn update_live(
        &self,
        cancel: &CancellationToken,
        f: impl FnOnce(&mut MonitorState),
    ) -> bool {
        let mut state = self.state.lock();
        if cancel.is_cancelled() {
            return false;
        }
        f(&mut state);
        self.view_tx.send_if_modified(|view| {
            let next = state.view();
            if *view == next {
                false
            } else {
                *view = next;
                true
            }
        });
        true
    }

    fn spawn_loops(self: &Arc<Self>) -> LoopSet {
        let cancel = self.shutdown.child_token();
        *self.current.lock() = cancel.clone();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Starting monitor loops (generation {})", generation);

        LoopSet {
            capture: tokio::spawn(Arc::clone(self).capture_loop(cancel.clone())),
            countdown: tokio::spawn(Arc::clone(self).countdown_loop(cancel.clone())),
            cancel,
        }
    }

    /// Stop the running generation, kill the session, start a new generation
    async fn restart(self: Arc<Self>) {
        let mut loops = self.loops.lock().await;
        if let Some(set) = loops.take() {
            set.shutdown().await;
        }
        debug!("Previous loops stopped");

        self.source.terminate_session().await;
        tokio::time::sleep(self.settings.restart_delay()).await;

        if self.shutdown.is_cancelled() {
            debug!("Monitor stopped during refresh");
            return;
        }
        *loops = Some(self.spawn_loops());
    }

    async fn capture_loop(self: Arc<Self>, cancel: CancellationToken) {
        if !self.source.session_exists().await {
            if !self.update_live(&cancel, |state| {
                state.set_state(UsageState::Loading(MSG_STARTING.to_string()))
            }) {
                return;
            }
            info!("Usage session missing, creating it");
            if cancellable(&cancel, self.source.create_session()).await.is_none() {
                return;
            }
        }

        self.refresh_and_capture(&cancel).await;
        self.update_live(&cancel, |state| state.set_refreshing(false));

        let interval = self.settings.poll_interval();
        loop {
            if cancellable(&cancel, tokio::time::sleep(interval)).await.is_none() {
                break;
            }
            self.refresh_and_capture(&cancel).await;
        }
        debug!("Capture loop stopped");
    }

    /// Redraw, settle, capture, classify
    async fn refresh_and_capture(&self, cancel: &CancellationToken) {
        if cancellable(cancel, self.source.send_refresh_keystrokes())
            .await
            .is_none()
        {
            return;
        }
        let delay = self.settings.refresh_delay();
        if cancellable(cancel, tokio::time::sleep(delay)).await.is_none() {
            return;
        }

        let lines = self.source.capture_lines().await;
        let timeout = self.settings.loading_timeout();
        self.update_live(cancel, |state| {
            let before = state.state().name();
            let outcome = state.apply_capture(&lines, Instant::now(), Utc::now(), timeout);
            match outcome {
                CaptureOutcome::Parsed => debug!("Usage screen parsed"),
                CaptureOutcome::LoginScreen => debug!("Login screen detected"),
                CaptureOutcome::Ignored => {
                    debug!("Capture did not parse, keeping cached data ({} lines)", lines.len());
                }
                CaptureOutcome::Waiting => debug!("Waiting for usage data"),
                CaptureOutcome::TimedOut => debug!("No usage data within loading timeout"),
            }
            let after = state.state().name();
            if before != after {
                info!("Usage state: {} -> {}", before, after);
            }
        });
    }

    async fn countdown_loop(self: Arc<Self>, cancel: CancellationToken) {
        let interval = self.settings.countdown_interval();
        loop {
            if cancellable(&cancel, tokio::time::sleep(interval)).await.is_none() {
                break;
            }
            if !self.update_live(&cancel, |state| state.tick(Instant::now(), Utc::now())) {
                break;
            }
        }
        debug!("Countdown loop stopped");
    }
}

/// Run `fut` unless `cancel` fires first
async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}

use super::config::SessionConfig;
use super::devices::DeviceFactory;
use super::state::{SessionState, Shared};
use super::stats::{SessionEvent, SessionOutcome, SessionStats};
use super::worker::CaptureWorker;
use crate::error::{RecorderError, RecorderResult};
use crate::video::{NullPreview, PreviewSurface};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::{broadcast, oneshot};
use tracing::{error, info, warn};
use uuid::Uuid;

/// A recording session: one capture pipeline driven by a controller
///
/// The session owns all recording, mute and configuration state. Capture
/// runs on a dedicated worker thread; the audio device delivers blocks on its
/// own thread. Commands are async so a controller's runtime never blocks on
/// device setup or finalization.
///
/// Dropping a session that is still capturing stops it and joins the worker
/// on the dropping thread. Inside an async runtime, call [`stop`] first.
///
/// [`stop`]: RecordingSession::stop
pub struct RecordingSession {
    /// Configuration used by the next `start`
    config: Mutex<SessionConfig>,

    /// Set under the config lock while `start` opens devices
    starting: AtomicBool,

    /// Opens devices for each session
    factory: Arc<dyn DeviceFactory>,

    /// Receives every written frame
    preview: Arc<dyn PreviewSurface>,

    shared: Arc<Shared>,

    /// Handle for the capture worker; the lock also serializes start/stop
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl RecordingSession {
    /// Create an idle session
    pub fn new(config: SessionConfig, factory: Arc<dyn DeviceFactory>) -> Self {
        info!("Creating recording session (devices: {})", factory.name());
        Self {
            shared: Arc::new(Shared::new(config.mic_enabled)),
            config: Mutex::new(config),
            starting: AtomicBool::new(false),
            factory,
            preview: Arc::new(NullPreview),
            worker: tokio::sync::Mutex::new(None),
        }
    }

    pub fn with_preview(mut self, preview: Arc<dyn PreviewSurface>) -> Self {
        self.preview = preview;
        self
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Configuration the next (or current) session uses
    pub fn config(&self) -> SessionConfig {
        self.config.lock().clone()
    }

    pub fn mic_enabled(&self) -> bool {
        self.shared.mic_enabled.load(Ordering::SeqCst)
    }

    /// Replace the configuration. Only allowed while Idle and not starting.
    pub fn configure(&self, config: SessionConfig) -> RecorderResult<()> {
        let mut current = self.config.lock();

        let state = self.state();
        if state != SessionState::Idle || self.starting.load(Ordering::SeqCst) {
            let state = if state == SessionState::Idle {
                "starting".to_string()
            } else {
                state.to_string()
            };
            warn!("Rejected configure while {}", state);
            return Err(RecorderError::InvalidState {
                operation: "configure".to_string(),
                state,
            });
        }

        config.validate()?;
        self.shared.mic_enabled.store(config.mic_enabled, Ordering::SeqCst);
        *current = config;
        info!("Session configuration updated");
        Ok(())
    }

    /// Mute or unmute the microphone. Takes effect on the next audio block.
    ///
    /// The switch is persistent: it is written to the stored configuration
    /// so the next session started from [`config`] keeps it.
    ///
    /// [`config`]: RecordingSession::config
    pub fn set_mic_enabled(&self, enabled: bool) {
        let mut current = self.config.lock();
        self.shared.mic_enabled.store(enabled, Ordering::SeqCst);
        current.mic_enabled = enabled;
        info!("Microphone {}", if enabled { "enabled" } else { "muted" });
    }

    /// Start recording with `config`
    ///
    /// Returns once every device is open and the session is Capturing. If
    /// any device fails to open the session stays Idle.
    pub async fn start(&self, config: SessionConfig) -> RecorderResult<Uuid> {
        let mut worker = self.worker.lock().await;

        let state = self.state();
        if state != SessionState::Idle {
            return Err(RecorderError::InvalidState {
                operation: "start".to_string(),
                state: state.to_string(),
            });
        }

        // Reap the previous session's thread
        if let Some(handle) = worker.take() {
            Self::join(handle).await;
        }

        config.validate()?;
        let _starting = {
            let mut current = self.config.lock();
            self.shared.mic_enabled.store(config.mic_enabled, Ordering::SeqCst);
            *current = config.clone();
            StartingGuard::set(&self.starting)
        };

        let session_id = Uuid::new_v4();
        info!("Starting recording session: {}", session_id);

        let capture = CaptureWorker {
            session_id,
            config,
            factory: Arc::clone(&self.factory),
            preview: Arc::clone(&self.preview),
            shared: Arc::clone(&self.shared),
        };

        let (ready_tx, ready_rx) = oneshot::channel();
        let handle = std::thread::Builder::new()
            .name("capture-worker".to_string())
            .spawn(move || capture.run(ready_tx))?;

        // The worker is Capturing before it reports ready, so the session
        // never looks Idle between here and the guard clearing
        match ready_rx.await {
            Ok(Ok(())) => {
                *worker = Some(handle);
                info!("Recording session started successfully");
                Ok(session_id)
            }
            Ok(Err(e)) => {
                Self::join(handle).await;
                Err(e)
            }
            Err(_) => {
                Self::join(handle).await;
                Err(RecorderError::device(
                    "capture worker",
                    "worker exited during start",
                ))
            }
        }
    }

    /// Request a stop and wait for finalization
    ///
    /// On an Idle session this is a no-op and returns `None`.
    pub async fn stop(&self) -> Option<SessionOutcome> {
        let mut worker = self.worker.lock().await;

        let Some(handle) = worker.take() else {
            return None;
        };

        // The worker publishes its outcome and goes Idle as its last step
        let ended = self.state() == SessionState::Idle;
        if !ended {
            info!("Stopping recording session");
            self.shared.stop_requested.store(true, Ordering::SeqCst);
        }

        Self::join(handle).await;

        if ended {
            // Ended on its own before the request; nothing was stopped
            return None;
        }
        self.last_outcome()
    }

    /// Wait for the current session to end without requesting a stop
    ///
    /// Returns immediately with the last outcome when nothing is running.
    pub async fn wait(&self) -> Option<SessionOutcome> {
        let mut events = self.shared.events.subscribe();
        if self.worker.lock().await.is_none() || self.state() == SessionState::Idle {
            return self.last_outcome();
        }

        match events.recv().await {
            Ok(event) => Some(event.outcome),
            Err(_) => self.last_outcome(),
        }
    }

    /// Subscribe to end-of-session notifications
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Outcome of the most recently finished session
    pub fn last_outcome(&self) -> Option<SessionOutcome> {
        self.shared.last_outcome.lock().clone()
    }

    /// Live counters for the current (or last) session
    pub fn stats(&self) -> SessionStats {
        self.shared.stats()
    }

    async fn join(handle: JoinHandle<()>) {
        match tokio::task::spawn_blocking(move || handle.join()).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => error!("Capture worker panicked"),
            Err(e) => error!("Failed to join capture worker: {}", e),
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.shared.stop_requested.store(true, Ordering::SeqCst);
        // Blocks for at most one frame plus finalization
        if let Some(handle) = self.worker.get_mut().take() {
            if handle.join().is_err() {
                error!("Capture worker panicked");
            }
        }
    }
}

/// Marks a session as starting until dropped
struct StartingGuard<'a>(&'a AtomicBool);

impl<'a> StartingGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for StartingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

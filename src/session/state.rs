use super::stats::{SessionEvent, SessionOutcome, SessionStats};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::broadcast;

/// Lifecycle of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    Capturing,
    Finalizing,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Capturing => write!(f, "capturing"),
            SessionState::Finalizing => write!(f, "finalizing"),
        }
    }
}

/// State shared between the session handle, the capture worker and the
/// audio callback.
pub(crate) struct Shared {
    pub state: Mutex<SessionState>,

    /// Mute switch read by the audio callback on every block
    pub mic_enabled: AtomicBool,

    /// Gate for the audio callback; only true while Capturing
    pub capturing: AtomicBool,

    /// Cancellation flag polled once per loop iteration
    pub stop_requested: AtomicBool,

    pub frames_written: AtomicU64,
    pub audio_blocks: AtomicU64,
    pub audio_samples: AtomicU64,

    /// Wall clock and monotonic start of the current (or last) session
    pub started: Mutex<Option<(DateTime<Utc>, Instant)>>,
    pub ended: Mutex<Option<Instant>>,

    pub last_outcome: Mutex<Option<SessionOutcome>>,
    pub events: broadcast::Sender<SessionEvent>,
}

impl Shared {
    pub fn new(mic_enabled: bool) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(SessionState::Idle),
            mic_enabled: AtomicBool::new(mic_enabled),
            capturing: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            frames_written: AtomicU64::new(0),
            audio_blocks: AtomicU64::new(0),
            audio_samples: AtomicU64::new(0),
            started: Mutex::new(None),
            ended: Mutex::new(None),
            last_outcome: Mutex::new(None),
            events,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: SessionState) {
        *self.state.lock() = state;
    }

    /// Zero the counters for a new session
    pub fn reset(&self) {
        self.stop_requested.store(false, Ordering::SeqCst);
        self.frames_written.store(0, Ordering::SeqCst);
        self.audio_blocks.store(0, Ordering::SeqCst);
        self.audio_samples.store(0, Ordering::SeqCst);
        *self.started.lock() = Some((Utc::now(), Instant::now()));
        *self.ended.lock() = None;
    }

    pub fn stats(&self) -> SessionStats {
        let state = self.state();
        let started = *self.started.lock();
        let ended = *self.ended.lock();

        let elapsed = match started {
            Some((_, start)) => ended.unwrap_or_else(Instant::now).duration_since(start),
            None => Default::default(),
        };

        SessionStats {
            state,
            is_recording: state == SessionState::Capturing,
            mic_enabled: self.mic_enabled.load(Ordering::SeqCst),
            started_at: started.map(|(at, _)| at),
            duration_secs: elapsed.as_secs_f64(),
            frames_written: self.frames_written.load(Ordering::SeqCst),
            audio_blocks: self.audio_blocks.load(Ordering::SeqCst),
            audio_samples: self.audio_samples.load(Ordering::SeqCst),
        }
    }
}

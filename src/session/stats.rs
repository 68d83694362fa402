use super::state::SessionState;
use crate::error::ErrorKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

/// Live statistics about the current (or last) recording session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub state: SessionState,

    /// Whether recording is currently active
    pub is_recording: bool,

    pub mic_enabled: bool,

    /// When the recording started
    pub started_at: Option<DateTime<Utc>>,

    /// Elapsed time in seconds (frozen once the session ends)
    pub duration_secs: f64,

    /// Frames accepted by the video sink
    pub frames_written: u64,

    /// Audio blocks accepted into the buffer (muted blocks excluded)
    pub audio_blocks: u64,

    pub audio_samples: u64,
}

/// Why the capture loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The controller asked for a stop
    Requested,
    /// The frame source ran out of frames (webcam disconnected)
    SourceExhausted,
}

/// Identities of the files a finished session produced
#[derive(Debug, Clone, Serialize)]
pub struct RecordingOutput {
    pub session_id: Uuid,
    pub video_path: PathBuf,

    /// `None` when no audio block was captured
    pub audio_path: Option<PathBuf>,

    pub frames_written: u64,
    pub audio_blocks: usize,
    pub audio_samples: usize,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub stop_reason: StopReason,
}

/// Result of one session, reported once at the end
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionOutcome {
    Completed(RecordingOutput),
    Failed {
        session_id: Uuid,
        kind: ErrorKind,
        message: String,
    },
}

impl SessionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SessionOutcome::Completed(_))
    }

    pub fn output(&self) -> Option<&RecordingOutput> {
        match self {
            SessionOutcome::Completed(output) => Some(output),
            SessionOutcome::Failed { .. } => None,
        }
    }
}

/// Notification broadcast to controllers when a session finishes
#[derive(Debug, Clone, Serialize)]
pub struct SessionEvent {
    pub session_id: Uuid,
    pub outcome: SessionOutcome,
}

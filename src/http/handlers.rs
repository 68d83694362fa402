use super::state::AppState;
use crate::error::{ErrorKind, RecorderError};
use crate::session::{SessionConfig, SessionOutcome, SessionOverrides, SessionState, SessionStats};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub state: SessionState,
    pub mic_enabled: bool,
    pub config: SessionConfig,
    pub stats: SessionStats,
    pub last_outcome: Option<SessionOutcome>,
}

#[derive(Debug, Serialize)]
pub struct StartRecordingResponse {
    pub session_id: Uuid,
    pub status: String,
    pub config: SessionConfig,
}

#[derive(Debug, Serialize)]
pub struct StopRecordingResponse {
    pub status: String,
    pub message: String,
    pub outcome: Option<SessionOutcome>,
}

#[derive(Debug, Deserialize)]
pub struct MicRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct MicResponse {
    pub mic_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub frames_rendered: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Base64-encoded PNG of the most recent frame
    pub png: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: Option<ErrorKind>,
}

/// Map a recorder error to a JSON error response
pub fn error_response(err: &RecorderError) -> Response {
    let kind = err.kind();
    let status = match kind {
        ErrorKind::InvalidState => StatusCode::CONFLICT,
        ErrorKind::InvalidConfig => StatusCode::BAD_REQUEST,
        ErrorKind::DeviceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::SourceExhausted | ErrorKind::WriteFailure => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            kind: Some(kind),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /session
/// Current state, configuration and live counters
pub async fn get_session(State(state): State<AppState>) -> impl IntoResponse {
    let session = &state.session;
    Json(SessionStatusResponse {
        state: session.state(),
        mic_enabled: session.mic_enabled(),
        config: session.config(),
        stats: session.stats(),
        last_outcome: session.last_outcome(),
    })
}

/// POST /session/start
/// Start recording; the body may override fields of the stored configuration
pub async fn start_recording(
    State(state): State<AppState>,
    overrides: Option<Json<SessionOverrides>>,
) -> Response {
    let overrides = overrides.map(|Json(o)| o).unwrap_or_default();
    let config = overrides.apply(&state.session.config());

    info!(
        "Starting recording via HTTP: {} {} @ {} fps",
        config.source, config.resolution, config.frame_rate
    );

    match state.session.start(config.clone()).await {
        Ok(session_id) => (
            StatusCode::OK,
            Json(StartRecordingResponse {
                session_id,
                status: "capturing".to_string(),
                config,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to start recording: {}", e);
            error_response(&e)
        }
    }
}

/// POST /session/stop
/// Stop recording and return the outcome; no-op when idle
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    let outcome = state.session.stop().await;

    let (status, message) = match &outcome {
        Some(SessionOutcome::Completed(_)) => ("stopped", "Recording stopped".to_string()),
        Some(SessionOutcome::Failed { message, .. }) => ("failed", message.clone()),
        None => ("idle", "No recording in progress".to_string()),
    };

    Json(StopRecordingResponse {
        status: status.to_string(),
        message,
        outcome,
    })
}

/// POST /session/mic
/// Mute or unmute the microphone
pub async fn set_mic(
    State(state): State<AppState>,
    Json(req): Json<MicRequest>,
) -> impl IntoResponse {
    state.session.set_mic_enabled(req.enabled);
    Json(MicResponse {
        mic_enabled: state.session.mic_enabled(),
    })
}

/// PUT /session/config
/// Replace the stored configuration; rejected while recording
pub async fn put_config(
    State(state): State<AppState>,
    Json(config): Json<SessionConfig>,
) -> Response {
    match state.session.configure(config) {
        Ok(()) => (StatusCode::OK, Json(state.session.config())).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /preview
/// Most recent preview frame as base64 PNG
pub async fn get_preview(State(state): State<AppState>) -> Response {
    let frame = state.preview.latest();
    match state.preview.png_base64() {
        Ok(png) => Json(PreviewResponse {
            frames_rendered: state.preview.rendered(),
            width: frame.as_ref().map(|f| f.width),
            height: frame.as_ref().map(|f| f.height),
            png,
        })
        .into_response(),
        Err(e) => {
            error!("Failed to encode preview: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to encode preview: {}", e),
                    kind: None,
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

//! HTTP API server for external control
//!
//! This module provides a REST API for controlling the recording session:
//! - GET /session - State, configuration, live stats and last outcome
//! - POST /session/start - Start recording (optional config overrides)
//! - POST /session/stop - Stop recording and return the outcome
//! - POST /session/mic - Mute or unmute the microphone
//! - PUT /session/config - Replace the configuration (idle only)
//! - GET /preview - Latest preview frame as base64 PNG
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::error_response;
pub use routes::create_router;
pub use state::AppState;

use crate::session::RecordingSession;
use crate::video::LatestFramePreview;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The one recording pipeline this server controls
    pub session: Arc<RecordingSession>,

    /// Preview surface the session renders into
    pub preview: Arc<LatestFramePreview>,
}

impl AppState {
    /// Wrap `session`, which must already render into `preview`
    pub fn new(session: Arc<RecordingSession>, preview: Arc<LatestFramePreview>) -> Self {
        Self { session, preview }
    }
}

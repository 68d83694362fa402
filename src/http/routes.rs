use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session queries
        .route("/session", get(handlers::get_session))
        .route("/preview", get(handlers::get_preview))
        // Recording control
        .route("/session/start", post(handlers::start_recording))
        .route("/session/stop", post(handlers::stop_recording))
        .route("/session/mic", post(handlers::set_mic))
        .route("/session/config", put(handlers::put_config))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

//! REST API for the playback engine
//!
//! Command-surface processes (the bot's command handlers) drive every public
//! engine operation through these routes, and the transport sidecar delivers
//! its asynchronous callbacks here as well.

pub mod handlers;
pub mod sse;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::Error;
use crate::playback::engine::PlaybackEngine;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Playback engine
    pub engine: Arc<PlaybackEngine>,
    /// Server port
    pub port: u16,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .nest(
            "/api/v1",
            Router::new()
                // Playback control
                .route("/chats/:chat_id/play", post(handlers::play))
                .route("/chats/:chat_id/pause", post(handlers::pause))
                .route("/chats/:chat_id/resume", post(handlers::resume))
                .route("/chats/:chat_id/skip", post(handlers::skip))
                .route("/chats/:chat_id/stop", post(handlers::stop))
                .route("/chats/:chat_id/leave", post(handlers::leave))
                .route("/chats/:chat_id/speed", post(handlers::set_speed))
                .route("/chats/:chat_id/seek", post(handlers::seek))
                .route("/chats/:chat_id/loop", post(handlers::set_loop))
                // State and queue
                .route("/chats/:chat_id", get(handlers::chat_info))
                .route("/chats/:chat_id/queue", get(handlers::get_queue).post(handlers::enqueue))
                .route("/chats/:chat_id/queue/shuffle", post(handlers::shuffle_queue))
                .route("/chats/:chat_id/queue/clear", post(handlers::clear_queue))
                .route("/queue/total", get(handlers::total_queued))
                // SSE events
                .route("/events", get(sse::event_stream))
                // Transport callbacks
                .route("/transport/stream-end/:chat_id", post(handlers::stream_end))
                .route(
                    "/transport/session-closed/:chat_id",
                    post(handlers::session_closed),
                ),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::InvalidOperation(_) => StatusCode::CONFLICT,
            Error::Transport(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

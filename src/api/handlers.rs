//! HTTP request handlers
//!
//! Thin glue between the REST surface and the playback engine; all playback
//! semantics live in the engine itself.

use crate::api::AppState;
use crate::error::Error;
use crate::playback::types::{ChatInfo, LoopMode, QueueItem};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    port: u16,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

impl StatusResponse {
    fn ok() -> Json<Self> {
        Json(Self {
            status: "ok".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    #[serde(flatten)]
    pub item: QueueItem,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub struct SpeedRequest {
    pub speed: f64,
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    pub seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct LoopRequest {
    pub mode: LoopMode,
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub queue_len: usize,
    pub queue: Vec<QueueItem>,
}

#[derive(Debug, Serialize)]
pub struct TotalQueueResponse {
    pub total: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "vcplay".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        port: state.port,
    })
}

/// POST /api/v1/chats/:chat_id/play
pub async fn play(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(req): Json<PlayRequest>,
) -> Result<Json<StatusResponse>, Error> {
    info!(chat_id, title = %req.item.title, force = req.force, "play requested");
    state.engine.play(chat_id, req.item, req.force).await?;
    Ok(StatusResponse::ok())
}

/// POST /api/v1/chats/:chat_id/pause
pub async fn pause(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> Result<Json<StatusResponse>, Error> {
    state.engine.pause(chat_id).await?;
    Ok(StatusResponse::ok())
}

/// POST /api/v1/chats/:chat_id/resume
pub async fn resume(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> Result<Json<StatusResponse>, Error> {
    state.engine.resume(chat_id).await?;
    Ok(StatusResponse::ok())
}

/// POST /api/v1/chats/:chat_id/skip
pub async fn skip(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> Result<Json<StatusResponse>, Error> {
    state.engine.skip(chat_id).await?;
    Ok(StatusResponse::ok())
}

/// POST /api/v1/chats/:chat_id/stop
pub async fn stop(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> Result<Json<StatusResponse>, Error> {
    state.engine.stop(chat_id).await?;
    Ok(StatusResponse::ok())
}

/// POST /api/v1/chats/:chat_id/leave
pub async fn leave(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> Result<Json<StatusResponse>, Error> {
    state.engine.leave(chat_id).await?;
    Ok(StatusResponse::ok())
}

/// POST /api/v1/chats/:chat_id/speed
pub async fn set_speed(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(req): Json<SpeedRequest>,
) -> Result<Json<StatusResponse>, Error> {
    state.engine.set_speed(chat_id, req.speed).await?;
    Ok(StatusResponse::ok())
}

/// POST /api/v1/chats/:chat_id/seek
pub async fn seek(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(req): Json<SeekRequest>,
) -> Result<Json<StatusResponse>, Error> {
    state.engine.seek(chat_id, req.seconds).await?;
    Ok(StatusResponse::ok())
}

/// POST /api/v1/chats/:chat_id/loop
pub async fn set_loop(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(req): Json<LoopRequest>,
) -> Result<Json<StatusResponse>, Error> {
    state.engine.set_loop(chat_id, req.mode, req.count).await?;
    Ok(StatusResponse::ok())
}

/// GET /api/v1/chats/:chat_id
pub async fn chat_info(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> Json<ChatInfo> {
    Json(state.engine.chat_info(chat_id).await)
}

/// GET /api/v1/chats/:chat_id/queue
pub async fn get_queue(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> Json<QueueResponse> {
    let queue = state.engine.queue(chat_id).await;
    Json(QueueResponse {
        queue_len: queue.len(),
        queue,
    })
}

/// POST /api/v1/chats/:chat_id/queue
pub async fn enqueue(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    Json(item): Json<QueueItem>,
) -> Result<Json<StatusResponse>, Error> {
    state.engine.add_to_queue(chat_id, item).await?;
    Ok(StatusResponse::ok())
}

/// POST /api/v1/chats/:chat_id/queue/shuffle
pub async fn shuffle_queue(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> Result<Json<StatusResponse>, Error> {
    state.engine.shuffle_queue(chat_id).await?;
    Ok(StatusResponse::ok())
}

/// POST /api/v1/chats/:chat_id/queue/clear
pub async fn clear_queue(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> Result<Json<StatusResponse>, Error> {
    state.engine.clear_queue(chat_id).await?;
    Ok(StatusResponse::ok())
}

/// GET /api/v1/queue/total
pub async fn total_queued(State(state): State<AppState>) -> Json<TotalQueueResponse> {
    Json(TotalQueueResponse {
        total: state.engine.total_queued().await,
    })
}

// ============================================================================
// Transport callbacks
// ============================================================================

/// POST /api/v1/transport/stream-end/:chat_id
pub async fn stream_end(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> Result<Json<StatusResponse>, Error> {
    info!(chat_id, "stream-end callback from transport");
    state.engine.handle_stream_end(chat_id).await?;
    Ok(StatusResponse::ok())
}

/// POST /api/v1/transport/session-closed/:chat_id
pub async fn session_closed(
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> Json<StatusResponse> {
    info!(chat_id, "session-closed callback from transport");
    state.engine.handle_session_closed(chat_id).await;
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

//! Event system for vcplay
//!
//! Playback transitions are broadcast to all interested listeners (the SSE
//! endpoint, command-surface processes) through a lossy `tokio::broadcast`
//! channel: emission never blocks an engine operation, and a listener that
//! falls behind simply misses events.

use crate::playback::types::LoopMode;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Playback lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// A new item started streaming in a chat
    TrackStarted {
        chat_id: i64,
        title: String,
        requested_by: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The current item finished (naturally or via skip)
    TrackEnded {
        chat_id: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The pending queue changed (enqueue, shuffle, clear, advance)
    QueueUpdated {
        chat_id: i64,
        queue_len: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Paused or resumed
    PlaybackStateChanged {
        chat_id: i64,
        paused: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Loop mode changed
    LoopModeChanged {
        chat_id: i64,
        mode: LoopMode,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Voice session released and per-chat state dropped
    ChatReleased {
        chat_id: i64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Event type string for the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayerEvent::TrackStarted { .. } => "TrackStarted",
            PlayerEvent::TrackEnded { .. } => "TrackEnded",
            PlayerEvent::QueueUpdated { .. } => "QueueUpdated",
            PlayerEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            PlayerEvent::LoopModeChanged { .. } => "LoopModeChanged",
            PlayerEvent::ChatReleased { .. } => "ChatReleased",
        }
    }
}

/// Broadcast bus for `PlayerEvent`
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    /// Create a new bus buffering up to `capacity` undelivered events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to the event stream
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Broadcast an event; no receivers is not an error
    pub fn emit(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

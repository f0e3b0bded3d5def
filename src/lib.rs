//! # vcplay
//!
//! Per-chat playback engine for Telegram voice chats.
//!
//! **Purpose:** Track what is streaming in each chat, manage FIFO queues with
//! loop/repeat semantics, coordinate join/leave of the group-call transport,
//! and react to stream-end notifications to decide what plays next.
//!
//! **Architecture:** The engine owns all per-chat state behind per-chat
//! serialization; the group-call media pipeline lives in a transport sidecar
//! reached over HTTP, and command handlers drive the engine through a REST
//! API with an SSE event stream.

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod playback;
pub mod transport;

pub use config::Config;
pub use error::{Error, Result};
pub use events::{EventBus, PlayerEvent};
pub use playback::PlaybackEngine;

//! Per-chat playback: state records, queue semantics, and the engine that
//! coordinates them with the voice transport.

pub mod engine;
pub mod queue;
pub mod types;

pub use engine::PlaybackEngine;
pub use queue::ChatPlaybackState;
pub use types::{ChatInfo, LoopMode, QueueItem, StreamDescriptor, StreamSource};

//! Core playback types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where an item's media comes from: a downloaded local file or a resolved
/// remote URL. Exactly one of the two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "snake_case")]
pub enum StreamSource {
    /// Local file on disk (downloaded media)
    File(PathBuf),
    /// Direct remote stream URL
    Url(String),
}

/// An immutable snapshot of something playable
///
/// `duration` and `requested_by` are pre-formatted display strings owned by
/// whoever resolved the media; the engine never interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub title: String,
    pub duration: String,
    pub requested_by: String,
    pub source: StreamSource,
    #[serde(default)]
    pub is_video: bool,
    /// Seconds into playback; advisory, mutated by seek
    #[serde(default)]
    pub position: u64,
}

impl QueueItem {
    /// Build the transport stream descriptor for this item at the given rate
    pub fn descriptor(&self, speed: f64) -> StreamDescriptor {
        StreamDescriptor {
            source: self.source.clone(),
            is_video: self.is_video,
            speed,
            position: self.position,
        }
    }
}

/// Everything the transport needs to set up a stream pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub source: StreamSource,
    pub is_video: bool,
    /// Advisory playback rate, 1.0 = normal
    pub speed: f64,
    /// Start offset in seconds, for transports that support offset start
    pub position: u64,
}

/// Loop/repeat behavior applied when a stream ends naturally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    #[default]
    Off,
    /// Replay the current item; finite or infinite repeat count
    RepeatCurrent,
    /// Re-enqueue finished items behind the rest of the queue
    RepeatQueue,
}

/// Point-in-time snapshot of a chat's playback state
#[derive(Debug, Clone, Serialize)]
pub struct ChatInfo {
    pub current: Option<QueueItem>,
    pub queue_len: usize,
    pub is_playing: bool,
    pub is_paused: bool,
    pub loop_mode: LoopMode,
    pub speed: f64,
}

impl Default for ChatInfo {
    fn default() -> Self {
        Self {
            current: None,
            queue_len: 0,
            is_playing: false,
            is_paused: false,
            loop_mode: LoopMode::Off,
            speed: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_carries_source_and_rate() {
        let item = QueueItem {
            title: "Test Track".into(),
            duration: "3:45".into(),
            requested_by: "tester".into(),
            source: StreamSource::Url("https://example.com/a.m4a".into()),
            is_video: false,
            position: 30,
        };

        let desc = item.descriptor(1.5);
        assert_eq!(desc.source, item.source);
        assert_eq!(desc.speed, 1.5);
        assert_eq!(desc.position, 30);
        assert!(!desc.is_video);
    }

    #[test]
    fn test_loop_mode_serde_names() {
        assert_eq!(
            serde_json::to_string(&LoopMode::RepeatCurrent).unwrap(),
            "\"repeat_current\""
        );
        let mode: LoopMode = serde_json::from_str("\"repeat_queue\"").unwrap();
        assert_eq!(mode, LoopMode::RepeatQueue);
    }

    #[test]
    fn test_stream_source_tagged_serialization() {
        let src = StreamSource::File(PathBuf::from("/tmp/a.mp3"));
        let json = serde_json::to_string(&src).unwrap();
        assert!(json.contains("\"kind\":\"file\""));
    }
}

//! Test helpers for vcplay integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use vcplay::playback::types::{QueueItem, StreamSource};
use vcplay::playback::PlaybackEngine;
use vcplay::transport::{MockTransport, VoiceTransport};

/// Build an engine over a recording mock transport
pub fn test_engine(idle_grace: Duration) -> (Arc<PlaybackEngine>, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    let engine = PlaybackEngine::new(
        Arc::clone(&transport) as Arc<dyn VoiceTransport>,
        idle_grace,
        0,
    );
    (Arc::new(engine), transport)
}

/// A minimal remote-URL queue item
pub fn item(title: &str) -> QueueItem {
    QueueItem {
        title: title.to_string(),
        duration: "4:20".to_string(),
        requested_by: "integration-test".to_string(),
        source: StreamSource::Url(format!("https://example.com/{title}.m4a")),
        is_video: false,
        position: 0,
    }
}

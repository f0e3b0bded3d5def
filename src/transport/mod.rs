//! Voice transport abstraction
//!
//! The engine never touches the group-call stack directly; it drives an
//! implementation of [`VoiceTransport`]. In production that is
//! [`http::HttpTransport`], a thin proxy to the transport sidecar that owns
//! the actual real-time media pipeline. Tests and local development use
//! [`mock::MockTransport`].
//!
//! Asynchronous transport callbacks (stream ended, voice session closed
//! out-of-band) do not flow through this trait; the sidecar delivers them as
//! HTTP POSTs to the engine's own API (see `api`).

pub mod http;
pub mod mock;

pub use http::HttpTransport;
pub use mock::MockTransport;

use crate::error::Result;
use crate::playback::types::StreamDescriptor;
use async_trait::async_trait;

/// Operations the engine needs from the group-call transport
///
/// Every method is a suspension point; callers must hold no lock other than
/// the per-chat serialization while awaiting these.
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    /// Join the chat's voice session
    async fn join(&self, chat_id: i64) -> Result<()>;

    /// Leave the chat's voice session
    async fn leave(&self, chat_id: i64) -> Result<()>;

    /// Switch the active stream of a joined session
    async fn change_stream(&self, chat_id: i64, descriptor: &StreamDescriptor) -> Result<()>;

    /// Pause the active stream
    async fn pause(&self, chat_id: i64) -> Result<()>;

    /// Resume a paused stream
    async fn resume(&self, chat_id: i64) -> Result<()>;
}

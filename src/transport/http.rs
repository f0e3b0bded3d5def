//! HTTP voice transport
//!
//! Proxies transport verbs to the sidecar process that owns the group-call
//! media pipeline. The sidecar exposes `POST {base}/calls/{verb}` endpoints
//! taking JSON bodies; any connection error or non-2xx response is surfaced
//! as `Error::Transport`.

use crate::error::{Error, Result};
use crate::playback::types::StreamDescriptor;
use crate::transport::VoiceTransport;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Transport client talking to the group-call sidecar over HTTP
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn post(&self, verb: &str, body: serde_json::Value) -> Result<()> {
        let url = format!("{}/calls/{}", self.base_url, verb);
        debug!(url = %url, "transport request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("{verb} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Transport(format!(
                "{verb} rejected by sidecar ({status}): {detail}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VoiceTransport for HttpTransport {
    async fn join(&self, chat_id: i64) -> Result<()> {
        self.post("join", json!({ "chat_id": chat_id })).await
    }

    async fn leave(&self, chat_id: i64) -> Result<()> {
        self.post("leave", json!({ "chat_id": chat_id })).await
    }

    async fn change_stream(&self, chat_id: i64, descriptor: &StreamDescriptor) -> Result<()> {
        self.post(
            "stream",
            json!({ "chat_id": chat_id, "descriptor": descriptor }),
        )
        .await
    }

    async fn pause(&self, chat_id: i64) -> Result<()> {
        self.post("pause", json!({ "chat_id": chat_id })).await
    }

    async fn resume(&self, chat_id: i64) -> Result<()> {
        self.post("resume", json!({ "chat_id": chat_id })).await
    }
}

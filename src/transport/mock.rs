//! Scripted transport for tests and local development
//!
//! Records every call and can be told to fail specific verbs, so tests can
//! exercise the engine's failure-atomicity guarantees without a sidecar.

use crate::error::{Error, Result};
use crate::playback::types::StreamDescriptor;
use crate::transport::VoiceTransport;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// One recorded transport invocation
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    Join(i64),
    Leave(i64),
    ChangeStream(i64, StreamDescriptor),
    Pause(i64),
    Resume(i64),
}

/// In-memory transport that records calls and fails on demand
#[derive(Debug, Default)]
pub struct MockTransport {
    calls: Mutex<Vec<TransportCall>>,
    fail_join: AtomicBool,
    fail_stream: AtomicBool,
    fail_leave: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `join` calls fail
    pub fn fail_join(&self, fail: bool) {
        self.fail_join.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `change_stream` calls fail
    pub fn fail_stream(&self, fail: bool) {
        self.fail_stream.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `leave` calls fail
    pub fn fail_leave(&self, fail: bool) {
        self.fail_leave.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of all recorded calls, in order
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of `change_stream` calls recorded so far
    pub fn stream_changes(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, TransportCall::ChangeStream(..)))
            .count()
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl VoiceTransport for MockTransport {
    async fn join(&self, chat_id: i64) -> Result<()> {
        if self.fail_join.load(Ordering::SeqCst) {
            return Err(Error::Transport("scripted join failure".into()));
        }
        self.record(TransportCall::Join(chat_id));
        Ok(())
    }

    async fn leave(&self, chat_id: i64) -> Result<()> {
        if self.fail_leave.load(Ordering::SeqCst) {
            return Err(Error::Transport("scripted leave failure".into()));
        }
        self.record(TransportCall::Leave(chat_id));
        Ok(())
    }

    async fn change_stream(&self, chat_id: i64, descriptor: &StreamDescriptor) -> Result<()> {
        if self.fail_stream.load(Ordering::SeqCst) {
            return Err(Error::Transport("scripted stream failure".into()));
        }
        self.record(TransportCall::ChangeStream(chat_id, descriptor.clone()));
        Ok(())
    }

    async fn pause(&self, chat_id: i64) -> Result<()> {
        self.record(TransportCall::Pause(chat_id));
        Ok(())
    }

    async fn resume(&self, chat_id: i64) -> Result<()> {
        self.record(TransportCall::Resume(chat_id));
        Ok(())
    }
}

//! Playback engine orchestration
//!
//! Owns all per-chat playback state and coordinates it with the voice
//! transport: starting streams, queueing, loop/repeat advance on stream end,
//! and releasing idle voice sessions after a grace period.
//!
//! # Concurrency contract
//!
//! Operations on different chats run fully concurrently; operations on the
//! same chat are serialized through a per-chat async mutex that is held
//! across transport awaits. The chat-id map itself is guarded by a separate
//! coarse lock held only for lookup/insert/remove, never across an await
//! into the transport. A user command racing a stream-end callback for the
//! same chat therefore observes the other's completed mutation, never an
//! interleaving.

use crate::error::{Error, Result};
use crate::events::{EventBus, PlayerEvent};
use crate::playback::queue::ChatPlaybackState;
use crate::playback::types::{ChatInfo, LoopMode, QueueItem};
use crate::transport::VoiceTransport;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

type ChatSlot = Arc<Mutex<ChatPlaybackState>>;

/// Playback engine - exclusive owner of per-chat playback state
pub struct PlaybackEngine {
    /// Voice transport (group-call sidecar)
    transport: Arc<dyn VoiceTransport>,

    /// Per-chat state, created lazily, removed on stop/leave/reap
    chats: Arc<Mutex<HashMap<i64, ChatSlot>>>,

    /// Event broadcaster
    events: EventBus,

    /// How long an idle joined chat is kept before the reaper releases it
    idle_grace: Duration,

    /// Maximum pending items per chat (0 = unbounded)
    queue_limit: usize,
}

impl PlaybackEngine {
    pub fn new(transport: Arc<dyn VoiceTransport>, idle_grace: Duration, queue_limit: usize) -> Self {
        Self {
            transport,
            chats: Arc::new(Mutex::new(HashMap::new())),
            events: EventBus::default(),
            idle_grace,
            queue_limit,
        }
    }

    /// Event bus carrying playback transitions
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ========================================================================
    // Playback operations
    // ========================================================================

    /// Play an item in a chat
    ///
    /// With `force`, or with nothing currently playing, the item starts
    /// streaming immediately (joining the voice session first if needed).
    /// Otherwise it is appended to the chat's queue. A transport failure
    /// leaves the chat's state exactly as it was before the call.
    pub async fn play(&self, chat_id: i64, item: QueueItem, force: bool) -> Result<()> {
        let mut state = self.lock_chat(chat_id).await;

        if force || state.current.is_none() {
            match self.start_stream(chat_id, &mut state, &item).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    // Never leave an empty record behind for a play that
                    // went nowhere
                    if state.is_pristine() {
                        self.remove_slot(chat_id).await;
                    }
                    Err(e)
                }
            }
        } else {
            if !state.enqueue(item, self.queue_limit) {
                return Err(Error::InvalidOperation(format!(
                    "queue limit of {} reached",
                    self.queue_limit
                )));
            }
            debug!(chat_id, queue_len = state.queue.len(), "item queued");
            self.emit_queue_updated(chat_id, state.queue.len());
            Ok(())
        }
    }

    /// Pause the active stream
    pub async fn pause(&self, chat_id: i64) -> Result<()> {
        let mut state = self
            .lock_existing(chat_id)
            .await
            .ok_or_else(|| Error::InvalidOperation("no voice session joined".into()))?;

        if !state.joined || state.current.is_none() {
            return Err(Error::InvalidOperation("nothing is playing".into()));
        }

        self.transport.pause(chat_id).await?;
        state.paused = true;
        self.events.emit(PlayerEvent::PlaybackStateChanged {
            chat_id,
            paused: true,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Resume a paused stream
    pub async fn resume(&self, chat_id: i64) -> Result<()> {
        let mut state = self
            .lock_existing(chat_id)
            .await
            .ok_or_else(|| Error::InvalidOperation("no voice session joined".into()))?;

        if !state.joined || state.current.is_none() {
            return Err(Error::InvalidOperation("nothing is playing".into()));
        }

        self.transport.resume(chat_id).await?;
        state.paused = false;
        self.events.emit(PlayerEvent::PlaybackStateChanged {
            chat_id,
            paused: false,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Skip past the current item
    ///
    /// Runs the same advance logic as a natural stream end, except that
    /// repeat-current never applies: a manual skip always moves on.
    pub async fn skip(&self, chat_id: i64) -> Result<()> {
        let mut state = self
            .lock_existing(chat_id)
            .await
            .ok_or_else(|| Error::InvalidOperation("no playback state for chat".into()))?;

        if state.current.is_none() {
            return Err(Error::InvalidOperation("nothing to skip".into()));
        }

        info!(chat_id, "skipping current item");
        self.events.emit(PlayerEvent::TrackEnded {
            chat_id,
            timestamp: chrono::Utc::now(),
        });
        self.advance(chat_id, &mut state, false).await
    }

    /// Stop playback: leave the voice session and drop all chat state
    ///
    /// Teardown is unconditional; a failing transport leave is logged but
    /// does not keep the state alive, and stopping a chat with no record
    /// succeeds as a no-op.
    pub async fn stop(&self, chat_id: i64) -> Result<()> {
        let Some(mut state) = self.lock_existing(chat_id).await else {
            debug!(chat_id, "stop for chat with no state, nothing to do");
            return Ok(());
        };

        if state.joined {
            if let Err(e) = self.transport.leave(chat_id).await {
                warn!(chat_id, error = %e, "transport leave failed during stop");
            }
        }
        self.release(chat_id, &mut state).await;
        Ok(())
    }

    /// Leave the voice session
    ///
    /// Unlike [`stop`](Self::stop), a failing transport leave aborts the
    /// operation and keeps the chat state intact.
    pub async fn leave(&self, chat_id: i64) -> Result<()> {
        let mut state = self
            .lock_existing(chat_id)
            .await
            .ok_or_else(|| Error::InvalidOperation("no active session for chat".into()))?;

        self.transport.leave(chat_id).await?;
        self.release(chat_id, &mut state).await;
        Ok(())
    }

    /// Set the advisory playback rate
    ///
    /// If something is playing the stream is restarted at the new rate. The
    /// item's stored position is carried into the new descriptor so a
    /// transport with offset-start support can pick up near where it was.
    pub async fn set_speed(&self, chat_id: i64, speed: f64) -> Result<()> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(Error::InvalidOperation(format!("invalid speed {speed}")));
        }

        let mut state = self
            .lock_existing(chat_id)
            .await
            .ok_or_else(|| Error::InvalidOperation("no playback state for chat".into()))?;

        let old_speed = state.speed;
        state.speed = speed;
        if let Some(current) = state.current.clone() {
            info!(chat_id, speed, "restarting stream at new rate");
            if let Err(e) = self.start_stream(chat_id, &mut state, &current).await {
                // The old stream keeps running; keep advertising its rate
                state.speed = old_speed;
                return Err(e);
            }
        }
        Ok(())
    }

    /// Record a seek position on the current item
    ///
    /// Advisory only: whether the transport can jump within the live stream
    /// is a transport capability. The position is forwarded on the next
    /// stream descriptor regardless.
    pub async fn seek(&self, chat_id: i64, seconds: u64) -> Result<()> {
        let mut state = self
            .lock_existing(chat_id)
            .await
            .ok_or_else(|| Error::InvalidOperation("no playback state for chat".into()))?;

        match state.current.as_mut() {
            Some(current) => {
                current.position = seconds;
                Ok(())
            }
            None => Err(Error::InvalidOperation("no current item to seek".into())),
        }
    }

    // ========================================================================
    // Queue operations
    // ========================================================================

    /// Append an item to a chat's queue without starting playback
    pub async fn add_to_queue(&self, chat_id: i64, item: QueueItem) -> Result<()> {
        let mut state = self.lock_chat(chat_id).await;
        if !state.enqueue(item, self.queue_limit) {
            return Err(Error::InvalidOperation(format!(
                "queue limit of {} reached",
                self.queue_limit
            )));
        }
        self.emit_queue_updated(chat_id, state.queue.len());
        Ok(())
    }

    /// Snapshot of a chat's pending queue
    pub async fn queue(&self, chat_id: i64) -> Vec<QueueItem> {
        match self.lock_existing(chat_id).await {
            Some(state) => state.queue.iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Shuffle a chat's pending queue; fails with fewer than two items
    pub async fn shuffle_queue(&self, chat_id: i64) -> Result<()> {
        let mut state = self
            .lock_existing(chat_id)
            .await
            .ok_or_else(|| Error::InvalidOperation("no playback state for chat".into()))?;

        if !state.shuffle() {
            return Err(Error::InvalidOperation(
                "need at least two queued items to shuffle".into(),
            ));
        }
        self.emit_queue_updated(chat_id, state.queue.len());
        Ok(())
    }

    /// Drop all pending items; a no-op on an empty or unknown chat
    pub async fn clear_queue(&self, chat_id: i64) -> Result<()> {
        if let Some(mut state) = self.lock_existing(chat_id).await {
            state.clear_queue();
            self.emit_queue_updated(chat_id, 0);
        }
        Ok(())
    }

    /// Set the loop mode; `count` > 0 gives a finite repeat-current count,
    /// 0 with repeat-current means repeat indefinitely
    pub async fn set_loop(&self, chat_id: i64, mode: LoopMode, count: u32) -> Result<()> {
        let mut state = self
            .lock_existing(chat_id)
            .await
            .ok_or_else(|| Error::InvalidOperation("no playback state for chat".into()))?;

        state.loop_mode = mode;
        state.loop_remaining = if mode == LoopMode::RepeatCurrent { count } else { 0 };
        info!(chat_id, ?mode, count, "loop mode changed");
        self.events.emit(PlayerEvent::LoopModeChanged {
            chat_id,
            mode,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Currently streaming item, if any
    pub async fn current(&self, chat_id: i64) -> Option<QueueItem> {
        match self.lock_existing(chat_id).await {
            Some(state) => state.current.clone(),
            None => None,
        }
    }

    /// True if an item is streaming and not paused
    pub async fn is_playing(&self, chat_id: i64) -> bool {
        match self.lock_existing(chat_id).await {
            Some(state) => state.current.is_some() && !state.paused,
            None => false,
        }
    }

    /// True if the chat's voice session is active
    pub async fn is_joined(&self, chat_id: i64) -> bool {
        match self.lock_existing(chat_id).await {
            Some(state) => state.joined,
            None => false,
        }
    }

    /// Point-in-time snapshot of a chat's playback state
    pub async fn chat_info(&self, chat_id: i64) -> ChatInfo {
        match self.lock_existing(chat_id).await {
            Some(state) => ChatInfo {
                current: state.current.clone(),
                queue_len: state.queue.len(),
                is_playing: state.current.is_some() && !state.paused,
                is_paused: state.paused,
                loop_mode: state.loop_mode,
                speed: state.speed,
            },
            None => ChatInfo::default(),
        }
    }

    /// Total pending items across every chat
    pub async fn total_queued(&self) -> usize {
        let slots: Vec<ChatSlot> = self.chats.lock().await.values().cloned().collect();
        let mut total = 0;
        for slot in slots {
            total += slot.lock().await.queue.len();
        }
        total
    }

    // ========================================================================
    // Transport callbacks
    // ========================================================================

    /// Natural stream-end notification from the transport
    ///
    /// Spurious notifications for chats with no state are ignored.
    pub async fn handle_stream_end(&self, chat_id: i64) -> Result<()> {
        let Some(mut state) = self.lock_existing(chat_id).await else {
            debug!(chat_id, "stream-end for unknown chat, ignoring");
            return Ok(());
        };

        if state.current.is_some() {
            self.events.emit(PlayerEvent::TrackEnded {
                chat_id,
                timestamp: chrono::Utc::now(),
            });
        }

        if let Err(e) = self.advance(chat_id, &mut state, true).await {
            // A failed advance must not poison the engine; the chat simply
            // ends up with no current item
            error!(chat_id, error = %e, "failed to advance after stream end");
        }
        Ok(())
    }

    /// The voice session was closed out-of-band (someone ended the call)
    pub async fn handle_session_closed(&self, chat_id: i64) {
        if let Some(mut state) = self.lock_existing(chat_id).await {
            info!(chat_id, "voice session closed out-of-band, dropping chat state");
            self.release(chat_id, &mut state).await;
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Join if needed and switch the transport stream to `item`
    ///
    /// On failure the chat's state is rolled back to what it was before the
    /// call: a join performed only for this play is reverted with a
    /// best-effort leave.
    async fn start_stream(
        &self,
        chat_id: i64,
        state: &mut ChatPlaybackState,
        item: &QueueItem,
    ) -> Result<()> {
        let joined_for_this_play = !state.joined;
        if joined_for_this_play {
            self.transport.join(chat_id).await?;
            state.joined = true;
        }

        let descriptor = item.descriptor(state.speed);
        if let Err(e) = self.transport.change_stream(chat_id, &descriptor).await {
            if joined_for_this_play {
                if let Err(leave_err) = self.transport.leave(chat_id).await {
                    warn!(chat_id, error = %leave_err, "could not roll back join after stream failure");
                }
                state.joined = false;
            }
            return Err(e);
        }

        info!(chat_id, title = %item.title, "stream started");
        self.events.emit(PlayerEvent::TrackStarted {
            chat_id,
            title: item.title.clone(),
            requested_by: item.requested_by.clone(),
            timestamp: chrono::Utc::now(),
        });
        state.current = Some(item.clone());
        state.paused = false;
        Ok(())
    }

    /// Advance to whatever plays next
    ///
    /// `honor_loop` is true for natural stream ends and false for manual
    /// skips, which never re-play the current item. A finite repeat-current
    /// count that reaches zero drops back to normal advance; a count set to
    /// zero repeats indefinitely.
    async fn advance(
        &self,
        chat_id: i64,
        state: &mut ChatPlaybackState,
        honor_loop: bool,
    ) -> Result<()> {
        let prev = state.current.take();

        match prev {
            Some(prev_item) if honor_loop && state.loop_mode == LoopMode::RepeatCurrent => {
                if state.loop_remaining > 0 {
                    state.loop_remaining -= 1;
                    if state.loop_remaining == 0 {
                        // finite repeats exhausted
                        state.loop_mode = LoopMode::Off;
                    }
                }
                debug!(chat_id, remaining = state.loop_remaining, "repeating current item");
                if let Err(e) = self.start_stream(chat_id, state, &prev_item).await {
                    self.park_failed_advance(chat_id, state, prev_item);
                    return Err(e);
                }
                Ok(())
            }
            prev => {
                if let Some(next) = state.pop_next() {
                    if let Err(e) = self.start_stream(chat_id, state, &next).await {
                        self.park_failed_advance(chat_id, state, next);
                        return Err(e);
                    }
                    if state.loop_mode == LoopMode::RepeatQueue {
                        if let Some(prev_item) = prev {
                            // round-robin: the finished item rejoins behind
                            // everything already waiting
                            state.queue.push_back(prev_item);
                        }
                    }
                    self.emit_queue_updated(chat_id, state.queue.len());
                    Ok(())
                } else {
                    // Nothing left; stay joined through the grace period to
                    // tolerate brief gaps between requests
                    debug!(chat_id, "queue drained, scheduling idle reaper");
                    self.schedule_idle_reaper(chat_id);
                    Ok(())
                }
            }
        }
    }

    /// A failed advance leaves the chat with no stream playing, so no
    /// further stream-end will arrive on its own. Keep the unplayed item at
    /// the queue head for a later retry and fall back to the idle reaper so
    /// the voice session cannot stay joined forever.
    fn park_failed_advance(&self, chat_id: i64, state: &mut ChatPlaybackState, item: QueueItem) {
        state.queue.push_front(item);
        self.schedule_idle_reaper(chat_id);
    }

    /// Reset and remove a chat's record; caller holds the chat lock
    async fn release(&self, chat_id: i64, state: &mut ChatPlaybackState) {
        *state = ChatPlaybackState::new();
        self.remove_slot(chat_id).await;
        self.events.emit(PlayerEvent::ChatReleased {
            chat_id,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Release the voice session after the grace period if the chat is still
    /// idle. Cancellation is by state inspection: any play that lands before
    /// the timer fires makes this a no-op.
    fn schedule_idle_reaper(&self, chat_id: i64) {
        let engine = self.clone_handles();
        let grace = self.idle_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            engine.reap_if_idle(chat_id).await;
        });
    }

    async fn reap_if_idle(&self, chat_id: i64) {
        let Some(mut state) = self.lock_existing(chat_id).await else {
            return;
        };
        if !state.joined || state.current.is_some() {
            debug!(chat_id, "idle reaper fired but chat is active again");
            return;
        }

        info!(chat_id, "idle grace period elapsed, leaving voice session");
        if let Err(e) = self.transport.leave(chat_id).await {
            warn!(chat_id, error = %e, "transport leave failed during idle teardown");
        }
        self.release(chat_id, &mut state).await;
    }

    fn emit_queue_updated(&self, chat_id: i64, queue_len: usize) {
        self.events.emit(PlayerEvent::QueueUpdated {
            chat_id,
            queue_len,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Lock a chat's state, creating the record if absent
    ///
    /// Re-validates the slot against the map after acquiring: a concurrent
    /// teardown replaces the slot, and a guard into a removed slot must never
    /// be handed out.
    async fn lock_chat(&self, chat_id: i64) -> OwnedMutexGuard<ChatPlaybackState> {
        loop {
            let slot = {
                let mut chats = self.chats.lock().await;
                Arc::clone(chats.entry(chat_id).or_default())
            };
            let guard = slot.clone().lock_owned().await;
            if self.slot_is_live(chat_id, &slot).await {
                return guard;
            }
        }
    }

    /// Lock a chat's state only if the record exists
    async fn lock_existing(&self, chat_id: i64) -> Option<OwnedMutexGuard<ChatPlaybackState>> {
        loop {
            let slot = self.chats.lock().await.get(&chat_id).cloned()?;
            let guard = slot.clone().lock_owned().await;
            if self.slot_is_live(chat_id, &slot).await {
                return Some(guard);
            }
        }
    }

    async fn slot_is_live(&self, chat_id: i64, slot: &ChatSlot) -> bool {
        self.chats
            .lock()
            .await
            .get(&chat_id)
            .is_some_and(|s| Arc::ptr_eq(s, slot))
    }

    async fn remove_slot(&self, chat_id: i64) {
        self.chats.lock().await.remove(&chat_id);
    }

    /// Clone handles for spawned tasks
    fn clone_handles(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            chats: Arc::clone(&self.chats),
            events: self.events.clone(),
            idle_grace: self.idle_grace,
            queue_limit: self.queue_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::types::StreamSource;
    use crate::transport::mock::{MockTransport, TransportCall};

    fn item(title: &str) -> QueueItem {
        QueueItem {
            title: title.to_string(),
            duration: "3:00".to_string(),
            requested_by: "tester".to_string(),
            source: StreamSource::Url(format!("https://example.com/{title}")),
            is_video: false,
            position: 0,
        }
    }

    fn engine() -> (PlaybackEngine, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let engine = PlaybackEngine::new(
            Arc::clone(&transport) as Arc<dyn VoiceTransport>,
            Duration::from_secs(300),
            0,
        );
        (engine, transport)
    }

    #[tokio::test]
    async fn test_play_joins_and_streams() {
        let (engine, transport) = engine();

        engine.play(1, item("a"), false).await.unwrap();

        assert!(engine.is_joined(1).await);
        assert!(engine.is_playing(1).await);
        assert_eq!(engine.current(1).await.unwrap().title, "a");
        assert!(matches!(transport.calls()[0], TransportCall::Join(1)));
        assert!(matches!(transport.calls()[1], TransportCall::ChangeStream(1, _)));
    }

    #[tokio::test]
    async fn test_play_without_force_enqueues_behind_current() {
        let (engine, transport) = engine();

        engine.play(1, item("a"), false).await.unwrap();
        engine.play(1, item("b"), false).await.unwrap();

        assert_eq!(engine.current(1).await.unwrap().title, "a");
        let queue = engine.queue(1).await;
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].title, "b");
        // Only one stream change: b never started
        assert_eq!(transport.stream_changes(), 1);
    }

    #[tokio::test]
    async fn test_play_with_force_replaces_current() {
        let (engine, _) = engine();

        engine.play(1, item("a"), false).await.unwrap();
        engine.play(1, item("b"), true).await.unwrap();

        assert_eq!(engine.current(1).await.unwrap().title, "b");
        assert!(engine.queue(1).await.is_empty());
    }

    #[tokio::test]
    async fn test_join_failure_leaves_no_state() {
        let (engine, transport) = engine();
        transport.fail_join(true);

        assert!(engine.play(1, item("a"), false).await.is_err());
        assert!(!engine.is_joined(1).await);
        assert_eq!(engine.chat_info(1).await.queue_len, 0);

        // The chat works normally once the transport recovers
        transport.fail_join(false);
        engine.play(1, item("a"), false).await.unwrap();
        assert!(engine.is_playing(1).await);
    }

    #[tokio::test]
    async fn test_stream_failure_rolls_back_fresh_join() {
        let (engine, transport) = engine();
        transport.fail_stream(true);

        assert!(engine.play(1, item("a"), false).await.is_err());
        assert!(!engine.is_joined(1).await);
        // The rollback leave was issued
        assert!(transport.calls().contains(&TransportCall::Leave(1)));
    }

    #[tokio::test]
    async fn test_natural_end_advances_fifo() {
        let (engine, _) = engine();

        engine.play(1, item("a"), false).await.unwrap();
        engine.play(1, item("b"), false).await.unwrap();

        engine.handle_stream_end(1).await.unwrap();
        assert_eq!(engine.current(1).await.unwrap().title, "b");
        assert!(engine.queue(1).await.is_empty());
    }

    #[tokio::test]
    async fn test_repeat_current_finite_count() {
        let (engine, transport) = engine();

        engine.play(1, item("a"), false).await.unwrap();
        engine.play(1, item("b"), false).await.unwrap();
        engine.set_loop(1, LoopMode::RepeatCurrent, 2).await.unwrap();

        // Two repeats: a plays three times in total
        engine.handle_stream_end(1).await.unwrap();
        assert_eq!(engine.current(1).await.unwrap().title, "a");
        engine.handle_stream_end(1).await.unwrap();
        assert_eq!(engine.current(1).await.unwrap().title, "a");

        // Repeats exhausted: normal advance resumes
        engine.handle_stream_end(1).await.unwrap();
        assert_eq!(engine.current(1).await.unwrap().title, "b");
        assert_eq!(transport.stream_changes(), 4);
    }

    #[tokio::test]
    async fn test_repeat_current_infinite() {
        let (engine, _) = engine();

        engine.play(1, item("a"), false).await.unwrap();
        engine.set_loop(1, LoopMode::RepeatCurrent, 0).await.unwrap();

        for _ in 0..5 {
            engine.handle_stream_end(1).await.unwrap();
            assert_eq!(engine.current(1).await.unwrap().title, "a");
        }
    }

    #[tokio::test]
    async fn test_repeat_queue_round_robin() {
        let (engine, _) = engine();

        engine.play(1, item("a"), false).await.unwrap();
        engine.play(1, item("b"), false).await.unwrap();
        engine.play(1, item("c"), false).await.unwrap();
        engine.set_loop(1, LoopMode::RepeatQueue, 0).await.unwrap();

        // Three advances cycle back to the first item
        engine.handle_stream_end(1).await.unwrap();
        assert_eq!(engine.current(1).await.unwrap().title, "b");
        engine.handle_stream_end(1).await.unwrap();
        assert_eq!(engine.current(1).await.unwrap().title, "c");
        engine.handle_stream_end(1).await.unwrap();
        assert_eq!(engine.current(1).await.unwrap().title, "a");

        // The finished item sits at the tail, never alongside current
        let queue = engine.queue(1).await;
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.last().unwrap().title, "c");
    }

    #[tokio::test]
    async fn test_skip_ignores_repeat_current() {
        let (engine, _) = engine();

        engine.play(1, item("a"), false).await.unwrap();
        engine.play(1, item("b"), false).await.unwrap();
        engine.set_loop(1, LoopMode::RepeatCurrent, 0).await.unwrap();

        engine.skip(1).await.unwrap();
        assert_eq!(engine.current(1).await.unwrap().title, "b");
    }

    #[tokio::test]
    async fn test_stop_resets_everything() {
        let (engine, transport) = engine();

        engine.play(1, item("a"), false).await.unwrap();
        engine.play(1, item("b"), false).await.unwrap();
        engine.stop(1).await.unwrap();

        let info = engine.chat_info(1).await;
        assert!(info.current.is_none());
        assert_eq!(info.queue_len, 0);
        assert!(!engine.is_joined(1).await);
        assert!(transport.calls().contains(&TransportCall::Leave(1)));
    }

    #[tokio::test]
    async fn test_failed_advance_keeps_next_item_queued() {
        let (engine, transport) = engine();

        engine.play(1, item("a"), false).await.unwrap();
        engine.play(1, item("b"), false).await.unwrap();

        transport.fail_stream(true);
        engine.handle_stream_end(1).await.unwrap();

        // b did not start, but it is not lost either
        assert!(engine.current(1).await.is_none());
        let queue = engine.queue(1).await;
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].title, "b");

        // Once the transport recovers, the next advance picks b up
        transport.fail_stream(false);
        engine.handle_stream_end(1).await.unwrap();
        assert_eq!(engine.current(1).await.unwrap().title, "b");
        assert!(engine.queue(1).await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_repeat_keeps_item_queued() {
        let (engine, transport) = engine();

        engine.play(1, item("a"), false).await.unwrap();
        engine.set_loop(1, LoopMode::RepeatCurrent, 0).await.unwrap();

        transport.fail_stream(true);
        engine.handle_stream_end(1).await.unwrap();

        assert!(engine.current(1).await.is_none());
        assert_eq!(engine.queue(1).await[0].title, "a");
    }

    #[tokio::test]
    async fn test_stop_tears_down_even_if_leave_fails() {
        let (engine, transport) = engine();

        engine.play(1, item("a"), false).await.unwrap();
        transport.fail_leave(true);
        engine.stop(1).await.unwrap();

        assert!(!engine.is_joined(1).await);
    }

    #[tokio::test]
    async fn test_stop_on_unknown_chat_is_noop() {
        let (engine, transport) = engine();
        engine.stop(99).await.unwrap();
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_leave_aborts_on_transport_failure() {
        let (engine, transport) = engine();

        engine.play(1, item("a"), false).await.unwrap();
        transport.fail_leave(true);
        assert!(engine.leave(1).await.is_err());
        // Unlike stop, a failed leave keeps the chat's state
        assert!(engine.is_joined(1).await);
        assert_eq!(engine.current(1).await.unwrap().title, "a");

        transport.fail_leave(false);
        engine.leave(1).await.unwrap();
        assert!(!engine.is_joined(1).await);
    }

    #[tokio::test]
    async fn test_session_closed_drops_state_without_leave() {
        let (engine, transport) = engine();

        engine.play(1, item("a"), false).await.unwrap();
        engine.handle_session_closed(1).await;

        assert!(!engine.is_joined(1).await);
        assert!(engine.current(1).await.is_none());
        assert!(!transport.calls().contains(&TransportCall::Leave(1)));
    }

    #[tokio::test]
    async fn test_set_speed_restarts_with_new_rate() {
        let (engine, transport) = engine();

        engine.play(1, item("a"), false).await.unwrap();
        engine.seek(1, 42).await.unwrap();
        engine.set_speed(1, 1.5).await.unwrap();

        let calls = transport.calls();
        match calls.last().unwrap() {
            TransportCall::ChangeStream(1, desc) => {
                assert_eq!(desc.speed, 1.5);
                // seek position carried into the restarted descriptor
                assert_eq!(desc.position, 42);
            }
            other => panic!("expected stream change, got {:?}", other),
        }
        assert_eq!(engine.chat_info(1).await.speed, 1.5);
    }

    #[tokio::test]
    async fn test_set_speed_failure_keeps_old_rate() {
        let (engine, transport) = engine();

        engine.play(1, item("a"), false).await.unwrap();
        transport.fail_stream(true);
        assert!(engine.set_speed(1, 2.0).await.is_err());

        // The running stream was never replaced, so its rate still stands
        let info = engine.chat_info(1).await;
        assert_eq!(info.speed, 1.0);
        assert_eq!(info.current.unwrap().title, "a");
        assert!(engine.is_joined(1).await);
    }

    #[tokio::test]
    async fn test_invalid_speed_rejected() {
        let (engine, _) = engine();
        engine.play(1, item("a"), false).await.unwrap();
        assert!(engine.set_speed(1, 0.0).await.is_err());
        assert!(engine.set_speed(1, f64::NAN).await.is_err());
    }

    #[tokio::test]
    async fn test_seek_requires_current_item() {
        let (engine, _) = engine();
        assert!(engine.seek(1, 10).await.is_err());

        engine.play(1, item("a"), false).await.unwrap();
        engine.seek(1, 10).await.unwrap();
        assert_eq!(engine.current(1).await.unwrap().position, 10);
    }

    #[tokio::test]
    async fn test_pause_and_resume() {
        let (engine, _) = engine();

        assert!(engine.pause(1).await.is_err());

        engine.play(1, item("a"), false).await.unwrap();
        engine.pause(1).await.unwrap();
        assert!(!engine.is_playing(1).await);
        assert!(engine.chat_info(1).await.is_paused);

        engine.resume(1).await.unwrap();
        assert!(engine.is_playing(1).await);
    }

    #[tokio::test]
    async fn test_queue_limit() {
        let transport = Arc::new(MockTransport::new());
        let engine = PlaybackEngine::new(
            Arc::clone(&transport) as Arc<dyn VoiceTransport>,
            Duration::from_secs(300),
            2,
        );

        engine.play(1, item("a"), false).await.unwrap();
        engine.play(1, item("b"), false).await.unwrap();
        engine.play(1, item("c"), false).await.unwrap();
        assert!(engine.play(1, item("d"), false).await.is_err());
        assert_eq!(engine.queue(1).await.len(), 2);
    }

    #[tokio::test]
    async fn test_total_queued_spans_chats() {
        let (engine, _) = engine();

        engine.play(1, item("a"), false).await.unwrap();
        engine.play(1, item("b"), false).await.unwrap();
        engine.play(2, item("c"), false).await.unwrap();
        engine.play(2, item("d"), false).await.unwrap();
        engine.play(2, item("e"), false).await.unwrap();

        assert_eq!(engine.total_queued().await, 3);
    }

    #[tokio::test]
    async fn test_chats_are_independent() {
        let (engine, transport) = engine();

        engine.play(1, item("a"), false).await.unwrap();
        transport.fail_stream(true);
        assert!(engine.play(2, item("b"), false).await.is_err());

        // Chat 1 is untouched by chat 2's failure
        assert!(engine.is_playing(1).await);
        assert!(!engine.is_joined(2).await);
    }

    #[tokio::test]
    async fn test_spurious_stream_end_is_ignored() {
        let (engine, _) = engine();
        engine.handle_stream_end(99).await.unwrap();
        assert!(engine.current(99).await.is_none());
    }
}

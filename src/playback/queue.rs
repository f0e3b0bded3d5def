//! Per-chat playback state
//!
//! One `ChatPlaybackState` record per chat consolidates everything the engine
//! tracks: the current item, the pending FIFO queue, loop mode, pause flag,
//! advisory speed, and whether the voice session is joined. The engine owns a
//! map of these; nothing else mutates them.

use crate::playback::types::{LoopMode, QueueItem};
use rand::seq::SliceRandom;
use std::collections::VecDeque;

/// Playback state for a single chat
#[derive(Debug)]
pub struct ChatPlaybackState {
    /// Item presently streaming, if any
    pub current: Option<QueueItem>,

    /// Pending items, FIFO: append at tail, consume from head
    pub queue: VecDeque<QueueItem>,

    /// Advance-on-end behavior
    pub loop_mode: LoopMode,

    /// Remaining repeats under `RepeatCurrent`; 0 means infinite
    pub loop_remaining: u32,

    pub paused: bool,

    /// Advisory playback rate, 1.0 = normal
    pub speed: f64,

    /// Whether the chat's voice session is currently active
    pub joined: bool,
}

impl ChatPlaybackState {
    pub fn new() -> Self {
        Self {
            current: None,
            queue: VecDeque::new(),
            loop_mode: LoopMode::Off,
            loop_remaining: 0,
            paused: false,
            speed: 1.0,
            joined: false,
        }
    }

    /// True if the record holds nothing worth keeping
    pub fn is_pristine(&self) -> bool {
        !self.joined && self.current.is_none() && self.queue.is_empty()
    }

    /// Append an item to the tail of the queue
    ///
    /// `limit` of 0 means unbounded; otherwise enqueueing past the limit fails
    /// and the queue is left unchanged.
    pub fn enqueue(&mut self, item: QueueItem, limit: usize) -> bool {
        if limit > 0 && self.queue.len() >= limit {
            return false;
        }
        self.queue.push_back(item);
        true
    }

    /// Pop the next item from the head of the queue
    pub fn pop_next(&mut self) -> Option<QueueItem> {
        self.queue.pop_front()
    }

    /// Shuffle the pending queue in place
    ///
    /// Only meaningful with more than one pending item; returns false otherwise.
    pub fn shuffle(&mut self) -> bool {
        if self.queue.len() <= 1 {
            return false;
        }
        let mut items: Vec<QueueItem> = self.queue.drain(..).collect();
        items.shuffle(&mut rand::thread_rng());
        self.queue = items.into();
        true
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }
}

impl Default for ChatPlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

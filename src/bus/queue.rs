//! Bounded FIFO for inbound bus messages.
//!
//! The transport callback side only performs a truncating copy into this
//! queue; real work happens when the processor drains it, one message per
//! cooperative cycle.  When the queue is full the message is dropped and
//! counted, never blocked on.

use heapless::{Deque, String, Vec};
use log::error;

/// Capacity of a stored topic, bytes.
pub const TOPIC_LEN: usize = 160;
/// Capacity of a stored payload, bytes.
pub const PAYLOAD_LEN: usize = 256;
/// Queue depth.
pub const QUEUE_DEPTH: usize = 20;

/// One inbound message, copied by value out of the transport's buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String<TOPIC_LEN>,
    pub payload: Vec<u8, PAYLOAD_LEN>,
}

impl BusMessage {
    /// Truncating copy of a raw topic/payload pair.
    pub fn copy_from(topic: &str, payload: &[u8]) -> Self {
        let mut msg = Self {
            topic: crate::config::bounded(topic),
            payload: Vec::new(),
        };
        let n = payload.len().min(PAYLOAD_LEN);
        let _ = msg.payload.extend_from_slice(&payload[..n]);
        msg
    }

    /// Payload as text, if valid UTF-8.
    pub fn payload_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.payload).ok()
    }
}

/// Bounded inbound command queue.
#[derive(Debug, Default)]
pub struct CommandQueue {
    items: Deque<BusMessage, QUEUE_DEPTH>,
    dropped: u32,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy a message into the queue.  Returns `false` (and counts the
    /// drop) when the queue is full.
    pub fn enqueue(&mut self, topic: &str, payload: &[u8]) -> bool {
        let msg = BusMessage::copy_from(topic, payload);
        if self.items.push_back(msg).is_err() {
            self.dropped = self.dropped.saturating_add(1);
            error!("inbound bus queue full, message on '{topic}' dropped");
            return false;
        }
        true
    }

    /// Front of the queue without removing it.
    pub fn front(&self) -> Option<&BusMessage> {
        self.items.front()
    }

    pub fn pop(&mut self) -> Option<BusMessage> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Messages dropped because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

//! # Write Queue
//!
//! Bounded FIFO of outbound packets with in-queue coalescing: a repeated
//! update to the same value ID overwrites the queued body in place instead of
//! growing the queue. User code can mutate a noisy sensor value far faster
//! than a half-duplex radio drains — without the merge the queue fills with
//! stale intermediates.

use std::collections::VecDeque;

use crate::error::{LinkError, Result};
use crate::wire::Packet;

/// Default queue capacity.
pub const MAX_QUEUE_SIZE: usize = 512;

/// What happened to a pushed packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    /// Appended at the tail.
    Appended,
    /// Merged into an existing entry with the same kind and value ID.
    Coalesced,
}

/// Bounded FIFO with last-writer-wins coalescing for update packets.
#[derive(Debug)]
pub struct WriteQueue {
    queue: VecDeque<Packet>,
    capacity: usize,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::with_capacity(MAX_QUEUE_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        WriteQueue {
            queue: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Enqueue a packet.
    ///
    /// Fails with [`LinkError::QueueFull`] at capacity. An update packet whose
    /// kind and value ID match a queued entry overwrites that entry's body in
    /// place — the entry keeps its FIFO position, so per-ID ordering holds
    /// while later IDs may still drain first.
    pub fn push(&mut self, packet: Packet) -> Result<Enqueue> {
        if self.queue.len() >= self.capacity {
            return Err(LinkError::QueueFull);
        }

        if packet.kind().is_update() {
            let kind = packet.kind();
            let value_id = packet.body.value_id();
            if let Some(slot) = self
                .queue
                .iter_mut()
                .find(|queued| queued.kind() == kind && queued.body.value_id() == value_id)
            {
                slot.body = packet.body;
                return Ok(Enqueue::Coalesced);
            }
        }

        self.queue.push_back(packet);
        Ok(Enqueue::Appended)
    }

    /// Pop the head of the queue.
    pub fn pop(&mut self) -> Option<Packet> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for WriteQueue {
    fn default() -> Self {
        Self::new()
    }
}

//! # Read Pipeline
//!
//! Reassembles frames from the driver's partial reads and dispatches decoded
//! packets. Bytes accumulate in a rolling buffer capped at
//! [`MAX_BUFFER_SIZE`]; pure line noise can therefore never grow memory. Each
//! scan finds the first unescaped END delimiter, attempts a decode of the
//! prefix, and erases that prefix whether or not the decode succeeded — a
//! corrupt frame costs its own bytes, nothing more.

use std::sync::Arc;

use bytes::BytesMut;

use crate::codec;
use crate::driver::SerialDriver;
use crate::framing;
use crate::pending::AckSink;
use crate::stats::LinkStats;
use crate::table;
use crate::wire::{Packet, PacketKind};

/// Cap on the rolling reassembly buffer.
pub const MAX_BUFFER_SIZE: usize = 2048;

/// Per-socket frame reassembler.
#[derive(Debug)]
pub struct FrameReader {
    read_buffer: BytesMut,
    max_buffer: usize,
    stats: Arc<LinkStats>,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::with_stats(Arc::new(LinkStats::new()))
    }

    pub fn with_stats(stats: Arc<LinkStats>) -> Self {
        FrameReader {
            read_buffer: BytesMut::new(),
            max_buffer: MAX_BUFFER_SIZE,
            stats,
        }
    }

    /// Pull available bytes from the driver and try to extract one packet.
    ///
    /// Returns `None` when the driver has nothing (or errored) and no
    /// complete frame is buffered.
    pub fn poll(&mut self, driver: &mut dyn SerialDriver) -> Option<Packet> {
        let mut chunk = BytesMut::new();
        let bytes_read = driver.read(&mut chunk);
        if bytes_read <= 0 {
            return None;
        }
        self.feed(&chunk)
    }

    /// Append raw bytes and try to extract one packet.
    pub fn feed(&mut self, bytes: &[u8]) -> Option<Packet> {
        self.read_buffer.extend_from_slice(bytes);

        // Keep only the newest bytes once noise pushes past the cap.
        if self.read_buffer.len() > self.max_buffer {
            let excess = self.read_buffer.len() - self.max_buffer;
            let _ = self.read_buffer.split_to(excess);
        }

        self.extract()
    }

    /// Scan the buffer for delimited frames, consuming each scanned prefix.
    fn extract(&mut self) -> Option<Packet> {
        while let Some(end) = framing::find_frame_end(&self.read_buffer) {
            let frame = self.read_buffer.split_to(end + 1);
            match codec::decode(&frame) {
                Ok(packet) => return Some(packet),
                Err(err) => {
                    // Expected under line noise; the next frame resyncs.
                    self.stats.record_decode_failure();
                    tracing::debug!(%err, frame_len = frame.len(), "dropping undecodable frame");
                }
            }
        }
        None
    }

    /// Bytes currently buffered awaiting a frame terminator.
    pub fn buffered(&self) -> usize {
        self.read_buffer.len()
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Route one inbound packet to its handlers.
///
/// Updates land in the value table; acks and nacks feed the write pipeline's
/// sink. Every other kind is accepted for host-level handlers layered above —
/// never rejected here.
pub fn dispatch(packet: &Packet, acks: &dyn AckSink, stats: &LinkStats) {
    if let (Some(value_id), Some(value)) = (packet.body.value_id(), packet.body.typed_value()) {
        table::set(value_id, value);
    }

    match packet.kind() {
        PacketKind::GenericAck => {
            stats.record_ack_received();
            acks.ack(packet.seq_id);
        }
        PacketKind::GenericNack => {
            acks.nack(packet.seq_id);
        }
        _ => {
            tracing::trace!(kind = ?packet.kind(), seq_id = packet.seq_id, "packet accepted");
        }
    }
}

//! # Pending-Ack List
//!
//! Per-socket tracking of transmitted packets awaiting acknowledgement, with
//! a timestamp and retry counter per entry. The writer task owns the list and
//! sweeps it periodically; the reader task only touches it through the narrow
//! [`AckSink`] interface, so there is no ownership cycle between the two
//! pipelines.

use std::sync::Mutex;
use std::time::Duration;

use quanta::Instant;

use crate::wire::Packet;

/// Default retry budget per packet.
pub const MAX_RETRIES: u8 = 3;

/// Default time to wait for an acknowledgement before retransmitting.
pub const ACK_TIMEOUT: Duration = Duration::from_millis(10);

/// Signals the reader delivers into the write pipeline.
pub trait AckSink: Send + Sync {
    /// The peer acknowledged the packet with this sequence ID.
    fn ack(&self, seq_id: u8);
    /// The peer rejected the packet with this sequence ID; retransmit now.
    fn nack(&self, seq_id: u8);
}

/// One transmitted packet awaiting acknowledgement.
#[derive(Debug, Clone)]
pub struct PendingPacket {
    pub packet: Packet,
    pub sent_at: Instant,
    pub retries: u8,
    /// Set by a NACK: resend on the next sweep regardless of the timeout.
    due_now: bool,
}

/// Result of one expiry sweep.
#[derive(Debug, Default)]
pub struct Sweep {
    /// Packets to retransmit, in list order.
    pub resend: Vec<Packet>,
    /// `(seq_id, retries)` of entries dropped after exhausting the budget.
    pub dropped: Vec<(u8, u8)>,
}

/// List of sent-but-unacknowledged packets.
#[derive(Debug, Default)]
pub struct PendingList {
    entries: Mutex<Vec<PendingPacket>>,
}

impl PendingList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly transmitted packet.
    pub fn record(&self, packet: Packet) {
        self.entries.lock().unwrap().push(PendingPacket {
            packet,
            sent_at: Instant::now(),
            retries: 0,
            due_now: false,
        });
    }

    /// Remove the entry matching `seq_id`. Returns whether one was found.
    pub fn acknowledge(&self, seq_id: u8) -> bool {
        let mut entries = self.entries.lock().unwrap();
        match entries.iter().position(|e| e.packet.seq_id == seq_id) {
            Some(idx) => {
                entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Mark the entry matching `seq_id` for retransmission on the next sweep.
    /// The resend still counts against the retry budget.
    pub fn reject(&self, seq_id: u8) -> bool {
        let mut entries = self.entries.lock().unwrap();
        match entries.iter_mut().find(|e| e.packet.seq_id == seq_id) {
            Some(entry) => {
                entry.due_now = true;
                true
            }
            None => false,
        }
    }

    /// Sweep for entries past `timeout` (or NACKed): collect retransmissions,
    /// drop entries whose budget is spent.
    pub fn expire(&self, timeout: Duration, max_retries: u8) -> Sweep {
        let now = Instant::now();
        let mut sweep = Sweep::default();

        let mut entries = self.entries.lock().unwrap();
        entries.retain_mut(|entry| {
            if !entry.due_now && now.duration_since(entry.sent_at) <= timeout {
                return true;
            }
            if entry.retries >= max_retries {
                sweep.dropped.push((entry.packet.seq_id, entry.retries));
                return false;
            }
            entry.retries += 1;
            entry.sent_at = now;
            entry.due_now = false;
            sweep.resend.push(entry.packet.clone());
            true
        });

        sweep
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AckSink for PendingList {
    fn ack(&self, seq_id: u8) {
        self.acknowledge(seq_id);
    }

    fn nack(&self, seq_id: u8) {
        self.reject(seq_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::PacketBody;

    fn sent(seq_id: u8) -> Packet {
        Packet::with_seq(
            seq_id,
            PacketBody::UpdateInt {
                value_id: 1,
                value: i32::from(seq_id),
            },
        )
    }

    #[test]
    fn ack_removes_matching_entry() {
        let list = PendingList::new();
        list.record(sent(5));
        list.record(sent(6));

        assert!(list.acknowledge(5));
        assert_eq!(list.len(), 1);
        assert!(!list.acknowledge(5));
    }

    #[test]
    fn ack_with_wrong_seq_leaves_list() {
        let list = PendingList::new();
        list.record(sent(5));
        assert!(!list.acknowledge(99));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn fresh_entries_survive_a_sweep() {
        let list = PendingList::new();
        list.record(sent(1));
        let sweep = list.expire(Duration::from_secs(10), MAX_RETRIES);
        assert!(sweep.resend.is_empty());
        assert!(sweep.dropped.is_empty());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn timed_out_entry_is_resent_with_bumped_retry() {
        let list = PendingList::new();
        list.record(sent(1));

        let sweep = list.expire(Duration::ZERO, MAX_RETRIES);
        assert_eq!(sweep.resend.len(), 1);
        assert_eq!(sweep.resend[0].seq_id, 1);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn budget_exhaustion_drops_entry() {
        let list = PendingList::new();
        list.record(sent(7));

        for _ in 0..MAX_RETRIES {
            let sweep = list.expire(Duration::ZERO, MAX_RETRIES);
            assert_eq!(sweep.resend.len(), 1);
        }

        let sweep = list.expire(Duration::ZERO, MAX_RETRIES);
        assert!(sweep.resend.is_empty());
        assert_eq!(sweep.dropped, vec![(7, MAX_RETRIES)]);
        assert!(list.is_empty());
    }

    #[test]
    fn nack_marks_entry_due_immediately() {
        let list = PendingList::new();
        list.record(sent(3));
        assert!(list.reject(3));

        // Generous timeout: only the NACK flag can trigger the resend.
        let sweep = list.expire(Duration::from_secs(60), MAX_RETRIES);
        assert_eq!(sweep.resend.len(), 1);
        assert_eq!(sweep.resend[0].seq_id, 3);

        // Flag cleared by the resend.
        let sweep = list.expire(Duration::from_secs(60), MAX_RETRIES);
        assert!(sweep.resend.is_empty());
    }

    #[test]
    fn nack_resends_count_against_budget() {
        let list = PendingList::new();
        list.record(sent(4));

        for _ in 0..MAX_RETRIES {
            assert!(list.reject(4));
            let sweep = list.expire(Duration::from_secs(60), MAX_RETRIES);
            assert_eq!(sweep.resend.len(), 1);
        }

        assert!(list.reject(4));
        let sweep = list.expire(Duration::from_secs(60), MAX_RETRIES);
        assert!(sweep.resend.is_empty());
        assert_eq!(sweep.dropped.len(), 1);
        assert!(list.is_empty());
    }

    #[test]
    fn ack_sink_routes_to_list() {
        let list = PendingList::new();
        list.record(sent(9));

        let sink: &dyn AckSink = &list;
        sink.ack(9);
        assert!(list.is_empty());
    }
}

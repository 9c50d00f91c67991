//! # Socket
//!
//! One socket owns one serial driver and runs the link over it with two
//! background tasks:
//!
//! - **writer** — drains the write queue (assign sequence ID, encode, stuff,
//!   transmit), then sweeps the pending-ack list for retransmissions
//! - **reader** — reassembles inbound frames and dispatches packets to the
//!   value table and the ack sink
//!
//! Every open socket registers in a process-wide set so
//! [`Socket::broadcast`] can fan a packet out to all of them. A task that
//! panics is caught, logged, and revived after [`SocketConfig::revive_delay`];
//! there is no terminal state short of dropping the socket.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::thread;
use std::time::Duration;

use crate::codec;
use crate::driver::SerialDriver;
use crate::error::{LinkError, Result};
use crate::pending::PendingList;
use crate::queue::{Enqueue, WriteQueue, MAX_QUEUE_SIZE};
use crate::reader::{self, FrameReader};
use crate::stats::{LinkStats, StatsSnapshot};
use crate::wire::{Packet, PacketBody};

/// Default interval between FetchValues broadcasts.
pub const FETCH_INTERVAL: Duration = Duration::from_millis(100);

// ─── Configuration ──────────────────────────────────────────────────────────

/// Socket timing and sizing parameters.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Writer sleep after draining the queue; reader sleep when idle.
    pub update_interval: Duration,
    /// Pause after each transmission so the peer can release its RTS line.
    pub post_transmit_delay: Duration,
    /// Time to wait for an acknowledgement before retransmitting.
    pub ack_timeout: Duration,
    /// Retransmission budget per packet.
    pub max_retries: u8,
    /// Sleep before resuming a task that panicked.
    pub revive_delay: Duration,
    /// Write queue capacity.
    pub queue_capacity: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        SocketConfig {
            update_interval: Duration::from_millis(2),
            post_transmit_delay: Duration::from_millis(4),
            ack_timeout: Duration::from_millis(10),
            max_retries: 3,
            revive_delay: Duration::from_secs(1),
            queue_capacity: MAX_QUEUE_SIZE,
        }
    }
}

// ─── Socket Registry ────────────────────────────────────────────────────────

static REGISTRY: OnceLock<Mutex<Vec<(usize, Weak<Shared>)>>> = OnceLock::new();
static NEXT_SOCKET_ID: AtomicUsize = AtomicUsize::new(0);

fn registry() -> &'static Mutex<Vec<(usize, Weak<Shared>)>> {
    REGISTRY.get_or_init(|| Mutex::new(Vec::new()))
}

fn register(shared: &Arc<Shared>) -> usize {
    let id = NEXT_SOCKET_ID.fetch_add(1, Ordering::Relaxed);
    let mut sockets = registry().lock().unwrap();
    sockets.retain(|(_, weak)| weak.strong_count() > 0);
    sockets.push((id, Arc::downgrade(shared)));
    id
}

fn deregister(id: usize) {
    registry()
        .lock()
        .unwrap()
        .retain(|(socket_id, _)| *socket_id != id);
}

/// Number of sockets currently registered.
pub fn active_socket_count() -> usize {
    registry()
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, weak)| weak.strong_count() > 0)
        .count()
}

// ─── Shared Socket State ────────────────────────────────────────────────────

struct Shared {
    driver: Mutex<Box<dyn SerialDriver>>,
    queue: Mutex<WriteQueue>,
    pending: PendingList,
    stats: Arc<LinkStats>,
    config: SocketConfig,
    seq: AtomicU8,
    shutdown: AtomicBool,
}

impl Shared {
    fn enqueue(&self, body: PacketBody) -> Result<()> {
        let outcome = self.queue.lock().unwrap().push(Packet::new(body));
        match outcome {
            Ok(Enqueue::Coalesced) => {
                self.stats.record_coalesced();
                Ok(())
            }
            Ok(Enqueue::Appended) => Ok(()),
            Err(err) => {
                self.stats.record_queue_rejection();
                Err(err)
            }
        }
    }

    /// Drain the write queue, then sweep the pending list.
    fn writer_tick(&self) {
        loop {
            let popped = self.queue.lock().unwrap().pop();
            let Some(mut packet) = popped else { break };

            packet.seq_id = self.seq.fetch_add(1, Ordering::Relaxed);
            self.transmit(&packet, false);
            if packet.kind().requires_ack() {
                self.pending.record(packet);
            }
            thread::sleep(self.config.post_transmit_delay);
        }

        let sweep = self
            .pending
            .expire(self.config.ack_timeout, self.config.max_retries);
        for (seq_id, retries) in sweep.dropped {
            self.stats.record_dropped_after_retries();
            tracing::warn!("{}", LinkError::MaxRetriesExceeded { seq_id, retries });
        }
        for packet in sweep.resend {
            self.transmit(&packet, true);
            thread::sleep(self.config.post_transmit_delay);
        }
    }

    fn transmit(&self, packet: &Packet, retransmit: bool) {
        let frame = match codec::encode(packet) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(%err, kind = ?packet.kind(), "unencodable packet dropped");
                return;
            }
        };

        let wrote = self.driver.lock().unwrap().write(&frame);
        if wrote {
            if retransmit {
                self.stats.record_retransmit();
                tracing::debug!(seq_id = packet.seq_id, "retransmitted packet");
            } else {
                self.stats.record_frame_sent();
                tracing::trace!(
                    seq_id = packet.seq_id,
                    kind = ?packet.kind(),
                    frame_len = frame.len(),
                    "transmitted packet"
                );
            }
        } else {
            // Not re-enqueued: the pending sweep resends ack-tracked packets.
            self.stats.record_write_failure();
            tracing::debug!(seq_id = packet.seq_id, "driver write failed");
        }
    }

    /// Poll the driver for one packet. Returns whether one was handled.
    fn reader_tick(&self, frames: &mut FrameReader) -> bool {
        let packet = {
            let mut driver = self.driver.lock().unwrap();
            frames.poll(&mut **driver)
        };
        match packet {
            Some(packet) => {
                self.stats.record_frame_received();
                reader::dispatch(&packet, &self.pending, &self.stats);
                true
            }
            None => false,
        }
    }
}

// ─── Socket ─────────────────────────────────────────────────────────────────

/// Handle to an open link socket. Dropping it stops both tasks and removes
/// the socket from the broadcast set.
pub struct Socket {
    shared: Arc<Shared>,
    registry_id: usize,
}

impl Socket {
    /// Open a socket over `driver` with default timing.
    pub fn open<D: SerialDriver + 'static>(driver: D) -> Self {
        Self::open_with_config(driver, SocketConfig::default())
    }

    /// Open a socket over `driver` with explicit timing and sizing.
    pub fn open_with_config<D: SerialDriver + 'static>(driver: D, config: SocketConfig) -> Self {
        let shared = Arc::new(Shared {
            driver: Mutex::new(Box::new(driver)),
            queue: Mutex::new(WriteQueue::with_capacity(config.queue_capacity)),
            pending: PendingList::new(),
            stats: Arc::new(LinkStats::new()),
            config,
            seq: AtomicU8::new(0),
            shutdown: AtomicBool::new(false),
        });

        // Tell the peer to clear any value labels cached from a previous run.
        if let Err(err) = shared.enqueue(PacketBody::Reset) {
            tracing::warn!(%err, "could not enqueue reset packet");
        }

        let registry_id = register(&shared);

        let writer_shared = Arc::clone(&shared);
        thread::spawn(move || writer_loop(&writer_shared));

        let reader_shared = Arc::clone(&shared);
        thread::spawn(move || reader_loop(&reader_shared));

        Socket {
            shared,
            registry_id,
        }
    }

    /// Enqueue a packet for transmission on this socket.
    pub fn write_packet(&self, body: PacketBody) -> Result<()> {
        self.shared.enqueue(body)
    }

    /// Enqueue a packet on every open socket. A socket with a full queue is
    /// logged and skipped so it cannot starve its siblings.
    pub fn broadcast(body: &PacketBody) {
        let sockets = registry().lock().unwrap();
        for (_, weak) in sockets.iter() {
            let Some(shared) = weak.upgrade() else { continue };
            if let Err(err) = shared.enqueue(body.clone()) {
                tracing::warn!(%err, kind = ?body.kind(), "broadcast skipped a socket");
            }
        }
    }

    /// Point-in-time counters for this socket.
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Packets transmitted and still awaiting acknowledgement.
    pub fn pending_count(&self) -> usize {
        self.shared.pending.len()
    }

    /// Packets queued and not yet transmitted.
    pub fn queue_len(&self) -> usize {
        self.shared.queue.lock().unwrap().len()
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
        deregister(self.registry_id);
    }
}

// ─── Task Loops ─────────────────────────────────────────────────────────────

fn writer_loop(shared: &Arc<Shared>) {
    while !shared.shutdown.load(Ordering::Relaxed) {
        let tick = panic::catch_unwind(AssertUnwindSafe(|| shared.writer_tick()));
        match tick {
            Ok(()) => thread::sleep(shared.config.update_interval),
            Err(_) => {
                tracing::warn!("writer task fault; reviving");
                thread::sleep(shared.config.revive_delay);
            }
        }
    }
}

fn reader_loop(shared: &Arc<Shared>) {
    let mut frames = FrameReader::with_stats(Arc::clone(&shared.stats));
    while !shared.shutdown.load(Ordering::Relaxed) {
        let tick = panic::catch_unwind(AssertUnwindSafe(|| shared.reader_tick(&mut frames)));
        match tick {
            // Got a packet — drain greedily before sleeping again.
            Ok(true) => {}
            Ok(false) => thread::sleep(shared.config.update_interval),
            Err(_) => {
                tracing::warn!("reader task fault; reviving");
                thread::sleep(shared.config.revive_delay);
            }
        }
    }
}

// ─── Fetch Interval ─────────────────────────────────────────────────────────

/// Adjunct task broadcasting a FetchValues request to every socket on a fixed
/// period, so the peer keeps pushing its side of the table.
pub struct FetchInterval {
    shutdown: Arc<AtomicBool>,
}

impl FetchInterval {
    /// Spawn with the default 100 ms period.
    pub fn spawn() -> Self {
        Self::spawn_every(FETCH_INTERVAL)
    }

    pub fn spawn_every(period: Duration) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                Socket::broadcast(&PacketBody::FetchValues);
                thread::sleep(period);
            }
        });
        FetchInterval { shutdown }
    }
}

impl Drop for FetchInterval {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

//! In-memory duplex byte wire.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::{BufMut, BytesMut};
use rand::rngs::StdRng;
use rand::RngExt as _;
use rand::SeedableRng;

use tether_link::SerialDriver;

use crate::impairment::Impairment;

type Pipe = Arc<Mutex<VecDeque<u8>>>;

/// One end of an in-memory serial wire.
///
/// Bytes written to one end become readable from the other, subject to that
/// end's egress [`Impairment`]. Both ends implement the link's
/// [`SerialDriver`] interface, so a pair of sockets (or a socket and a
/// hand-driven test harness) can talk through it.
pub struct SimWire {
    /// Bytes waiting for this end to read.
    inbox: Pipe,
    /// The peer's inbox — where this end's writes land.
    peer_inbox: Pipe,
    impairment: Impairment,
    rng: StdRng,
}

impl SimWire {
    /// A clean wire pair.
    pub fn pair() -> (SimWire, SimWire) {
        Self::pair_with(Impairment::none(), Impairment::none())
    }

    /// A wire pair with per-direction egress impairment. `a_to_b` shapes
    /// what the first end's writes do; `b_to_a` the second's.
    pub fn pair_with(a_to_b: Impairment, b_to_a: Impairment) -> (SimWire, SimWire) {
        let ab: Pipe = Arc::new(Mutex::new(VecDeque::new()));
        let ba: Pipe = Arc::new(Mutex::new(VecDeque::new()));

        let a = SimWire {
            inbox: Arc::clone(&ba),
            peer_inbox: Arc::clone(&ab),
            rng: StdRng::seed_from_u64(a_to_b.seed),
            impairment: a_to_b,
        };
        let b = SimWire {
            inbox: ab,
            peer_inbox: ba,
            rng: StdRng::seed_from_u64(b_to_a.seed.wrapping_add(1)),
            impairment: b_to_a,
        };
        (a, b)
    }

    /// Bytes currently queued for this end to read.
    pub fn pending_bytes(&self) -> usize {
        self.inbox.lock().unwrap().len()
    }

    /// Push raw bytes into this end's inbox, bypassing the peer. Lets tests
    /// inject garbage or hand-built frames.
    pub fn inject(&self, bytes: &[u8]) {
        self.inbox.lock().unwrap().extend(bytes.iter().copied());
    }
}

impl SerialDriver for SimWire {
    fn write(&mut self, buf: &[u8]) -> bool {
        if self.impairment.write_failure_probability > 0.0
            && self.rng.random::<f64>() < self.impairment.write_failure_probability
        {
            return false;
        }
        if self.impairment.drop_probability > 0.0
            && self.rng.random::<f64>() < self.impairment.drop_probability
        {
            // Lost on the air: the driver saw a successful transmit.
            tracing::trace!(len = buf.len(), "sim wire dropped a write");
            return true;
        }

        let mut data = buf.to_vec();
        if !data.is_empty()
            && self.impairment.corrupt_probability > 0.0
            && self.rng.random::<f64>() < self.impairment.corrupt_probability
        {
            let idx = self.rng.random_range(0..data.len());
            let bit: u32 = self.rng.random_range(0..8);
            data[idx] ^= 1 << bit;
            tracing::trace!(idx, bit, "sim wire corrupted a byte");
        }

        self.peer_inbox.lock().unwrap().extend(data);
        true
    }

    fn read(&mut self, buf: &mut BytesMut) -> i32 {
        let mut inbox = self.inbox.lock().unwrap();
        let available = inbox.len();
        let take = match self.impairment.max_read_chunk {
            Some(chunk) => available.min(chunk),
            None => available,
        };
        for _ in 0..take {
            // take <= inbox.len(), so the queue cannot run dry mid-loop.
            buf.put_u8(inbox.pop_front().unwrap());
        }
        take as i32
    }
}

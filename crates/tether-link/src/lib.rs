//! # tether-link
//!
//! Reliable framed message layer for a robot-to-companion telemetry link over
//! an unreliable serial byte stream.
//!
//! Named values mutated at runtime are framed, sequenced, retried, and
//! delivered as discrete packets; inbound acknowledgements, remote value
//! updates, and fetch requests are decoded concurrently off the same stream.
//!
//! ## Crate structure
//!
//! - [`buffer`] — sequential byte reader/writer (fixed-width ints, floats,
//!   length-prefixed strings)
//! - [`checksum`] — additive 8-bit frame checksum
//! - [`framing`] — START/ESCAPE/END sentinel byte stuffing
//! - [`wire`] — packet kinds, body sum type, typed values
//! - [`codec`] — per-kind serializers, frame assembly and verification
//! - [`table`] — process-wide value table the inbound dispatcher mutates
//! - [`queue`] — bounded write queue with last-writer-wins coalescing
//! - [`pending`] — pending-ack list with timeout and retry budget
//! - [`reader`] — rolling-buffer frame reassembly and packet dispatch
//! - [`driver`] — the two-method serial driver interface the link consumes
//! - [`socket`] — driver ownership, reader/writer tasks, broadcast registry
//! - [`facade`] — typed value setters for user code
//! - [`stats`] — per-socket link counters
//! - [`error`] — error kinds

pub mod buffer;
pub mod checksum;
pub mod codec;
pub mod driver;
pub mod error;
pub mod facade;
pub mod framing;
pub mod pending;
pub mod queue;
pub mod reader;
pub mod socket;
pub mod stats;
pub mod table;
pub mod wire;

pub use driver::SerialDriver;
pub use error::{LinkError, Result};
pub use socket::{FetchInterval, Socket, SocketConfig};
pub use wire::{Packet, PacketBody, PacketKind, TypedValue};

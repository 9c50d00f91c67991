//! # Link Errors
//!
//! Error kinds surfaced by the link core. Only [`LinkError::QueueFull`] ever
//! reaches user code; the remaining kinds are logged at their point of origin
//! and swallowed by the owning task.

use thiserror::Error;

/// Errors produced by the link core.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Enqueue attempted on a full write queue.
    #[error("write queue is full")]
    QueueFull,

    /// Malformed payload, unknown kind, bad sub-kind, or checksum mismatch.
    /// Dropped by the read pipeline after logging.
    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    /// The serial driver reported a read or write failure.
    #[error("serial driver I/O failure")]
    Io,

    /// A pending packet exhausted its retry budget without an acknowledgement.
    #[error("packet {seq_id} dropped after {retries} retries")]
    MaxRetriesExceeded { seq_id: u8, retries: u8 },
}

pub type Result<T> = std::result::Result<T, LinkError>;

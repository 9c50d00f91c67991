//! # Serial Driver Interface
//!
//! The two-method byte interface the link consumes. Radio links, wired UART,
//! and USB serial channels all conform; the core assumes no delivery or
//! ordering guarantees from any of them.

use bytes::BytesMut;

/// A byte-stream transport the link reads from and writes to.
///
/// Implementations may block for short, bounded periods in either call.
pub trait SerialDriver: Send {
    /// Transmit the whole buffer. Returns `false` on failure.
    fn write(&mut self, buf: &[u8]) -> bool;

    /// Append whatever bytes are available to `buf`. Returns the byte count,
    /// or a negative value on error.
    fn read(&mut self, buf: &mut BytesMut) -> i32;
}

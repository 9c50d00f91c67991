//! # Sequential Byte Reader / Writer
//!
//! Thin cursors over [`bytes::BytesMut`] for the wire format's fixed-width
//! integers (little- and big-endian), IEEE floats, raw byte runs, and
//! length-prefixed strings.
//!
//! Reads past the end of the buffer never fail: scalars come back as zero,
//! strings and byte runs are truncated to what remains. Integrity is the
//! checksum's job — the codec layer decides whether a truncated read matters.

use bytes::{BufMut, Bytes, BytesMut};

// ─── Writer ─────────────────────────────────────────────────────────────────

/// Appends values sequentially to a growable buffer.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: BytesMut,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ByteWriter {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Current write position. Always equals the buffer size.
    pub fn offset(&self) -> usize {
        self.buf.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> BytesMut {
        self.buf
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_u16_le(&mut self, value: u16) {
        self.buf.put_u16_le(value);
    }

    pub fn write_u16_be(&mut self, value: u16) {
        self.buf.put_u16(value);
    }

    pub fn write_f32_be(&mut self, value: f32) {
        self.buf.put_f32(value);
    }

    pub fn write_f32_le(&mut self, value: f32) {
        self.buf.put_f32_le(value);
    }

    pub fn write_f64_be(&mut self, value: f64) {
        self.buf.put_f64(value);
    }

    pub fn write_f64_le(&mut self, value: f64) {
        self.buf.put_f64_le(value);
    }

    /// Write the first `len` bytes of `bytes`, clamping `len` to the slice
    /// length.
    pub fn write_bytes(&mut self, bytes: &[u8], len: usize) {
        let len = len.min(bytes.len());
        self.buf.extend_from_slice(&bytes[..len]);
    }

    /// Write a 1-byte length prefix (clamped to 255) followed by the string
    /// bytes.
    pub fn write_string8(&mut self, value: &str) {
        let bytes = value.as_bytes();
        let len = bytes.len().min(u8::MAX as usize);
        self.buf.put_u8(len as u8);
        self.buf.extend_from_slice(&bytes[..len]);
    }

    /// Write a 2-byte big-endian length prefix (clamped to 65535) followed by
    /// the string bytes.
    pub fn write_string16(&mut self, value: &str) {
        let bytes = value.as_bytes();
        let len = bytes.len().min(u16::MAX as usize);
        self.buf.put_u16(len as u16);
        self.buf.extend_from_slice(&bytes[..len]);
    }
}

// ─── Reader ─────────────────────────────────────────────────────────────────

/// Reads values sequentially from a byte slice.
#[derive(Debug)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ByteReader { buf, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// Number of bytes left to read.
    pub fn bytes_available(&self) -> usize {
        self.buf.len().saturating_sub(self.offset)
    }

    pub fn has_data(&self) -> bool {
        self.offset < self.buf.len()
    }

    pub fn read_u8(&mut self) -> u8 {
        if self.offset >= self.buf.len() {
            return 0;
        }
        let value = self.buf[self.offset];
        self.offset += 1;
        value
    }

    pub fn read_u16_le(&mut self) -> u16 {
        let mut value = u16::from(self.read_u8());
        value |= u16::from(self.read_u8()) << 8;
        value
    }

    pub fn read_u16_be(&mut self) -> u16 {
        let mut value = u16::from(self.read_u8()) << 8;
        value |= u16::from(self.read_u8());
        value
    }

    pub fn read_f32_be(&mut self) -> f32 {
        let mut bits = 0u32;
        for _ in 0..4 {
            bits = (bits << 8) | u32::from(self.read_u8());
        }
        f32::from_bits(bits)
    }

    pub fn read_f32_le(&mut self) -> f32 {
        let mut bits = 0u32;
        for shift in 0..4 {
            bits |= u32::from(self.read_u8()) << (8 * shift);
        }
        f32::from_bits(bits)
    }

    pub fn read_f64_be(&mut self) -> f64 {
        let mut bits = 0u64;
        for _ in 0..8 {
            bits = (bits << 8) | u64::from(self.read_u8());
        }
        f64::from_bits(bits)
    }

    pub fn read_f64_le(&mut self) -> f64 {
        let mut bits = 0u64;
        for shift in 0..8 {
            bits |= u64::from(self.read_u8()) << (8 * shift);
        }
        f64::from_bits(bits)
    }

    /// Copy the next `len` bytes, truncated to what remains.
    pub fn read_bytes(&mut self, len: usize) -> Bytes {
        let len = len.min(self.bytes_available());
        let mut out = BytesMut::with_capacity(len);
        out.extend_from_slice(&self.buf[self.offset..self.offset + len]);
        self.offset += len;
        out.freeze()
    }

    /// Read a 1-byte length prefix followed by that many string bytes,
    /// truncated to what remains.
    pub fn read_string8(&mut self) -> String {
        let len = usize::from(self.read_u8());
        let raw = self.read_bytes(len);
        String::from_utf8_lossy(&raw).into_owned()
    }

    /// Read a 2-byte big-endian length prefix followed by that many string
    /// bytes, truncated to what remains.
    pub fn read_string16(&mut self) -> String {
        let len = usize::from(self.read_u16_be());
        let raw = self.read_bytes(len);
        String::from_utf8_lossy(&raw).into_owned()
    }
}

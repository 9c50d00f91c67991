//! # Packet Codec
//!
//! Serialization and deserialization for every [`PacketKind`], plus full-frame
//! assembly: header, checksum, and sentinel stuffing.
//!
//! The codec table is a match over the discriminant — exactly one serializer
//! and one deserializer per kind. Payload integers are big-endian unless the
//! layout says otherwise.
//!
//! ## Payload layouts
//!
//! ```text
//! Reset / Ping / FetchValues / GenericAck / GenericNack    (empty)
//! AssignLabel        u16 value_id, string8 label
//! Log                string16 message
//! UpdateBool         u16 value_id, u8 (0/1)
//! UpdateInt          u16 value_id, u16 value (i32 clamped on the wire)
//! UpdateFloat        u16 value_id, f32 BE
//! UpdateDouble       u16 value_id, f64 BE
//! UpdateString       u16 value_id, string16 value
//! Update*Array       u16 value_id, u16 count, then count scalar payloads
//! Batch              u8 sub_kind, then { u8 len, len bytes }* to end
//! ```

use bytes::BytesMut;

use crate::buffer::{ByteReader, ByteWriter};
use crate::checksum;
use crate::error::{LinkError, Result};
use crate::framing;
use crate::wire::{EncodedPacket, Packet, PacketBody, PacketKind};

/// Frame header size: kind + seq_id + payload_size.
pub const HEADER_SIZE: usize = 4;

/// Hard cap on a packet's body bytes — the payload_size field is a u16.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Maximum sub-packets carried by one batch.
pub const MAX_BATCH_SUB_PACKETS: usize = 20;

/// Maximum bytes in one batch sub-payload — the length prefix is a u8.
pub const MAX_BATCH_SUB_PAYLOAD: usize = u8::MAX as usize;

// ─── Body Serialization ─────────────────────────────────────────────────────

/// Serialize a packet body to its payload bytes.
pub fn serialize_body(body: &PacketBody) -> Result<BytesMut> {
    let mut w = ByteWriter::new();
    match body {
        PacketBody::Reset
        | PacketBody::Ping
        | PacketBody::FetchValues
        | PacketBody::GenericAck
        | PacketBody::GenericNack => {}
        PacketBody::AssignLabel { value_id, label } => {
            w.write_u16_be(*value_id);
            w.write_string8(label);
        }
        PacketBody::Log { message } => {
            w.write_string16(message);
        }
        PacketBody::UpdateBool { value_id, value } => {
            w.write_u16_be(*value_id);
            w.write_u8(u8::from(*value));
        }
        PacketBody::UpdateInt { value_id, value } => {
            w.write_u16_be(*value_id);
            w.write_u16_be(clamp_int(*value));
        }
        PacketBody::UpdateFloat { value_id, value } => {
            w.write_u16_be(*value_id);
            w.write_f32_be(*value);
        }
        PacketBody::UpdateDouble { value_id, value } => {
            w.write_u16_be(*value_id);
            w.write_f64_be(*value);
        }
        PacketBody::UpdateString { value_id, value } => {
            w.write_u16_be(*value_id);
            w.write_string16(value);
        }
        PacketBody::UpdateBoolArray { value_id, values } => {
            write_array_header(&mut w, *value_id, values.len());
            for &v in values.iter().take(MAX_PAYLOAD_LEN) {
                w.write_u8(u8::from(v));
            }
        }
        PacketBody::UpdateIntArray { value_id, values } => {
            write_array_header(&mut w, *value_id, values.len());
            for &v in values.iter().take(MAX_PAYLOAD_LEN) {
                w.write_u16_be(clamp_int(v));
            }
        }
        PacketBody::UpdateFloatArray { value_id, values } => {
            write_array_header(&mut w, *value_id, values.len());
            for &v in values.iter().take(MAX_PAYLOAD_LEN) {
                w.write_f32_be(v);
            }
        }
        PacketBody::UpdateDoubleArray { value_id, values } => {
            write_array_header(&mut w, *value_id, values.len());
            for &v in values.iter().take(MAX_PAYLOAD_LEN) {
                w.write_f64_be(v);
            }
        }
        PacketBody::Batch {
            sub_kind,
            sub_bodies,
        } => {
            serialize_batch(&mut w, *sub_kind, sub_bodies)?;
        }
    }
    Ok(w.into_bytes())
}

/// The wire carries 16 bits for integer updates; user-facing values are i32.
fn clamp_int(value: i32) -> u16 {
    value.clamp(0, i32::from(u16::MAX)) as u16
}

fn write_array_header(w: &mut ByteWriter, value_id: u16, len: usize) {
    w.write_u16_be(value_id);
    w.write_u16_be(len.min(MAX_PAYLOAD_LEN) as u16);
}

fn serialize_batch(
    w: &mut ByteWriter,
    sub_kind: PacketKind,
    sub_bodies: &[PacketBody],
) -> Result<()> {
    if matches!(sub_kind, PacketKind::Batch | PacketKind::Unknown) {
        return Err(LinkError::InvalidPacket(format!(
            "batch cannot carry sub-kind {sub_kind:?}"
        )));
    }
    if sub_bodies.len() > MAX_BATCH_SUB_PACKETS {
        return Err(LinkError::InvalidPacket(format!(
            "batch holds {} sub-packets, limit is {MAX_BATCH_SUB_PACKETS}",
            sub_bodies.len()
        )));
    }

    w.write_u8(sub_kind as u8);
    for sub in sub_bodies {
        if sub.kind() != sub_kind {
            return Err(LinkError::InvalidPacket(format!(
                "batch of {sub_kind:?} contains a {:?} body",
                sub.kind()
            )));
        }
        let sub_payload = serialize_body(sub)?;
        if sub_payload.len() > MAX_BATCH_SUB_PAYLOAD {
            return Err(LinkError::InvalidPacket(format!(
                "batch sub-payload is {} bytes, limit is {MAX_BATCH_SUB_PAYLOAD}",
                sub_payload.len()
            )));
        }
        w.write_u8(sub_payload.len() as u8);
        w.write_bytes(&sub_payload, sub_payload.len());
    }
    Ok(())
}

// ─── Body Deserialization ───────────────────────────────────────────────────

/// Deserialize a payload into the body shape named by `kind`.
///
/// Truncated scalar fields read as zero — the frame checksum has already
/// vouched for the bytes, so a short payload here is a peer layout mismatch,
/// not line noise. Batches are the exception: their internal structure is
/// validated strictly.
pub fn deserialize_body(kind: PacketKind, payload: &[u8]) -> Result<PacketBody> {
    let mut r = ByteReader::new(payload);
    let body = match kind {
        PacketKind::Unknown => {
            return Err(LinkError::InvalidPacket(
                "no codec for kind 0x00".to_string(),
            ))
        }
        PacketKind::Reset => PacketBody::Reset,
        PacketKind::Ping => PacketBody::Ping,
        PacketKind::FetchValues => PacketBody::FetchValues,
        PacketKind::GenericAck => PacketBody::GenericAck,
        PacketKind::GenericNack => PacketBody::GenericNack,
        PacketKind::AssignLabel => PacketBody::AssignLabel {
            value_id: r.read_u16_be(),
            label: r.read_string8(),
        },
        PacketKind::Log => PacketBody::Log {
            message: r.read_string16(),
        },
        PacketKind::UpdateBool => PacketBody::UpdateBool {
            value_id: r.read_u16_be(),
            value: r.read_u8() != 0,
        },
        PacketKind::UpdateInt => PacketBody::UpdateInt {
            value_id: r.read_u16_be(),
            value: i32::from(r.read_u16_be()),
        },
        PacketKind::UpdateFloat => PacketBody::UpdateFloat {
            value_id: r.read_u16_be(),
            value: r.read_f32_be(),
        },
        PacketKind::UpdateDouble => PacketBody::UpdateDouble {
            value_id: r.read_u16_be(),
            value: r.read_f64_be(),
        },
        PacketKind::UpdateString => PacketBody::UpdateString {
            value_id: r.read_u16_be(),
            value: r.read_string16(),
        },
        PacketKind::UpdateBoolArray => {
            let (value_id, count) = read_array_header(&mut r);
            PacketBody::UpdateBoolArray {
                value_id,
                values: (0..count).map(|_| r.read_u8() != 0).collect(),
            }
        }
        PacketKind::UpdateIntArray => {
            let (value_id, count) = read_array_header(&mut r);
            PacketBody::UpdateIntArray {
                value_id,
                values: (0..count).map(|_| i32::from(r.read_u16_be())).collect(),
            }
        }
        PacketKind::UpdateFloatArray => {
            let (value_id, count) = read_array_header(&mut r);
            PacketBody::UpdateFloatArray {
                value_id,
                values: (0..count).map(|_| r.read_f32_be()).collect(),
            }
        }
        PacketKind::UpdateDoubleArray => {
            let (value_id, count) = read_array_header(&mut r);
            PacketBody::UpdateDoubleArray {
                value_id,
                values: (0..count).map(|_| r.read_f64_be()).collect(),
            }
        }
        PacketKind::Batch => deserialize_batch(&mut r)?,
    };
    Ok(body)
}

fn read_array_header(r: &mut ByteReader<'_>) -> (u16, usize) {
    let value_id = r.read_u16_be();
    let count = usize::from(r.read_u16_be());
    (value_id, count)
}

fn deserialize_batch(r: &mut ByteReader<'_>) -> Result<PacketBody> {
    let sub_byte = r.read_u8();
    let sub_kind = PacketKind::from_byte(sub_byte)
        .filter(|k| !matches!(k, PacketKind::Batch | PacketKind::Unknown))
        .ok_or_else(|| LinkError::InvalidPacket(format!("bad batch sub-kind 0x{sub_byte:02X}")))?;

    let mut sub_bodies = Vec::new();
    while r.has_data() {
        if sub_bodies.len() == MAX_BATCH_SUB_PACKETS {
            return Err(LinkError::InvalidPacket(format!(
                "batch exceeds {MAX_BATCH_SUB_PACKETS} sub-packets"
            )));
        }
        let len = usize::from(r.read_u8());
        if len > r.bytes_available() {
            return Err(LinkError::InvalidPacket(format!(
                "batch sub-payload of {len} bytes over-runs the packet"
            )));
        }
        let sub_payload = r.read_bytes(len);
        sub_bodies.push(deserialize_body(sub_kind, &sub_payload)?);
    }
    Ok(PacketBody::Batch {
        sub_kind,
        sub_bodies,
    })
}

// ─── Frame Assembly ─────────────────────────────────────────────────────────

/// Serialize a packet into its payload form without framing.
pub fn serialize(packet: &Packet) -> Result<EncodedPacket> {
    let payload = serialize_body(&packet.body)?;
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(LinkError::InvalidPacket(format!(
            "payload of {} bytes exceeds the {MAX_PAYLOAD_LEN}-byte frame limit",
            payload.len()
        )));
    }
    Ok(EncodedPacket {
        kind: packet.kind(),
        seq_id: packet.seq_id,
        payload,
    })
}

/// Encode a packet into a complete stuffed frame ready for the driver.
pub fn encode(packet: &Packet) -> Result<BytesMut> {
    let encoded = serialize(packet)?;

    let mut w = ByteWriter::with_capacity(HEADER_SIZE + encoded.payload.len() + 1);
    w.write_u8(encoded.kind as u8);
    w.write_u8(encoded.seq_id);
    w.write_u16_be(encoded.payload.len() as u16);
    w.write_bytes(&encoded.payload, encoded.payload.len());

    let sum = checksum::sum8(w.as_slice(), w.offset())?;
    w.write_u8(sum);

    Ok(framing::stuff(w.as_slice()))
}

/// Decode one stuffed frame into a packet.
///
/// Unstuffs, verifies the checksum over header + payload, then dispatches the
/// payload to the kind's deserializer.
pub fn decode(frame: &[u8]) -> Result<Packet> {
    let unstuffed = framing::unstuff(frame);
    let mut r = ByteReader::new(&unstuffed);

    let kind_byte = r.read_u8();
    let seq_id = r.read_u8();
    let payload_len = usize::from(r.read_u16_be());
    let payload = r.read_bytes(payload_len);
    let expected = r.read_u8();

    let actual = checksum::sum8(&unstuffed, HEADER_SIZE + payload_len)?;
    if expected != actual {
        return Err(LinkError::InvalidPacket(format!(
            "checksum mismatch on packet {seq_id}: expected 0x{expected:02X}, computed 0x{actual:02X}"
        )));
    }

    let kind = PacketKind::from_byte(kind_byte)
        .ok_or_else(|| LinkError::InvalidPacket(format!("unknown packet kind 0x{kind_byte:02X}")))?;
    let body = deserialize_body(kind, &payload)?;
    Ok(Packet { seq_id, body })
}

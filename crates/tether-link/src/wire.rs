//! # Packet Kinds and Bodies
//!
//! The closed set of packet kinds carried by the link, the decoded body sum
//! type, and the typed value mirror stored in the value table.
//!
//! ## Frame layout
//!
//! ```text
//! START (0xAA)
//! kind          1 byte
//! seq_id        1 byte
//! payload_size  2 bytes, big-endian
//! payload       payload_size bytes
//! checksum      1 byte, additive sum over header + payload
//! END (0x00)
//! ```
//!
//! with ESCAPE (0x92) stuffing applied to everything between the delimiters.

use bytes::BytesMut;

// ─── Packet Kind ────────────────────────────────────────────────────────────

/// One-byte wire discriminant naming a packet's body shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    Unknown = 0x00,
    Reset = 0x01,
    AssignLabel = 0x02,
    FetchValues = 0x03,
    Log = 0x04,
    Ping = 0x05,
    GenericAck = 0x06,
    GenericNack = 0x07,

    UpdateBool = 0x21,
    UpdateInt = 0x22,
    UpdateFloat = 0x23,
    UpdateDouble = 0x24,
    UpdateString = 0x25,

    UpdateBoolArray = 0x31,
    UpdateIntArray = 0x32,
    UpdateFloatArray = 0x33,
    UpdateDoubleArray = 0x34,

    Batch = 0xFF,
}

impl PacketKind {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(PacketKind::Unknown),
            0x01 => Some(PacketKind::Reset),
            0x02 => Some(PacketKind::AssignLabel),
            0x03 => Some(PacketKind::FetchValues),
            0x04 => Some(PacketKind::Log),
            0x05 => Some(PacketKind::Ping),
            0x06 => Some(PacketKind::GenericAck),
            0x07 => Some(PacketKind::GenericNack),
            0x21 => Some(PacketKind::UpdateBool),
            0x22 => Some(PacketKind::UpdateInt),
            0x23 => Some(PacketKind::UpdateFloat),
            0x24 => Some(PacketKind::UpdateDouble),
            0x25 => Some(PacketKind::UpdateString),
            0x31 => Some(PacketKind::UpdateBoolArray),
            0x32 => Some(PacketKind::UpdateIntArray),
            0x33 => Some(PacketKind::UpdateFloatArray),
            0x34 => Some(PacketKind::UpdateDoubleArray),
            0xFF => Some(PacketKind::Batch),
            _ => None,
        }
    }

    /// Whether this kind carries a value update (scalar or array).
    pub fn is_update(self) -> bool {
        matches!(
            self,
            PacketKind::UpdateBool
                | PacketKind::UpdateInt
                | PacketKind::UpdateFloat
                | PacketKind::UpdateDouble
                | PacketKind::UpdateString
                | PacketKind::UpdateBoolArray
                | PacketKind::UpdateIntArray
                | PacketKind::UpdateFloatArray
                | PacketKind::UpdateDoubleArray
        )
    }

    /// Whether a sent packet of this kind is tracked on the pending list
    /// until the peer acknowledges it.
    ///
    /// Acks, nacks, pings, and fetch requests are fire-and-forget: acking an
    /// ack would ping-pong forever, and ping/fetch are periodic anyway.
    pub fn requires_ack(self) -> bool {
        !matches!(
            self,
            PacketKind::GenericAck
                | PacketKind::GenericNack
                | PacketKind::Ping
                | PacketKind::FetchValues
                | PacketKind::Unknown
        )
    }
}

// ─── Typed Value ────────────────────────────────────────────────────────────

/// Current value of one telemetry entry, mirroring the update packet kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
    Str(String),
    BoolArray(Vec<bool>),
    IntArray(Vec<i32>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
}

// ─── Packet Body ────────────────────────────────────────────────────────────

/// Decoded packet body — one variant per wire kind.
#[derive(Debug, Clone, PartialEq)]
pub enum PacketBody {
    Reset,
    Ping,
    FetchValues,
    GenericAck,
    GenericNack,
    AssignLabel { value_id: u16, label: String },
    Log { message: String },
    UpdateBool { value_id: u16, value: bool },
    UpdateInt { value_id: u16, value: i32 },
    UpdateFloat { value_id: u16, value: f32 },
    UpdateDouble { value_id: u16, value: f64 },
    UpdateString { value_id: u16, value: String },
    UpdateBoolArray { value_id: u16, values: Vec<bool> },
    UpdateIntArray { value_id: u16, values: Vec<i32> },
    UpdateFloatArray { value_id: u16, values: Vec<f32> },
    UpdateDoubleArray { value_id: u16, values: Vec<f64> },
    Batch { sub_kind: PacketKind, sub_bodies: Vec<PacketBody> },
}

impl PacketBody {
    /// The wire discriminant for this body.
    pub fn kind(&self) -> PacketKind {
        match self {
            PacketBody::Reset => PacketKind::Reset,
            PacketBody::Ping => PacketKind::Ping,
            PacketBody::FetchValues => PacketKind::FetchValues,
            PacketBody::GenericAck => PacketKind::GenericAck,
            PacketBody::GenericNack => PacketKind::GenericNack,
            PacketBody::AssignLabel { .. } => PacketKind::AssignLabel,
            PacketBody::Log { .. } => PacketKind::Log,
            PacketBody::UpdateBool { .. } => PacketKind::UpdateBool,
            PacketBody::UpdateInt { .. } => PacketKind::UpdateInt,
            PacketBody::UpdateFloat { .. } => PacketKind::UpdateFloat,
            PacketBody::UpdateDouble { .. } => PacketKind::UpdateDouble,
            PacketBody::UpdateString { .. } => PacketKind::UpdateString,
            PacketBody::UpdateBoolArray { .. } => PacketKind::UpdateBoolArray,
            PacketBody::UpdateIntArray { .. } => PacketKind::UpdateIntArray,
            PacketBody::UpdateFloatArray { .. } => PacketKind::UpdateFloatArray,
            PacketBody::UpdateDoubleArray { .. } => PacketKind::UpdateDoubleArray,
            PacketBody::Batch { .. } => PacketKind::Batch,
        }
    }

    /// The target value ID, for bodies addressing one.
    pub fn value_id(&self) -> Option<u16> {
        match self {
            PacketBody::AssignLabel { value_id, .. }
            | PacketBody::UpdateBool { value_id, .. }
            | PacketBody::UpdateInt { value_id, .. }
            | PacketBody::UpdateFloat { value_id, .. }
            | PacketBody::UpdateDouble { value_id, .. }
            | PacketBody::UpdateString { value_id, .. }
            | PacketBody::UpdateBoolArray { value_id, .. }
            | PacketBody::UpdateIntArray { value_id, .. }
            | PacketBody::UpdateFloatArray { value_id, .. }
            | PacketBody::UpdateDoubleArray { value_id, .. } => Some(*value_id),
            _ => None,
        }
    }

    /// The carried value as a [`TypedValue`], for update bodies.
    pub fn typed_value(&self) -> Option<TypedValue> {
        match self {
            PacketBody::UpdateBool { value, .. } => Some(TypedValue::Bool(*value)),
            PacketBody::UpdateInt { value, .. } => Some(TypedValue::Int(*value)),
            PacketBody::UpdateFloat { value, .. } => Some(TypedValue::Float(*value)),
            PacketBody::UpdateDouble { value, .. } => Some(TypedValue::Double(*value)),
            PacketBody::UpdateString { value, .. } => Some(TypedValue::Str(value.clone())),
            PacketBody::UpdateBoolArray { values, .. } => {
                Some(TypedValue::BoolArray(values.clone()))
            }
            PacketBody::UpdateIntArray { values, .. } => Some(TypedValue::IntArray(values.clone())),
            PacketBody::UpdateFloatArray { values, .. } => {
                Some(TypedValue::FloatArray(values.clone()))
            }
            PacketBody::UpdateDoubleArray { values, .. } => {
                Some(TypedValue::DoubleArray(values.clone()))
            }
            _ => None,
        }
    }
}

// ─── Packets ────────────────────────────────────────────────────────────────

/// A decoded packet: sequence ID plus typed body. The kind is implied by the
/// body variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Rolling 8-bit sequence ID, assigned by the sender just before
    /// transmission. Acks name their target through it.
    pub seq_id: u8,
    pub body: PacketBody,
}

impl Packet {
    /// A packet awaiting sequence assignment by the write pipeline.
    pub fn new(body: PacketBody) -> Self {
        Packet { seq_id: 0, body }
    }

    pub fn with_seq(seq_id: u8, body: PacketBody) -> Self {
        Packet { seq_id, body }
    }

    pub fn kind(&self) -> PacketKind {
        self.body.kind()
    }
}

/// A serialized packet: discriminant, sequence ID, and body bytes. The kind
/// and sequence ID travel in the frame header, not the payload.
#[derive(Debug, Clone)]
pub struct EncodedPacket {
    pub kind: PacketKind,
    pub seq_id: u8,
    pub payload: BytesMut,
}

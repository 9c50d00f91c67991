//! # Value Facade
//!
//! Typed entry points for user code: label an ID, push a value, read back the
//! peer's latest. Each setter builds the matching packet and broadcasts it to
//! every open socket; coalescing in the write queues keeps rapid-fire calls
//! cheap.

use crate::socket::Socket;
use crate::table;
use crate::wire::{PacketBody, TypedValue};

/// Attach a human-readable label to a value ID on the peer.
pub fn assign_label(value_id: u16, label: &str) {
    Socket::broadcast(&PacketBody::AssignLabel {
        value_id,
        label: label.to_owned(),
    });
}

pub fn update_bool(value_id: u16, value: bool) {
    Socket::broadcast(&PacketBody::UpdateBool { value_id, value });
}

pub fn update_int(value_id: u16, value: i32) {
    Socket::broadcast(&PacketBody::UpdateInt { value_id, value });
}

pub fn update_float(value_id: u16, value: f32) {
    Socket::broadcast(&PacketBody::UpdateFloat { value_id, value });
}

pub fn update_double(value_id: u16, value: f64) {
    Socket::broadcast(&PacketBody::UpdateDouble { value_id, value });
}

pub fn update_string(value_id: u16, value: &str) {
    Socket::broadcast(&PacketBody::UpdateString {
        value_id,
        value: value.to_owned(),
    });
}

pub fn update_bool_array(value_id: u16, values: Vec<bool>) {
    Socket::broadcast(&PacketBody::UpdateBoolArray { value_id, values });
}

pub fn update_int_array(value_id: u16, values: Vec<i32>) {
    Socket::broadcast(&PacketBody::UpdateIntArray { value_id, values });
}

pub fn update_float_array(value_id: u16, values: Vec<f32>) {
    Socket::broadcast(&PacketBody::UpdateFloatArray { value_id, values });
}

pub fn update_double_array(value_id: u16, values: Vec<f64>) {
    Socket::broadcast(&PacketBody::UpdateDoubleArray { value_id, values });
}

/// Ship a log line to the peer.
pub fn log(message: &str) {
    Socket::broadcast(&PacketBody::Log {
        message: message.to_owned(),
    });
}

/// Ask the peer to clear everything it has cached about this program.
pub fn reset() {
    Socket::broadcast(&PacketBody::Reset);
}

/// Latest value received from the peer for `value_id`, if any.
pub fn value(value_id: u16) -> Option<TypedValue> {
    table::get(value_id)
}

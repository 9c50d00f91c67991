//! # Value Table
//!
//! Process-wide map from 16-bit value ID to the latest received
//! [`TypedValue`]. The inbound dispatcher is the only writer; user code reads.
//!
//! Writes replace prior values regardless of type — last writer wins. The
//! facade above the link guarantees type stability per ID, so a type change
//! here means the peer re-purposed the ID on purpose.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use crate::wire::TypedValue;

static TABLE: OnceLock<Mutex<HashMap<u16, TypedValue>>> = OnceLock::new();

fn table() -> &'static Mutex<HashMap<u16, TypedValue>> {
    TABLE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Store the latest value for `value_id`, replacing any prior entry.
pub fn set(value_id: u16, value: TypedValue) {
    table().lock().unwrap().insert(value_id, value);
}

/// Latest received value for `value_id`, if any.
pub fn get(value_id: u16) -> Option<TypedValue> {
    table().lock().unwrap().get(&value_id).cloned()
}

/// Remove every entry.
pub fn clear() {
    table().lock().unwrap().clear();
}

/// Number of IDs with a stored value.
pub fn len() -> usize {
    table().lock().unwrap().len()
}

pub fn is_empty() -> bool {
    len() == 0
}

//! Key layout inside a queue partition.
//!
//! Message keys are the 8-byte big-endian id, so lexicographic order is id
//! order. Meta keys live in a disjoint region: an 8-byte `0xFF` prefix followed
//! by the counter name. They are strictly longer than a message key and sort
//! after every message key, `u64::MAX` included, so a scan bounded by
//! [`message_range`] never sees them.

use std::ops::RangeInclusive;

use crate::{Error, Result};

/// Width of an encoded message id.
pub const ID_LEN: usize = 8;

/// First id ever assigned in a namespace.
pub const FIRST_ID: u64 = 1;

const META_PREFIX: [u8; ID_LEN] = [0xFF; ID_LEN];

pub fn message_key(id: u64) -> [u8; ID_LEN] {
    id.to_be_bytes()
}

pub fn message_id(key: &[u8]) -> Result<u64> {
    let bytes: [u8; ID_LEN] = key
        .try_into()
        .map_err(|_| Error::CorruptKey { len: key.len() })?;
    Ok(u64::from_be_bytes(bytes))
}

/// Inclusive key range covering every message id at or after `start`.
pub fn message_range(start: u64) -> RangeInclusive<[u8; ID_LEN]> {
    message_key(start.max(FIRST_ID))..=message_key(u64::MAX)
}

pub fn meta_key(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(ID_LEN + name.len());
    key.extend_from_slice(&META_PREFIX);
    key.extend_from_slice(name.as_bytes());
    key
}

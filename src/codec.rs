//! Typed convenience wrappers over the byte-payload queue API.
//!
//! A record is consumed by the dequeue before it is decoded, so a payload
//! that fails to decode is gone from the queue once the error is returned.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::queue::Queue;
use crate::Result;

pub fn enqueue_json<T: Serialize + ?Sized>(queue: &Queue, value: &T) -> Result<u64> {
    let payload = serde_json::to_vec(value)?;
    queue.enqueue(&payload)
}

pub fn dequeue_json<T: DeserializeOwned>(
    queue: &Queue,
    start: Option<u64>,
) -> Result<Option<(u64, T)>> {
    let Some(message) = queue.dequeue(start)? else {
        return Ok(None);
    };
    match serde_json::from_slice(&message.payload) {
        Ok(value) => Ok(Some((message.id, value))),
        Err(err) => {
            log::warn!("[{}] failed to decode json id={}: {err}", queue.name(), message.id);
            Err(err.into())
        }
    }
}

pub fn enqueue_str(queue: &Queue, value: &str) -> Result<u64> {
    queue.enqueue(value.as_bytes())
}

pub fn dequeue_string(queue: &Queue, start: Option<u64>) -> Result<Option<(u64, String)>> {
    let Some(message) = queue.dequeue(start)? else {
        return Ok(None);
    };
    Ok(Some((message.id, String::from_utf8(message.payload)?)))
}

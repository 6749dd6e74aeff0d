//! Durable named FIFO queues multiplexed over one embedded LSM keyspace.
//!
//! Each queue is an isolated partition holding its messages under 8-byte
//! big-endian ids plus two meta-counters. Enqueue and dequeue are single
//! atomic transactions; a dequeued message is deleted by the same
//! transaction that returns it, giving at-least-once, strictly ordered
//! delivery per queue.
//!
//! ```no_run
//! use lsmq::{Store, StoreConfig};
//!
//! # fn main() -> lsmq::Result<()> {
//! let store = Store::open(StoreConfig::new("/var/lib/lsmq"))?;
//! let orders = store.queue("orders")?;
//! let id = orders.enqueue(b"A")?;
//! if let Some(message) = orders.dequeue_next()? {
//!     assert_eq!(message.id, id);
//! }
//! store.close()?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod counter;
pub mod cursor;
pub mod error;
pub mod key;
pub mod queue;
pub mod store;

pub use config::{Compression, Durability, StoreConfig};
pub use cursor::Cursor;
pub use error::{Error, Result};
pub use queue::{Message, Queue, QueueStats};
pub use store::Store;

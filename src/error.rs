use std::path::PathBuf;

/// Errors surfaced by the store and its queues.
///
/// An empty queue is not an error: dequeue operations report it as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("engine error: {0}")]
    Engine(#[from] fjall::Error),
    #[error("failed to open store at {}: {source}", directory.display())]
    Open {
        directory: PathBuf,
        #[source]
        source: fjall::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid queue name: {0:?}")]
    InvalidQueueName(String),
    #[error("corrupt {counter} counter: expected 8 bytes, found {len}")]
    CorruptCounter { counter: &'static str, len: usize },
    #[error("corrupt message key: expected 8 bytes, found {len}")]
    CorruptKey { len: usize },
    #[error("queue {0:?} is closed")]
    Closed(String),
    #[error("message id space exhausted")]
    IdExhausted,
    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("payload is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// True for corrupt on-disk contents, as opposed to engine or usage failures.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::CorruptCounter { .. } | Error::CorruptKey { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! Store configuration.
//!
//! Options consumed once when the store opens: storage directory, memory
//! budgets, write durability, compaction and cursor toggles, parallelism and
//! debug logging.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Block cache size used when `memory_size` is zero (8 MB).
pub const DEFAULT_MEMORY_SIZE: u64 = 8 * 1024 * 1024;
/// Write buffer budget used when `write_buffer_size` is zero (64 MB).
pub const DEFAULT_WRITE_BUFFER_SIZE: u64 = 64 * 1024 * 1024;
/// Memtable size used when `max_memtable_size` is zero (16 MB).
pub const DEFAULT_MAX_MEMTABLE_SIZE: u32 = 16 * 1024 * 1024;

/// How commits reach stable storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// Every commit is fsynced before it returns.
    Sync,
    /// Commits are journaled; fsync is left to the engine.
    #[default]
    Buffered,
    /// The journal is only persisted by an explicit `Store::persist` or on close.
    NoLog,
}

/// Block compression for queue partitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    None,
    #[default]
    Lz4,
}

impl From<Compression> for fjall::CompressionType {
    fn from(value: Compression) -> Self {
        match value {
            Compression::None => fjall::CompressionType::None,
            Compression::Lz4 => fjall::CompressionType::Lz4,
        }
    }
}

/// Configuration for a [`Store`](crate::Store).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the engine files. Created if missing.
    pub directory: PathBuf,

    /// Block cache size in bytes.
    /// Default: 8 MB
    pub memory_size: u64,

    /// Keyspace-wide write buffer budget in bytes.
    /// Default: 64 MB
    pub write_buffer_size: u64,

    /// Per-queue memtable size in bytes.
    /// Default: 16 MB
    pub max_memtable_size: u32,

    /// Default: buffered
    pub durability: Durability,

    /// Default: lz4
    pub compression: Compression,

    /// Stop background compaction. Writes stall once level 0 fills up.
    /// Default: false
    pub disable_auto_compaction: bool,

    /// Keep a persistent forward cursor per queue for `dequeue_next`.
    /// Default: true
    pub use_cursor: bool,

    /// Flush and compaction worker count. Zero means one per CPU.
    pub parallelism: usize,

    /// Emit per-message debug logs.
    /// Default: false
    pub debug: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::new(),
            memory_size: DEFAULT_MEMORY_SIZE,
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            max_memtable_size: DEFAULT_MAX_MEMTABLE_SIZE,
            durability: Durability::default(),
            compression: Compression::default(),
            disable_auto_compaction: false,
            use_cursor: true,
            parallelism: 0,
            debug: false,
        }
    }
}

impl StoreConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn memory_size(mut self, bytes: u64) -> Self {
        self.memory_size = bytes;
        self
    }

    pub fn write_buffer_size(mut self, bytes: u64) -> Self {
        self.write_buffer_size = bytes;
        self
    }

    pub fn durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn disable_auto_compaction(mut self, disable: bool) -> Self {
        self.disable_auto_compaction = disable;
        self
    }

    pub fn use_cursor(mut self, enable: bool) -> Self {
        self.use_cursor = enable;
        self
    }

    pub fn parallelism(mut self, workers: usize) -> Self {
        self.parallelism = workers;
        self
    }

    pub fn debug(mut self, enable: bool) -> Self {
        self.debug = enable;
        self
    }

    /// Replaces zero-valued sizes and parallelism with their defaults.
    pub fn with_defaults(mut self) -> Self {
        if self.memory_size == 0 {
            self.memory_size = DEFAULT_MEMORY_SIZE;
        }
        if self.write_buffer_size == 0 {
            self.write_buffer_size = DEFAULT_WRITE_BUFFER_SIZE;
        }
        if self.max_memtable_size == 0 {
            self.max_memtable_size = DEFAULT_MAX_MEMTABLE_SIZE;
        }
        if self.parallelism == 0 {
            self.parallelism = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.directory.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("directory must be set".into()));
        }
        if self.directory.is_file() {
            return Err(Error::InvalidConfig(format!(
                "{} is a file, not a directory",
                self.directory.display()
            )));
        }
        Ok(())
    }

    pub(crate) fn persist_mode(&self) -> Option<fjall::PersistMode> {
        match self.durability {
            Durability::Sync => Some(fjall::PersistMode::SyncAll),
            Durability::Buffered | Durability::NoLog => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_config_default() {
        let config = StoreConfig::default();
        assert_eq!(config.memory_size, 8 * 1024 * 1024);
        assert_eq!(config.write_buffer_size, 64 * 1024 * 1024);
        assert_eq!(config.durability, Durability::Buffered);
        assert!(config.use_cursor);
        assert!(!config.disable_auto_compaction);
        assert!(!config.debug);
    }

    #[test]
    fn test_with_defaults_fills_zeroes() {
        let config = StoreConfig::new("/tmp/q")
            .memory_size(0)
            .write_buffer_size(0)
            .parallelism(0)
            .with_defaults();
        assert_eq!(config.memory_size, DEFAULT_MEMORY_SIZE);
        assert_eq!(config.write_buffer_size, DEFAULT_WRITE_BUFFER_SIZE);
        assert!(config.parallelism >= 1);
    }

    #[test]
    fn test_validate_requires_directory() {
        let err = StoreConfig::default().validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(StoreConfig::new("/tmp/q").validate().is_ok());
    }

    #[test]
    fn test_config_json_partial_fields() {
        let json = r#"{"directory": "/var/lib/q", "durability": "sync", "use_cursor": false}"#;
        let config: StoreConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.directory, PathBuf::from("/var/lib/q"));
        assert_eq!(config.durability, Durability::Sync);
        assert!(!config.use_cursor);
        assert_eq!(config.memory_size, DEFAULT_MEMORY_SIZE);
    }

    #[test]
    fn test_persist_mode_mapping() {
        let sync = StoreConfig::new("/tmp/q").durability(Durability::Sync);
        assert!(matches!(sync.persist_mode(), Some(fjall::PersistMode::SyncAll)));
        let no_log = StoreConfig::new("/tmp/q").durability(Durability::NoLog);
        assert!(no_log.persist_mode().is_none());
    }
}

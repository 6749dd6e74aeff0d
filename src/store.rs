use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use fjall::{PartitionCreateOptions, PersistMode, TxKeyspace};

use crate::config::{Durability, StoreConfig};
use crate::queue::Queue;
use crate::{Error, Result};

const MAX_QUEUE_NAME_LEN: usize = 200;

/// Owns the keyspace and hands out one live [`Queue`] per name.
///
/// Each queue name maps to its own partition. Creation runs under the
/// registry lock, so concurrent callers asking for the same name get the
/// same `Arc<Queue>` and the partition is opened once.
pub struct Store {
    keyspace: TxKeyspace,
    config: StoreConfig,
    queues: Mutex<HashMap<String, Arc<Queue>>>,
}

impl Store {
    pub fn open(config: StoreConfig) -> Result<Self> {
        let config = config.with_defaults();
        config.validate()?;
        std::fs::create_dir_all(&config.directory)?;

        let compaction_workers = if config.disable_auto_compaction {
            log::warn!("auto compaction disabled for {}", config.directory.display());
            0
        } else {
            config.parallelism
        };
        let keyspace = fjall::Config::new(&config.directory)
            .cache_size(config.memory_size)
            .max_write_buffer_size(config.write_buffer_size)
            .flush_workers(config.parallelism)
            .compaction_workers(compaction_workers)
            .manual_journal_persist(config.durability == Durability::NoLog)
            .open_transactional()
            .map_err(|source| Error::Open {
                directory: config.directory.clone(),
                source,
            })?;

        log::info!(
            "store opened at {} (durability={:?}, cursor={}, workers={})",
            config.directory.display(),
            config.durability,
            config.use_cursor,
            config.parallelism
        );
        Ok(Self {
            keyspace,
            config,
            queues: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the queue called `name`, creating its namespace on first use or
    /// reopening it if it was persisted earlier.
    pub fn queue(&self, name: &str) -> Result<Arc<Queue>> {
        validate_queue_name(name)?;
        let mut queues = self
            .queues
            .lock()
            .map_err(|_| Error::LockPoisoned("queue registry"))?;
        if let Some(queue) = queues.get(name) {
            return Ok(Arc::clone(queue));
        }

        let options = PartitionCreateOptions::default()
            .max_memtable_size(self.config.max_memtable_size)
            .compression(self.config.compression.into());
        let partition = self.keyspace.open_partition(name, options).map_err(|err| {
            log::error!("failed to open partition for queue {name:?}: {err}");
            err
        })?;
        let queue = Arc::new(Queue::open(
            name,
            self.keyspace.clone(),
            partition,
            &self.config,
        )?);
        queues.insert(name.to_owned(), Arc::clone(&queue));
        Ok(queue)
    }

    /// Names of the queues opened through this store handle, sorted.
    /// Queues persisted by earlier runs show up once reopened with [`Store::queue`].
    pub fn open_queue_names(&self) -> Result<Vec<String>> {
        let queues = self
            .queues
            .lock()
            .map_err(|_| Error::LockPoisoned("queue registry"))?;
        let mut names: Vec<String> = queues.keys().cloned().collect();
        names.sort_unstable();
        Ok(names)
    }

    /// Fsyncs the journal. Needed to make buffered or unlogged commits durable.
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Closes every queue, persists the journal and releases the keyspace.
    ///
    /// Queues handed out earlier drop their engine handles here, so holding an
    /// `Arc<Queue>` does not keep the engine open.
    pub fn close(self) -> Result<()> {
        let queues = self
            .queues
            .into_inner()
            .map_err(|_| Error::LockPoisoned("queue registry"))?;
        for queue in queues.values() {
            queue.close();
        }
        self.keyspace.persist(PersistMode::SyncAll)?;
        log::info!(
            "store at {} closed ({} queues)",
            self.config.directory.display(),
            queues.len()
        );
        Ok(())
    }

    /// Closes the store and deletes every file under its directory.
    pub fn destroy(self) -> Result<()> {
        let directory = self.config.directory.clone();
        self.close()?;
        std::fs::remove_dir_all(&directory)?;
        log::info!("store at {} destroyed", directory.display());
        Ok(())
    }
}

/// Queue names become partition names: 1 to 200 ASCII letters, digits, `_` or `-`.
pub fn validate_queue_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= MAX_QUEUE_NAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidQueueName(name.to_owned()))
    }
}

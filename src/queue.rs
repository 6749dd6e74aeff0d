use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};

use fjall::{PersistMode, ReadTransaction, TxKeyspace, TxPartitionHandle, WriteTransaction};

use crate::config::StoreConfig;
use crate::counter::{self, Counter};
use crate::cursor::Cursor;
use crate::key::{self, FIRST_ID};
use crate::{Error, Result};

/// A dequeued record. Once returned it no longer exists in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub payload: Vec<u8>,
}

/// Point-in-time telemetry for one queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    /// Dequeues ever committed.
    pub head: u64,
    /// Highest id ever committed.
    pub tail: u64,
    /// `tail - head`, best effort.
    pub approximate_size: u64,
    /// Last id handed out by this process, committed or not.
    pub last_allocated_id: u64,
    pub cursor_position: Option<u64>,
}

/// Engine handles of an open queue. Dropped on close.
struct Namespace {
    keyspace: TxKeyspace,
    partition: TxPartitionHandle,
}

/// A named FIFO queue bound to one partition of the shared keyspace.
///
/// Every enqueue and dequeue is a single write transaction. Write
/// transactions on the keyspace are serialized, so two dequeues can never
/// both claim the same id: the loser scans again and takes the next record.
pub struct Queue {
    name: String,
    namespace: RwLock<Option<Namespace>>,
    last_id: AtomicU64,
    cursor: Option<Mutex<Cursor>>,
    persist_mode: Option<PersistMode>,
    debug: bool,
}

impl Queue {
    pub(crate) fn open(
        name: &str,
        keyspace: TxKeyspace,
        partition: TxPartitionHandle,
        config: &StoreConfig,
    ) -> Result<Self> {
        let rtx = keyspace.read_tx();
        let newest = match rtx
            .range(&partition, key::message_range(FIRST_ID))
            .next_back()
        {
            Some(entry) => {
                let (key, _) = entry?;
                key::message_id(&key)?
            }
            None => 0,
        };
        // A damaged tail only costs telemetry: ids resume after the newest message.
        let tail = match read_counter(&rtx, &partition, Counter::Tail) {
            Ok(tail) => tail.unwrap_or(0),
            Err(err) if err.is_corruption() => {
                log::error!("queue {name:?}: {err}, resuming after newest id {newest}");
                0
            }
            Err(err) => return Err(err),
        };
        let last_id = tail.max(newest);
        log::debug!("queue {name:?} opened: tail={tail} newest={newest} last_id={last_id}");

        Ok(Self {
            name: name.to_owned(),
            namespace: RwLock::new(Some(Namespace {
                keyspace,
                partition,
            })),
            last_id: AtomicU64::new(last_id),
            cursor: config.use_cursor.then(|| Mutex::new(Cursor::new())),
            persist_mode: config.persist_mode(),
            debug: config.debug,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends `payload` and returns its id.
    ///
    /// The id is reserved in-process before the transaction runs; if the
    /// commit fails that id is skipped for good.
    pub fn enqueue(&self, payload: &[u8]) -> Result<u64> {
        self.with_namespace(|ns| {
            let id = self.allocate_id()?;

            let mut tx = self.write_tx(ns);
            tx.insert(&ns.partition, &key::message_key(id)[..], payload);
            merge_counter(ns, &mut tx, Counter::Tail, |stored| id.saturating_sub(stored))?;
            tx.commit()?;

            if self.debug {
                log::debug!("[{}] enqueued id={id} len={}", self.name, payload.len());
            }
            Ok(id)
        })
    }

    /// Claims the oldest message through the queue's cursor.
    ///
    /// Without a cursor every call scans from the head. Returns `Ok(None)`
    /// when nothing is available; it never waits.
    pub fn dequeue_next(&self) -> Result<Option<Message>> {
        let Some(cursor) = &self.cursor else {
            return self.with_namespace(|ns| self.claim_first(ns, FIRST_ID));
        };
        let mut cursor = lock_cursor(cursor)?;

        self.with_namespace(|ns| {
            let position = cursor.position().unwrap_or(FIRST_ID);
            let mut claimed = self.claim_first(ns, position)?;
            if claimed.is_none() && position > FIRST_ID {
                cursor.reseek(FIRST_ID);
                claimed = self.claim_first(ns, FIRST_ID)?;
            }
            match &claimed {
                Some(message) => cursor.advance_past(message.id),
                None => cursor.reset(),
            }
            Ok(claimed)
        })
    }

    /// Claims the first message with an id at or after `start`. Stateless:
    /// the cursor is neither used nor moved.
    pub fn dequeue_from(&self, start: u64) -> Result<Option<Message>> {
        self.with_namespace(|ns| self.claim_first(ns, start))
    }

    /// `None` resumes from the head via [`dequeue_next`](Self::dequeue_next),
    /// `Some(id)` scans from `id` via [`dequeue_from`](Self::dequeue_from).
    pub fn dequeue(&self, start: Option<u64>) -> Result<Option<Message>> {
        match start {
            Some(id) => self.dequeue_from(id),
            None => self.dequeue_next(),
        }
    }

    /// Remaining messages as told by the meta-counters. Exact only when no
    /// enqueue has failed and nothing runs concurrently.
    pub fn approximate_size(&self) -> Result<u64> {
        let (head, tail) = self.counters()?;
        Ok(tail.saturating_sub(head))
    }

    pub fn stats(&self) -> Result<QueueStats> {
        let (head, tail) = self.counters()?;
        let cursor_position = match &self.cursor {
            Some(cursor) => lock_cursor(cursor)?.position(),
            None => None,
        };
        Ok(QueueStats {
            head,
            tail,
            approximate_size: tail.saturating_sub(head),
            last_allocated_id: self.last_id.load(Ordering::Acquire),
            cursor_position,
        })
    }

    /// Forgets the cursor position so the next `dequeue_next` scans from the head.
    /// No-op when the store runs without cursors.
    pub fn reset_cursor(&self) -> Result<()> {
        if let Some(cursor) = &self.cursor {
            lock_cursor(cursor)?.reset();
        }
        Ok(())
    }

    /// Points the cursor at `id`. No-op when the store runs without cursors.
    pub fn reseek_cursor(&self, id: u64) -> Result<()> {
        if let Some(cursor) = &self.cursor {
            lock_cursor(cursor)?.reseek(id);
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.namespace
            .read()
            .map(|namespace| namespace.is_none())
            .unwrap_or(true)
    }

    /// Drops the queue's keyspace and partition handles once in-flight
    /// operations finish. Later operations fail with [`Error::Closed`].
    pub fn close(&self) {
        let released = match self.namespace.write() {
            Ok(mut namespace) => namespace.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if released.is_none() {
            return;
        }
        drop(released);
        if let Some(cursor) = &self.cursor {
            if let Ok(mut cursor) = cursor.lock() {
                cursor.reset();
            }
        }
        log::debug!("queue {:?} closed", self.name);
    }

    /// Runs `f` against the engine handles, holding off `close` until it returns.
    fn with_namespace<T>(&self, f: impl FnOnce(&Namespace) -> Result<T>) -> Result<T> {
        let namespace = self
            .namespace
            .read()
            .map_err(|_| Error::LockPoisoned("queue namespace"))?;
        match namespace.as_ref() {
            Some(ns) => f(ns),
            None => Err(Error::Closed(self.name.clone())),
        }
    }

    fn claim_first(&self, ns: &Namespace, start: u64) -> Result<Option<Message>> {
        let mut tx = self.write_tx(ns);
        let first = tx
            .range(&ns.partition, key::message_range(start))
            .next()
            .transpose()?;
        let Some((key, payload)) = first else {
            return Ok(None);
        };
        let id = key::message_id(&key)?;

        tx.remove(&ns.partition, key);
        merge_counter(ns, &mut tx, Counter::Head, |_| 1)?;
        tx.commit()?;

        if self.debug {
            log::debug!("[{}] dequeued id={id} len={}", self.name, payload.len());
        }
        Ok(Some(Message {
            id,
            payload: payload.to_vec(),
        }))
    }

    fn counters(&self) -> Result<(u64, u64)> {
        self.with_namespace(|ns| {
            let rtx = ns.keyspace.read_tx();
            let head = read_counter(&rtx, &ns.partition, Counter::Head)?.unwrap_or(0);
            let tail = read_counter(&rtx, &ns.partition, Counter::Tail)?.unwrap_or(0);
            Ok((head, tail))
        })
    }

    fn allocate_id(&self) -> Result<u64> {
        self.last_id
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| last.checked_add(1))
            .map(|last| last + 1)
            .map_err(|_| Error::IdExhausted)
    }

    fn write_tx<'a>(&self, ns: &'a Namespace) -> WriteTransaction<'a> {
        ns.keyspace.write_tx().durability(self.persist_mode)
    }
}

/// Reads the stored counter inside `tx`, folds in the operand computed from
/// it and writes the result back in the same transaction.
fn merge_counter(
    ns: &Namespace,
    tx: &mut WriteTransaction<'_>,
    counter: Counter,
    operand: impl FnOnce(u64) -> u64,
) -> Result<u64> {
    let stored = match tx.get(&ns.partition, counter.key())? {
        Some(bytes) => Some(counter.decode(&bytes)?),
        None => None,
    };
    let merged = counter::full_merge(stored, &[operand(stored.unwrap_or(0))]);
    tx.insert(&ns.partition, counter.key(), &counter::encode(merged)[..]);
    Ok(merged)
}

fn read_counter(
    rtx: &ReadTransaction,
    partition: &TxPartitionHandle,
    counter: Counter,
) -> Result<Option<u64>> {
    match rtx.get(partition, counter.key())? {
        Some(bytes) => Ok(Some(counter.decode(&bytes)?)),
        None => Ok(None),
    }
}

fn lock_cursor(cursor: &Mutex<Cursor>) -> Result<MutexGuard<'_, Cursor>> {
    cursor.lock().map_err(|_| Error::LockPoisoned("queue cursor"))
}

//! durable queue storage using sled
//!
//! two keyspaces in one tree: `queue:` for transactions awaiting
//! processing and `submitted:` for transactions the chain has accepted
//! but not yet confirmed. keys embed a zero-padded monotonic sequence
//! number so a prefix scan walks entries in enqueue order.

use crate::error::Result;
use crate::queue::{QueuedTransaction, SubmittedRecord};
use crate::types::TxId;
use std::path::Path;
use tracing::info;

pub struct QueueStore {
    db: sled::Db,
}

fn queue_key(seq: u64) -> String {
    format!("queue:{:020}", seq)
}

fn submitted_key(seq: u64) -> String {
    format!("submitted:{:020}", seq)
}

impl QueueStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        info!("opening queue store at {}", path.as_ref().display());
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// next queue slot, monotonic across restarts
    pub fn next_seq(&self) -> Result<u64> {
        Ok(self.db.generate_id()?)
    }

    /// insert or overwrite a queued transaction at its slot
    pub fn put(&self, tx: &QueuedTransaction) -> Result<()> {
        let key = queue_key(tx.seq);
        self.db.insert(key.as_bytes(), bincode::serialize(tx)?)?;
        self.db.flush()?;
        Ok(())
    }

    pub fn get(&self, id: &TxId) -> Result<Option<QueuedTransaction>> {
        for item in self.db.scan_prefix(b"queue:") {
            let (_, value) = item?;
            let tx: QueuedTransaction = bincode::deserialize(&value)?;
            if &tx.id == id {
                return Ok(Some(tx));
            }
        }
        Ok(None)
    }

    /// drop a queued transaction, reporting whether it was present
    pub fn remove(&self, id: &TxId) -> Result<bool> {
        for item in self.db.scan_prefix(b"queue:") {
            let (key, value) = item?;
            let tx: QueuedTransaction = bincode::deserialize(&value)?;
            if &tx.id == id {
                self.db.remove(key)?;
                self.db.flush()?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// all queued transactions in enqueue order
    pub fn list(&self) -> Result<Vec<QueuedTransaction>> {
        let mut out = Vec::new();
        for item in self.db.scan_prefix(b"queue:") {
            let (_, value) = item?;
            out.push(bincode::deserialize(&value)?);
        }
        Ok(out)
    }

    pub fn put_submitted(&self, record: &SubmittedRecord) -> Result<()> {
        let key = submitted_key(record.seq);
        self.db.insert(key.as_bytes(), bincode::serialize(record)?)?;
        self.db.flush()?;
        Ok(())
    }

    /// move a queue row into the submitted keyspace in one atomic batch,
    /// so a fault can never drop the transaction from both keyspaces
    pub fn promote(&self, record: &SubmittedRecord) -> Result<()> {
        let mut batch = sled::Batch::default();
        batch.remove(queue_key(record.seq).as_bytes());
        batch.insert(submitted_key(record.seq).as_bytes(), bincode::serialize(record)?);
        self.db.apply_batch(batch)?;
        self.db.flush()?;
        Ok(())
    }

    /// all unconfirmed submissions in original enqueue order
    pub fn list_submitted(&self) -> Result<Vec<SubmittedRecord>> {
        let mut out = Vec::new();
        for item in self.db.scan_prefix(b"submitted:") {
            let (_, value) = item?;
            out.push(bincode::deserialize(&value)?);
        }
        Ok(out)
    }

    pub fn get_submitted(&self, id: &TxId) -> Result<Option<SubmittedRecord>> {
        for record in self.list_submitted()? {
            if record.matches(id) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    pub fn remove_submitted(&self, seq: u64) -> Result<()> {
        self.db.remove(submitted_key(seq).as_bytes())?;
        self.db.flush()?;
        Ok(())
    }
}

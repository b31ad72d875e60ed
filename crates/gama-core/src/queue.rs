//! transaction queue
//!
//! durable holding area between "user confirmed the send" and "the chain
//! accepted the transaction". enqueue returns immediately; a processing
//! pass later fans out proof generation for every queued item at once.
//! one item failing never touches its siblings: the failure is recorded
//! on that item and the rest carry on.

use crate::activity::{Activity, ActivityKind};
use crate::amount::{format_minor, Amount};
use crate::client::ProvingClient;
use crate::error::Result;
use crate::store::QueueStore;
use crate::types::{unix_now, PrivacyMode, Token, TransferKind, TxId};
use crate::wizard::WizardState;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// lifecycle of a queued item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueStatus {
    /// waiting for the next processing pass
    Queued,
    /// last attempt failed; the next pass tries again
    Failed { message: String, attempts: u32 },
}

/// durable record of a transaction awaiting generation and submission
///
/// all wizard choices are frozen in here so the transaction can be
/// regenerated at any time, including after a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedTransaction {
    pub id: TxId,
    /// queue slot, assigned at enqueue; scan order is enqueue order
    pub seq: u64,
    pub kind: TransferKind,
    pub token: Token,
    pub recipient: String,
    pub amount: Amount,
    pub memo: Option<String>,
    pub send_type: PrivacyMode,
    pub received_type: PrivacyMode,
    pub fee: Amount,
    pub fee_type: PrivacyMode,
    pub delegate: bool,
    pub status: QueueStatus,
    pub created_at: u64,
}

impl QueuedTransaction {
    /// freeze a completed wizard into a queue record
    ///
    /// returns None while required steps are still open. converts have no
    /// counterparty, so they only need the amount step.
    pub fn from_wizard(state: &WizardState, kind: TransferKind) -> Option<Self> {
        let token = state.token.clone()?;
        let complete = match kind {
            TransferKind::Convert => state.amount_step_complete(),
            _ => state.ready_to_confirm(),
        };
        if !complete {
            return None;
        }
        Some(Self {
            id: TxId::generate(),
            seq: 0,
            kind,
            token,
            recipient: state.recipient.trim().to_string(),
            amount: state.amount.amount(),
            memo: (!state.memo.is_empty()).then(|| state.memo.clone()),
            send_type: state.send_type,
            received_type: state.received_type,
            fee: state.fee.amount(),
            fee_type: state.fee_type,
            delegate: state.delegate,
            status: QueueStatus::Queued,
            created_at: unix_now(),
        })
    }

    /// record a failed attempt, bumping the attempt counter
    pub fn fail(&mut self, message: impl Into<String>) {
        let attempts = match &self.status {
            QueueStatus::Failed { attempts, .. } => attempts + 1,
            QueueStatus::Queued => 1,
        };
        self.status = QueueStatus::Failed {
            message: message.into(),
            attempts,
        };
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, QueueStatus::Failed { .. })
    }

    pub fn failure_message(&self) -> Option<&str> {
        match &self.status {
            QueueStatus::Failed { message, .. } => Some(message),
            QueueStatus::Queued => None,
        }
    }
}

/// a transaction the chain accepted, tracked until it shows up confirmed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedRecord {
    pub seq: u64,
    pub local_id: TxId,
    pub chain_tx_id: TxId,
    pub kind: TransferKind,
    pub token: Token,
    pub recipient: String,
    pub amount: Amount,
    pub fee: Amount,
    pub memo: Option<String>,
    pub submitted_at: u64,
    /// chain-side cancel was requested; terminal either way
    pub cancelled: bool,
}

impl SubmittedRecord {
    pub fn from_queued(tx: &QueuedTransaction, chain_tx_id: TxId) -> Self {
        Self {
            seq: tx.seq,
            local_id: tx.id.clone(),
            chain_tx_id,
            kind: tx.kind,
            token: tx.token.clone(),
            recipient: tx.recipient.clone(),
            amount: tx.amount,
            fee: tx.fee,
            memo: tx.memo.clone(),
            submitted_at: unix_now(),
            cancelled: false,
        }
    }

    /// feed identity; matches the confirmed row once the chain reports it
    pub fn key(&self) -> &str {
        self.chain_tx_id.as_str()
    }

    pub fn matches(&self, id: &TxId) -> bool {
        &self.local_id == id || &self.chain_tx_id == id
    }
}

/// per-item results of one processing pass
#[derive(Debug, Default)]
pub struct ProcessOutcome {
    pub succeeded: Vec<TxId>,
    pub failed: Vec<(TxId, String)>,
}

impl ProcessOutcome {
    pub fn is_empty(&self) -> bool {
        self.succeeded.is_empty() && self.failed.is_empty()
    }
}

/// durable transaction queue with concurrent processing
pub struct TxQueue {
    store: QueueStore,
    in_flight: Mutex<HashSet<TxId>>,
}

impl TxQueue {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            store: QueueStore::open(path)?,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    /// append a transaction; returns as soon as it is durable
    pub fn enqueue(&self, mut tx: QueuedTransaction) -> Result<TxId> {
        tx.seq = self.store.next_seq()?;
        self.store.put(&tx)?;
        info!("enqueued {} {}", tx.kind, tx.id);
        Ok(tx.id)
    }

    /// everything currently queued, in enqueue order
    pub fn list(&self) -> Result<Vec<QueuedTransaction>> {
        self.store.list()
    }

    /// generate and submit every queued item concurrently
    ///
    /// items already being processed by an overlapping pass are skipped,
    /// so the same transaction is never given to the client twice at
    /// once. items enqueued after the snapshot wait for the next pass.
    /// the pass resolves only when every fanned-out call has settled.
    pub async fn process_all(&self, client: &dyn ProvingClient) -> Result<ProcessOutcome> {
        let batch = {
            let mut in_flight = self.in_flight.lock().await;
            let mut batch = Vec::new();
            for tx in self.store.list()? {
                if in_flight.insert(tx.id.clone()) {
                    batch.push(tx);
                }
            }
            batch
        };

        if batch.is_empty() {
            return Ok(ProcessOutcome::default());
        }
        info!("processing {} queued transaction(s)", batch.len());

        let results = join_all(batch.iter().map(|tx| client.generate_and_submit(tx))).await;

        let mut outcome = ProcessOutcome::default();
        for (tx, result) in batch.iter().zip(results) {
            match result {
                Ok(submission) => match self.finish_submitted(tx, submission.tx_id.clone()) {
                    Ok(()) => {
                        info!("submitted {} as {}", tx.id, submission.tx_id);
                        outcome.succeeded.push(tx.id.clone());
                    }
                    Err(e) => {
                        warn!("failed to record submission for {}: {}", tx.id, e);
                        outcome.failed.push((tx.id.clone(), e.to_string()));
                    }
                },
                Err(e) => {
                    warn!("generation failed for {}: {}", tx.id, e);
                    let mut failed = tx.clone();
                    failed.fail(e.to_string());
                    if let Err(store_err) = self.store.put(&failed) {
                        warn!("failed to persist failure for {}: {}", tx.id, store_err);
                    }
                    outcome.failed.push((tx.id.clone(), e.to_string()));
                }
            }
        }

        let mut in_flight = self.in_flight.lock().await;
        for tx in &batch {
            in_flight.remove(&tx.id);
        }
        drop(in_flight);

        info!(
            "processing pass done: {} submitted, {} failed",
            outcome.succeeded.len(),
            outcome.failed.len()
        );
        Ok(outcome)
    }

    fn finish_submitted(&self, tx: &QueuedTransaction, chain_tx_id: TxId) -> Result<()> {
        self.store
            .promote(&SubmittedRecord::from_queued(tx, chain_tx_id))
    }

    /// remove a queued transaction before generation starts
    ///
    /// once generation is running the attempt always settles; cancelling
    /// then is a no-op returning false. the in-flight lock is held across
    /// the removal so a concurrent pass cannot pick the item up mid-cancel.
    pub async fn cancel(&self, id: &TxId) -> Result<bool> {
        let in_flight = self.in_flight.lock().await;
        if in_flight.contains(id) {
            debug!("cancel ignored, {} is generating", id);
            return Ok(false);
        }
        let removed = self.store.remove(id)?;
        if removed {
            info!("cancelled queued transaction {}", id);
        }
        Ok(removed)
    }

    pub fn find_submitted(&self, id: &TxId) -> Result<Option<SubmittedRecord>> {
        self.store.get_submitted(id)
    }

    /// mark an accepted submission cancelled after the chain-side call
    pub fn mark_submitted_cancelled(&self, id: &TxId) -> Result<bool> {
        if let Some(mut record) = self.store.get_submitted(id)? {
            record.cancelled = true;
            self.store.put_submitted(&record)?;
            info!("marked submission {} cancelled", record.chain_tx_id);
            return Ok(true);
        }
        Ok(false)
    }

    /// drop a tracked submission; terminal rows are dismissed this way
    pub fn dismiss_submitted(&self, id: &TxId) -> Result<bool> {
        if let Some(record) = self.store.get_submitted(id)? {
            self.store.remove_submitted(record.seq)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// drop tracked submissions the confirmed feed now reports
    pub fn prune_submitted(&self, confirmed_keys: &HashSet<String>) -> Result<usize> {
        let mut pruned = 0;
        for record in self.store.list_submitted()? {
            if confirmed_keys.contains(record.key()) {
                self.store.remove_submitted(record.seq)?;
                pruned += 1;
            }
        }
        if pruned > 0 {
            debug!("pruned {} confirmed submission(s)", pruned);
        }
        Ok(pruned)
    }

    /// the live pending feed: queued items plus unconfirmed submissions,
    /// as display rows in enqueue order
    pub async fn pending_activities(&self) -> Result<Vec<Activity>> {
        let in_flight = self.in_flight.lock().await.clone();

        let mut rows: Vec<(u64, Activity)> = Vec::new();
        for tx in self.store.list()? {
            let processing = in_flight.contains(&tx.id);
            let kind = if processing {
                ActivityKind::Processing
            } else if tx.is_failed() {
                ActivityKind::Failed
            } else {
                ActivityKind::Pending
            };
            let mut a = Activity::new(tx.id.as_str(), kind);
            a.address = tx.recipient.clone();
            a.timestamp = Some(tx.created_at);
            a.message = format!(
                "{} {} {}",
                tx.kind,
                format_minor(tx.amount, tx.token.decimals),
                tx.token.symbol
            );
            a.token = Some(tx.token.symbol.clone());
            a.secondary = tx
                .failure_message()
                .map(str::to_string)
                .or_else(|| tx.memo.clone());
            a.tx_id = Some(tx.id.clone());
            a.fee = Some(tx.fee);
            a.cancellable = !processing;
            rows.push((tx.seq, a));
        }

        for record in self.store.list_submitted()? {
            let kind = if record.cancelled {
                ActivityKind::Cancelled
            } else {
                ActivityKind::Processing
            };
            let mut a = Activity::new(record.key(), kind);
            a.address = record.recipient.clone();
            a.timestamp = Some(record.submitted_at);
            a.message = format!(
                "{} {} {}",
                record.kind,
                format_minor(record.amount, record.token.decimals),
                record.token.symbol
            );
            a.token = Some(record.token.symbol.clone());
            a.secondary = record.memo.clone();
            a.tx_id = Some(record.chain_tx_id.clone());
            a.fee = Some(record.fee);
            a.cancellable = true;
            rows.push((record.seq, a));
        }

        rows.sort_by_key(|(seq, _)| *seq);
        Ok(rows.into_iter().map(|(_, a)| a).collect())
    }
}

//! collaborator interfaces to the chain
//!
//! the core never speaks to a network itself. proving, submission,
//! history and balances sit behind these traits; real implementations
//! live with the shells that embed the core.

use crate::activity::Activity;
use crate::amount::Amount;
use crate::error::Result;
use crate::queue::{QueuedTransaction, TxQueue};
use crate::types::{Account, ChainId, PrivacyMode, TxId};
use async_trait::async_trait;
use std::sync::Arc;

/// outcome of a successful generate-and-submit call
#[derive(Debug, Clone)]
pub struct Submission {
    /// id the chain assigned to the transaction
    pub tx_id: TxId,
}

/// generates the zero-knowledge execution and submits it
///
/// generation is slow, seconds to minutes. the queue guarantees one
/// logical transaction is never handed to this client twice concurrently;
/// bounding a stuck call is the implementation's own responsibility.
#[async_trait]
pub trait ProvingClient: Send + Sync {
    async fn generate_and_submit(&self, tx: &QueuedTransaction) -> Result<Submission>;

    /// best-effort cancel of a transaction the chain already accepted
    async fn cancel_submitted(&self, tx_id: &TxId) -> Result<()>;
}

/// confirmed on-chain history
#[async_trait]
pub trait ConfirmedSource: Send + Sync {
    async fn fetch_confirmed(
        &self,
        account: &Account,
        chain: &ChainId,
        program_filter: Option<&str>,
    ) -> Result<Vec<Activity>>;
}

/// live pending stream
#[async_trait]
pub trait PendingSource: Send + Sync {
    async fn fetch_pending(&self, account: &Account, chain: &ChainId) -> Result<Vec<Activity>>;
}

/// pool balances and spendable record counts
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn balance(
        &self,
        account: &Account,
        chain: &ChainId,
        pool: PrivacyMode,
    ) -> Result<Amount>;

    async fn spendable_records(&self, account: &Account, chain: &ChainId) -> Result<u32>;
}

/// pending source backed by the local queue and submission tracker
pub struct QueuePendingSource {
    queue: Arc<TxQueue>,
}

impl QueuePendingSource {
    pub fn new(queue: Arc<TxQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl PendingSource for QueuePendingSource {
    async fn fetch_pending(&self, _account: &Account, _chain: &ChainId) -> Result<Vec<Activity>> {
        self.queue.pending_activities().await
    }
}

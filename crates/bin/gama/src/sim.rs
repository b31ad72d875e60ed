//! simulated chain backend
//!
//! stands in for a real node so every wallet flow can run offline. state
//! lives in a json file under the data dir, which keeps balances and
//! history consistent across cli invocations. submissions debit the
//! pools, confirm instantly and land in the history the next time the
//! activity feed polls.

use async_trait::async_trait;
use gama_core::types::unix_now;
use gama_core::{
    format_minor, Account, Activity, ActivityKind, Amount, BalanceSource, ChainId,
    ConfirmedSource, GamaError, PrivacyMode, ProvingClient, QueuedTransaction, Submission, Token,
    TransferKind, TxId,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

/// starting balances for a fresh sim wallet, in minor units
const FAUCET_PRIVATE: Amount = Amount(50_000_000);
const FAUCET_PUBLIC: Amount = Amount(100_000_000);
const FAUCET_RECORDS: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfirmedTx {
    chain_tx_id: String,
    recipient: String,
    kind: TransferKind,
    token: Token,
    amount: Amount,
    fee: Amount,
    send_type: PrivacyMode,
    fee_type: PrivacyMode,
    timestamp: u64,
    cancelled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct SimState {
    private_balance: Amount,
    public_balance: Amount,
    spendable_records: u32,
    confirmed: Vec<ConfirmedTx>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            private_balance: FAUCET_PRIVATE,
            public_balance: FAUCET_PUBLIC,
            spendable_records: FAUCET_RECORDS,
            confirmed: Vec::new(),
        }
    }
}

pub struct SimChain {
    path: PathBuf,
    state: Mutex<SimState>,
    proof_delay: Duration,
}

impl SimChain {
    /// load existing sim state or seed a fresh faucet-funded wallet
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let path = data_dir.join("sim_chain.json");
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            info!("seeding sim chain at {}", path.display());
            SimState::default()
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
            proof_delay: Duration::from_millis(300),
        })
    }

    #[cfg(test)]
    fn with_proof_delay(mut self, delay: Duration) -> Self {
        self.proof_delay = delay;
        self
    }

    fn persist(&self, state: &SimState) -> gama_core::Result<()> {
        let contents = serde_json::to_string_pretty(state)
            .map_err(|e| GamaError::Serialization(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

#[async_trait]
impl ProvingClient for SimChain {
    async fn generate_and_submit(&self, tx: &QueuedTransaction) -> gama_core::Result<Submission> {
        // proving takes a moment even in the sim
        tokio::time::sleep(self.proof_delay).await;

        let mut state = self.state.lock().map_err(|_| {
            GamaError::Storage("sim chain state poisoned".into())
        })?;

        // stage both debits so a rejection leaves the balances untouched
        let mut private = state.private_balance;
        let mut public = state.public_balance;
        for (pool, value) in [(tx.send_type, tx.amount), (tx.fee_type, tx.fee)] {
            let (balance, name) = match pool {
                PrivacyMode::Private => (&mut private, "private"),
                PrivacyMode::Public => (&mut public, "public"),
            };
            *balance = balance.checked_sub(value).ok_or_else(|| {
                GamaError::Client(format!("insufficient {} balance", name))
            })?;
        }
        state.private_balance = private;
        state.public_balance = public;

        // converts keep the value, it just moves pools
        if tx.kind == TransferKind::Convert {
            match tx.received_type {
                PrivacyMode::Private => {
                    state.private_balance = state.private_balance.saturating_add(tx.amount)
                }
                PrivacyMode::Public => {
                    state.public_balance = state.public_balance.saturating_add(tx.amount)
                }
            }
        }

        // rough record bookkeeping: private spends consume one, private
        // receipts mint one
        if tx.send_type.is_private() {
            state.spendable_records = state.spendable_records.saturating_sub(1);
        }
        if tx.received_type.is_private() && tx.kind == TransferKind::Convert {
            state.spendable_records += 1;
        }

        let chain_tx_id = TxId(format!("at1{}", tx.id.as_str()));
        state.confirmed.push(ConfirmedTx {
            chain_tx_id: chain_tx_id.0.clone(),
            recipient: tx.recipient.clone(),
            kind: tx.kind,
            token: tx.token.clone(),
            amount: tx.amount,
            fee: tx.fee,
            send_type: tx.send_type,
            fee_type: tx.fee_type,
            timestamp: unix_now(),
            cancelled: false,
        });
        self.persist(&state)?;
        debug!("sim accepted {} as {}", tx.id, chain_tx_id);

        Ok(Submission { tx_id: chain_tx_id })
    }

    async fn cancel_submitted(&self, tx_id: &TxId) -> gama_core::Result<()> {
        let mut guard = self.state.lock().map_err(|_| {
            GamaError::Storage("sim chain state poisoned".into())
        })?;
        let state = &mut *guard;
        let mut cancelled = false;
        if let Some(tx) = state
            .confirmed
            .iter_mut()
            .find(|tx| tx.chain_tx_id == tx_id.0 && !tx.cancelled)
        {
            tx.cancelled = true;
            // the chain returns the funds to the pools that paid
            match tx.send_type {
                PrivacyMode::Private => {
                    state.private_balance = state.private_balance.saturating_add(tx.amount)
                }
                PrivacyMode::Public => {
                    state.public_balance = state.public_balance.saturating_add(tx.amount)
                }
            }
            match tx.fee_type {
                PrivacyMode::Private => {
                    state.private_balance = state.private_balance.saturating_add(tx.fee)
                }
                PrivacyMode::Public => {
                    state.public_balance = state.public_balance.saturating_add(tx.fee)
                }
            }
            cancelled = true;
        }
        if cancelled {
            self.persist(state)?;
        }
        Ok(())
    }
}

#[async_trait]
impl ConfirmedSource for SimChain {
    async fn fetch_confirmed(
        &self,
        _account: &Account,
        _chain: &ChainId,
        program_filter: Option<&str>,
    ) -> gama_core::Result<Vec<Activity>> {
        let state = self.state.lock().map_err(|_| {
            GamaError::Storage("sim chain state poisoned".into())
        })?;
        let rows = state
            .confirmed
            .iter()
            .filter(|tx| program_filter.map_or(true, |p| tx.token.program_id == p))
            .map(|tx| {
                let kind = if tx.cancelled {
                    ActivityKind::Cancelled
                } else {
                    ActivityKind::Completed
                };
                let mut row = Activity::new(&tx.chain_tx_id, kind);
                row.address = tx.recipient.clone();
                row.timestamp = Some(tx.timestamp);
                row.message = format!(
                    "{} {} {}",
                    tx.kind,
                    format_minor(tx.amount, tx.token.decimals),
                    tx.token.symbol
                );
                row.token = Some(tx.token.symbol.clone());
                row.tx_id = Some(TxId(tx.chain_tx_id.clone()));
                row.fee = Some(tx.fee);
                row
            })
            .collect();
        Ok(rows)
    }
}

#[async_trait]
impl BalanceSource for SimChain {
    async fn balance(
        &self,
        _account: &Account,
        _chain: &ChainId,
        pool: PrivacyMode,
    ) -> gama_core::Result<Amount> {
        let state = self.state.lock().map_err(|_| {
            GamaError::Storage("sim chain state poisoned".into())
        })?;
        Ok(match pool {
            PrivacyMode::Private => state.private_balance,
            PrivacyMode::Public => state.public_balance,
        })
    }

    async fn spendable_records(&self, _account: &Account, _chain: &ChainId) -> gama_core::Result<u32> {
        let state = self.state.lock().map_err(|_| {
            GamaError::Storage("sim chain state poisoned".into())
        })?;
        Ok(state.spendable_records)
    }
}

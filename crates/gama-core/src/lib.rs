//! # gama-core
//!
//! headless wallet core for a two-pool privacy token. covers the path
//! from "user types an amount" to "transaction shows up confirmed":
//!
//! ```text
//!  ┌────────┐   ┌─────────┐   ┌─────────────┐   ┌──────────┐
//!  │ wizard │──▶│ enqueue │──▶│ process_all │──▶│ submitted │
//!  └────────┘   └─────────┘   └─────────────┘   └─────┬─────┘
//!      ▲          durable        concurrent           │
//!      │          (sled)         proving              ▼
//!  balances                                    ┌──────────────┐
//!  + record                                    │ activity feed │
//!  counts                                      │ pending+chain │
//!                                              └──────────────┘
//! ```
//!
//! every balance is an integer in minor units; display strings are
//! parsed with [`amount::minor_units`] and never touch floats. the
//! queue survives restarts and processes items independently, so one
//! failed proof never blocks the rest.
//!
//! chain access goes through the traits in [`client`]; the crate ships
//! no transport of its own.

pub mod activity;
pub mod amount;
pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod queue;
pub mod store;
pub mod types;
pub mod wizard;

pub use activity::{merge_activities, Activity, ActivityKind};
pub use amount::{format_minor, minor_units, sanitize_amount, Amount, AmountField};
pub use client::{
    BalanceSource, ConfirmedSource, PendingSource, ProvingClient, QueuePendingSource, Submission,
};
pub use config::WalletConfig;
pub use error::{GamaError, Result};
pub use feed::ActivityFeed;
pub use queue::{ProcessOutcome, QueueStatus, QueuedTransaction, SubmittedRecord, TxQueue};
pub use types::{Account, ChainId, PrivacyMode, Token, TransferKind, TxId};
pub use wizard::{FeeOptions, FlowEntry, WizardState};

//! shared wallet types
//!
//! value types carried across the send flow, queue and activity feed

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// balance pool a transfer side operates on
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrivacyMode {
    Private,
    Public,
}

impl Default for PrivacyMode {
    fn default() -> Self {
        PrivacyMode::Private
    }
}

impl PrivacyMode {
    pub fn is_private(&self) -> bool {
        matches!(self, PrivacyMode::Private)
    }

    /// the other pool
    pub fn flipped(&self) -> Self {
        match self {
            PrivacyMode::Private => PrivacyMode::Public,
            PrivacyMode::Public => PrivacyMode::Private,
        }
    }
}

impl fmt::Display for PrivacyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivacyMode::Private => write!(f, "private"),
            PrivacyMode::Public => write!(f, "public"),
        }
    }
}

/// what a queued transaction does on chain
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferKind {
    /// send tokens to another account
    Transfer,
    /// move value between own pools (shield/unshield)
    Convert,
    /// send a collectible record
    NftTransfer,
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferKind::Transfer => write!(f, "transfer"),
            TransferKind::Convert => write!(f, "convert"),
            TransferKind::NftTransfer => write!(f, "nft transfer"),
        }
    }
}

/// token program metadata the send flow needs
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// on-chain program id
    pub program_id: String,
    /// display symbol, e.g. "GAMA"
    pub symbol: String,
    /// decimal places of one whole unit
    pub decimals: u8,
}

impl Token {
    pub fn new(program_id: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            program_id: program_id.into(),
            symbol: symbol.into(),
            decimals,
        }
    }
}

/// locally assigned transaction identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(pub String);

impl TxId {
    /// fresh random id (hex of 16 random bytes)
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TxId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// account address on chain
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account(pub String);

impl Account {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Account {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// chain the wallet talks to, e.g. "mainnet" or "testnet"
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub String);

impl ChainId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChainId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// current unix time in seconds
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

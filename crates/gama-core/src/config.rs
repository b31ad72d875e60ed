//! wallet configuration
//!
//! a small toml file holding the account, chain and feed cadence. loaded
//! at startup by whichever shell embeds the core.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::{Account, ChainId};

pub const CONFIG_FILE_NAME: &str = "gama.toml";

/// platform data dir + gama
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gama")
}

fn default_pending_poll() -> u64 {
    10
}

fn default_confirmed_poll() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    pub account: Account,
    pub chain_id: ChainId,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// pending feed cadence; short, the data is local
    #[serde(default = "default_pending_poll")]
    pub pending_poll_secs: u64,
    /// confirmed feed cadence; long, every poll hits the chain
    #[serde(default = "default_confirmed_poll")]
    pub confirmed_poll_secs: u64,
    /// restrict the confirmed feed to one token program
    #[serde(default)]
    pub program_filter: Option<String>,
    /// base url for transaction explorer links
    #[serde(default)]
    pub explorer_base: Option<String>,
}

impl WalletConfig {
    pub fn new(account: Account, chain_id: ChainId) -> Self {
        Self {
            account,
            chain_id,
            data_dir: default_data_dir(),
            pending_poll_secs: default_pending_poll(),
            confirmed_poll_secs: default_confirmed_poll(),
            program_filter: None,
            explorer_base: None,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config dir: {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// where the durable queue lives
    pub fn queue_path(&self) -> PathBuf {
        self.data_dir.join("queue")
    }
}

//! gama wallet CLI
//!
//! Drives the wallet core against a simulated chain backend, so every
//! flow runs offline: queue a send, process it, watch it move through
//! the activity feed.
//!
//! ## Usage
//!
//! ```bash
//! # one-time setup
//! gama init --account aleo1example
//!
//! # check pool balances and spendable records
//! gama balance
//!
//! # queue a send, then generate and submit it
//! gama send --to aleo1friend --amount 1.25 --fee 0.01
//! gama process
//!
//! # move value between the public and private pools
//! gama convert --amount 10 --to-pool private
//!
//! # the merged pending + confirmed feed
//! gama activity
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use gama_core::config::{default_data_dir, CONFIG_FILE_NAME};
use gama_core::{
    format_minor, Account, ActivityFeed, ActivityKind, ChainId, FlowEntry, PrivacyMode,
    QueuePendingSource, QueueStatus, QueuedTransaction, Token, TransferKind, TxQueue,
    WalletConfig, WizardState,
};

mod sim;

use sim::SimChain;

#[derive(Parser)]
#[command(name = "gama")]
#[command(about = "Two-pool privacy token wallet against a simulated chain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Pool {
    Private,
    Public,
}

impl From<Pool> for PrivacyMode {
    fn from(pool: Pool) -> Self {
        match pool {
            Pool::Private => PrivacyMode::Private,
            Pool::Public => PrivacyMode::Public,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a fresh config file
    Init {
        /// Wallet account address
        #[arg(short, long)]
        account: String,

        /// Chain identifier
        #[arg(long, default_value = "testnet")]
        chain: String,

        /// Data directory (queue + sim chain state)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Base url for explorer links in the feed
        #[arg(long)]
        explorer: Option<String>,
    },

    /// Show pool balances and spendable record count
    Balance {
        /// Token display symbol
        #[arg(long, default_value = "GAMA")]
        symbol: String,

        /// Token decimal precision
        #[arg(long, default_value = "6")]
        decimals: u8,
    },

    /// Queue a transfer
    Send {
        /// Recipient address
        #[arg(short, long)]
        to: String,

        /// Amount in display units (e.g. 1.25)
        #[arg(short, long)]
        amount: String,

        /// Fee in display units
        #[arg(short, long, default_value = "0")]
        fee: String,

        /// Attach a memo
        #[arg(short, long)]
        memo: Option<String>,

        /// Pool to spend from (default follows balances)
        #[arg(long, value_enum)]
        send_pool: Option<Pool>,

        /// Pool credited on the recipient side
        #[arg(long, value_enum)]
        receive_pool: Option<Pool>,

        /// Pool the fee is paid from
        #[arg(long, value_enum)]
        fee_pool: Option<Pool>,

        /// Delegate proof generation to a remote prover
        #[arg(long)]
        delegate: bool,

        /// Token program id
        #[arg(long, default_value = "credits.gama")]
        token: String,

        /// Token display symbol
        #[arg(long, default_value = "GAMA")]
        symbol: String,

        /// Token decimal precision
        #[arg(long, default_value = "6")]
        decimals: u8,
    },

    /// Queue a conversion between the public and private pools
    Convert {
        /// Amount in display units
        #[arg(short, long)]
        amount: String,

        /// Destination pool
        #[arg(long, value_enum)]
        to_pool: Pool,

        /// Fee in display units
        #[arg(short, long, default_value = "0")]
        fee: String,

        /// Delegate proof generation to a remote prover
        #[arg(long)]
        delegate: bool,

        /// Token program id
        #[arg(long, default_value = "credits.gama")]
        token: String,

        /// Token display symbol
        #[arg(long, default_value = "GAMA")]
        symbol: String,

        /// Token decimal precision
        #[arg(long, default_value = "6")]
        decimals: u8,
    },

    /// List queued transactions
    Queue {
        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        output: String,
    },

    /// Generate and submit everything queued
    Process,

    /// Show the merged activity feed
    Activity {
        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        output: String,
    },

    /// Cancel the work behind a feed row
    Cancel {
        /// Feed row key (local or chain transaction id)
        #[arg(short, long)]
        key: String,
    },
}

/// everything an opened wallet needs
struct Wallet {
    config: WalletConfig,
    queue: Arc<TxQueue>,
    chain: Arc<SimChain>,
}

impl Wallet {
    fn open(config_path: &PathBuf) -> Result<Self> {
        let config = WalletConfig::load(config_path)?;
        let queue = Arc::new(TxQueue::open(config.queue_path())?);
        let chain = Arc::new(SimChain::open(&config.data_dir)?);
        Ok(Self {
            config,
            queue,
            chain,
        })
    }

    fn feed(&self) -> ActivityFeed {
        ActivityFeed::new(
            self.queue.clone(),
            Arc::new(QueuePendingSource::new(self.queue.clone())),
            self.chain.clone(),
            self.chain.clone(),
            &self.config,
        )
    }

    /// wizard pre-loaded with fresh balances, entry policy applied
    async fn enter_flow(&self, token: Token) -> Result<WizardState> {
        use gama_core::BalanceSource;

        let account = &self.config.account;
        let chain_id = &self.config.chain_id;
        let private = self
            .chain
            .balance(account, chain_id, PrivacyMode::Private)
            .await?;
        let public = self
            .chain
            .balance(account, chain_id, PrivacyMode::Public)
            .await?;
        let records = self.chain.spendable_records(account, chain_id).await?;

        let mut wizard = WizardState::new();
        wizard.set_token(token);
        wizard.set_balances(private, public, records);
        match wizard.apply_entry_policy() {
            FlowEntry::Ready => Ok(wizard),
            FlowEntry::Unavailable { spendable_records } => anyhow::bail!(
                "this flow needs public funds or at least two spendable private records \
                 (one pays the fee); found {} record(s)",
                spendable_records
            ),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(format!("gama={},gama_core={}", level, level))
        .init();

    let config_path = cli
        .config
        .unwrap_or_else(|| default_data_dir().join(CONFIG_FILE_NAME));

    match cli.command {
        Commands::Init {
            account,
            chain,
            data_dir,
            explorer,
        } => run_init(config_path, account, chain, data_dir, explorer),
        Commands::Balance { symbol, decimals } => {
            run_balance(&Wallet::open(&config_path)?, symbol, decimals).await
        }
        Commands::Send {
            to,
            amount,
            fee,
            memo,
            send_pool,
            receive_pool,
            fee_pool,
            delegate,
            token,
            symbol,
            decimals,
        } => {
            let wallet = Wallet::open(&config_path)?;
            run_send(
                &wallet,
                to,
                amount,
                fee,
                memo,
                send_pool,
                receive_pool,
                fee_pool,
                delegate,
                Token::new(token, symbol, decimals),
            )
            .await
        }
        Commands::Convert {
            amount,
            to_pool,
            fee,
            delegate,
            token,
            symbol,
            decimals,
        } => {
            let wallet = Wallet::open(&config_path)?;
            run_convert(
                &wallet,
                amount,
                to_pool,
                fee,
                delegate,
                Token::new(token, symbol, decimals),
            )
            .await
        }
        Commands::Queue { output } => run_queue(&Wallet::open(&config_path)?, output),
        Commands::Process => run_process(&Wallet::open(&config_path)?).await,
        Commands::Activity { output } => run_activity(&Wallet::open(&config_path)?, output).await,
        Commands::Cancel { key } => run_cancel(&Wallet::open(&config_path)?, key).await,
    }
}

fn run_init(
    config_path: PathBuf,
    account: String,
    chain: String,
    data_dir: Option<PathBuf>,
    explorer: Option<String>,
) -> Result<()> {
    if config_path.exists() {
        anyhow::bail!(
            "config already exists at {}, edit it instead",
            config_path.display()
        );
    }

    let mut config = WalletConfig::new(Account::from(account.as_str()), ChainId::from(chain.as_str()));
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    config.explorer_base = explorer;
    config.save(&config_path)?;

    println!("wrote {}", config_path.display());
    println!("data dir: {}", config.data_dir.display());
    Ok(())
}

async fn run_balance(wallet: &Wallet, symbol: String, decimals: u8) -> Result<()> {
    use gama_core::BalanceSource;

    let account = &wallet.config.account;
    let chain_id = &wallet.config.chain_id;
    let private = wallet
        .chain
        .balance(account, chain_id, PrivacyMode::Private)
        .await?;
    let public = wallet
        .chain
        .balance(account, chain_id, PrivacyMode::Public)
        .await?;
    let records = wallet.chain.spendable_records(account, chain_id).await?;

    println!("private  {} {}", format_minor(private, decimals), symbol);
    println!("public   {} {}", format_minor(public, decimals), symbol);
    println!("spendable records: {}", records);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_send(
    wallet: &Wallet,
    to: String,
    amount: String,
    fee: String,
    memo: Option<String>,
    send_pool: Option<Pool>,
    receive_pool: Option<Pool>,
    fee_pool: Option<Pool>,
    delegate: bool,
    token: Token,
) -> Result<()> {
    let mut wizard = wallet.enter_flow(token).await?;

    // explicit pool choices override the defaults the policy picked
    if let Some(pool) = send_pool {
        wizard.set_send_type(pool.into());
    }
    if let Some(pool) = receive_pool {
        wizard.set_received_type(pool.into());
    }
    if let Some(pool) = fee_pool {
        wizard.set_fee_type(pool.into());
    }

    let opts = wizard.fee_options();
    if wizard.fee_type.is_private() && !opts.private_enabled {
        anyhow::bail!("the private pool cannot pay the fee with a single spendable record");
    }
    if !wizard.fee_type.is_private() && !opts.public_enabled {
        anyhow::bail!("the public pool cannot pay the fee right now");
    }

    if !wizard.set_amount(&amount) {
        anyhow::bail!(
            "amount {} exceeds the spendable {} balance of {}",
            amount,
            wizard.send_type,
            format_minor(wizard.available_balance(), wizard.precision())
        );
    }
    if !wizard.set_fee(&fee) {
        anyhow::bail!("fee {} is not a valid amount", fee);
    }
    wizard.set_recipient(&to);
    if let Some(memo) = memo {
        wizard.set_memo(memo);
    }
    wizard.set_delegate(delegate);

    let tx = QueuedTransaction::from_wizard(&wizard, TransferKind::Transfer).ok_or_else(|| {
        anyhow::anyhow!("transfer is incomplete: a nonzero amount and a recipient are required")
    })?;
    info!(
        "queueing {} {} to {}",
        format_minor(tx.amount, wizard.precision()),
        tx.token.symbol,
        tx.recipient
    );
    let id = wallet.queue.enqueue(tx)?;

    println!("queued transfer {}", id);
    println!("run `gama process` to generate and submit");
    Ok(())
}

async fn run_convert(
    wallet: &Wallet,
    amount: String,
    to_pool: Pool,
    fee: String,
    delegate: bool,
    token: Token,
) -> Result<()> {
    let mut wizard = wallet.enter_flow(token).await?;

    // a convert spends from one pool and credits the other
    let target: PrivacyMode = to_pool.into();
    wizard.set_send_type(target.flipped());
    wizard.set_received_type(target);

    let opts = wizard.fee_options();
    if wizard.fee_type.is_private() && !opts.private_enabled {
        anyhow::bail!("the private pool cannot pay the fee with a single spendable record");
    }
    if !wizard.fee_type.is_private() && !opts.public_enabled {
        anyhow::bail!("the public pool cannot pay the fee right now");
    }

    if !wizard.set_amount(&amount) {
        anyhow::bail!(
            "amount {} exceeds the spendable {} balance of {}",
            amount,
            wizard.send_type,
            format_minor(wizard.available_balance(), wizard.precision())
        );
    }
    if !wizard.set_fee(&fee) {
        anyhow::bail!("fee {} is not a valid amount", fee);
    }
    wizard.set_delegate(delegate);

    let tx = QueuedTransaction::from_wizard(&wizard, TransferKind::Convert)
        .ok_or_else(|| anyhow::anyhow!("convert is incomplete: a nonzero amount is required"))?;
    let id = wallet.queue.enqueue(tx)?;

    println!("queued convert {} ({} pool)", id, target);
    println!("run `gama process` to generate and submit");
    Ok(())
}

fn run_queue(wallet: &Wallet, output: String) -> Result<()> {
    let items = wallet.queue.list()?;

    if output == "json" {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("queue is empty");
        return Ok(());
    }
    for tx in &items {
        println!(
            "{}  {} {} {} to {}",
            tx.id,
            tx.kind,
            format_minor(tx.amount, tx.token.decimals),
            tx.token.symbol,
            tx.recipient
        );
        match &tx.status {
            QueueStatus::Queued => println!("    queued"),
            QueueStatus::Failed { message, attempts } => {
                println!("    failed after {} attempt(s): {}", attempts, message)
            }
        }
    }
    Ok(())
}

async fn run_process(wallet: &Wallet) -> Result<()> {
    let outcome = wallet.queue.process_all(wallet.chain.as_ref()).await?;

    if outcome.is_empty() {
        println!("queue is empty");
        return Ok(());
    }
    println!("submitted {} transaction(s)", outcome.succeeded.len());
    for (id, err) in &outcome.failed {
        println!("failed {}: {}", id, err);
    }

    if !outcome.failed.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_activity(wallet: &Wallet, output: String) -> Result<()> {
    let feed = wallet.feed();
    feed.poll_pending_once().await;
    feed.poll_confirmed_once().await;
    let rows = feed.snapshot().await;

    if output == "json" {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("no activity yet");
        return Ok(());
    }
    for row in &rows {
        let mut line = format!("[{}] {}", kind_label(row.kind), row.message);
        if !row.address.is_empty() {
            line.push_str(" to ");
            line.push_str(&row.address);
        }
        if let Some(detail) = &row.secondary {
            line.push_str(&format!(" ({})", detail));
        }
        if row.cancellable {
            line.push_str("  [cancellable]");
        }
        println!("{}", line);
        println!("    key: {}", row.key);
        if let Some(link) = &row.explorer_link {
            println!("    {}", link);
        }
    }
    Ok(())
}

async fn run_cancel(wallet: &Wallet, key: String) -> Result<()> {
    let feed = wallet.feed();
    if feed.cancel(&key).await? {
        println!("cancelled {}", key);
        Ok(())
    } else {
        println!("nothing cancellable under {}", key);
        std::process::exit(1);
    }
}

fn kind_label(kind: ActivityKind) -> &'static str {
    match kind {
        ActivityKind::Pending => "pending",
        ActivityKind::Processing => "processing",
        ActivityKind::Completed => "completed",
        ActivityKind::Failed => "failed",
        ActivityKind::Cancelled => "cancelled",
    }
}

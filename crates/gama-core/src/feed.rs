//! activity feed
//!
//! keeps two caches warm, a fast local pending one and a slower on-chain
//! confirmed one, and merges them into the single list the activity
//! screen renders. a failed poll never clears a cache: the feed keeps
//! showing the last good snapshot and tries again next tick.

use crate::activity::{merge_activities, Activity};
use crate::client::{ConfirmedSource, PendingSource, ProvingClient};
use crate::config::WalletConfig;
use crate::error::Result;
use crate::queue::TxQueue;
use crate::types::{Account, ChainId, TxId};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct ActivityFeed {
    queue: Arc<TxQueue>,
    pending_source: Arc<dyn PendingSource>,
    confirmed_source: Arc<dyn ConfirmedSource>,
    proving: Arc<dyn ProvingClient>,
    account: Account,
    chain: ChainId,
    program_filter: Option<String>,
    explorer_base: Option<String>,
    pending_interval: Duration,
    confirmed_interval: Duration,
    pending_cache: RwLock<Vec<Activity>>,
    confirmed_cache: RwLock<Vec<Activity>>,
    refresh_pending: Notify,
}

impl ActivityFeed {
    pub fn new(
        queue: Arc<TxQueue>,
        pending_source: Arc<dyn PendingSource>,
        confirmed_source: Arc<dyn ConfirmedSource>,
        proving: Arc<dyn ProvingClient>,
        config: &WalletConfig,
    ) -> Self {
        Self {
            queue,
            pending_source,
            confirmed_source,
            proving,
            account: config.account.clone(),
            chain: config.chain_id.clone(),
            program_filter: config.program_filter.clone(),
            explorer_base: config.explorer_base.clone(),
            pending_interval: Duration::from_secs(config.pending_poll_secs),
            confirmed_interval: Duration::from_secs(config.confirmed_poll_secs),
            pending_cache: RwLock::new(Vec::new()),
            confirmed_cache: RwLock::new(Vec::new()),
            refresh_pending: Notify::new(),
        }
    }

    /// fetch the pending stream once; on error the cache stays put
    pub async fn poll_pending_once(&self) {
        match self
            .pending_source
            .fetch_pending(&self.account, &self.chain)
            .await
        {
            Ok(rows) => {
                debug!("pending feed refreshed, {} row(s)", rows.len());
                *self.pending_cache.write().await = rows;
            }
            Err(e) => warn!("pending fetch failed, keeping last snapshot: {}", e),
        }
    }

    /// fetch confirmed history once; prunes submissions the chain now
    /// reports and refreshes the pending cache when anything was pruned
    pub async fn poll_confirmed_once(&self) {
        match self
            .confirmed_source
            .fetch_confirmed(&self.account, &self.chain, self.program_filter.as_deref())
            .await
        {
            Ok(rows) => {
                debug!("confirmed feed refreshed, {} row(s)", rows.len());
                let keys: HashSet<String> = rows.iter().map(|a| a.key.clone()).collect();
                match self.queue.prune_submitted(&keys) {
                    Ok(n) if n > 0 => self.poll_pending_once().await,
                    Ok(_) => {}
                    Err(e) => warn!("failed to prune confirmed submissions: {}", e),
                }
                *self.confirmed_cache.write().await = rows;
            }
            Err(e) => warn!("confirmed fetch failed, keeping last snapshot: {}", e),
        }
    }

    /// the merged list: pending on top in submission order, confirmed
    /// below newest first
    pub async fn snapshot(&self) -> Vec<Activity> {
        let pending = self.pending_cache.read().await;
        let confirmed = self.confirmed_cache.read().await;
        let mut merged = merge_activities(&pending, &confirmed);
        if let Some(base) = &self.explorer_base {
            for row in &mut merged {
                if row.explorer_link.is_none() {
                    if let Some(tx_id) = &row.tx_id {
                        row.explorer_link = Some(format!("{}/transaction/{}", base, tx_id));
                    }
                }
            }
        }
        merged
    }

    /// cancel the work behind a feed row
    ///
    /// still queued: the item is removed before generation starts. already
    /// submitted: the chain-side cancel is requested and the row goes
    /// terminal as cancelled; cancelling a terminal row dismisses it. a
    /// row mid-generation is left alone and this returns false. either
    /// way the pending cache is refreshed before returning.
    pub async fn cancel(&self, key: &str) -> Result<bool> {
        let id = TxId::from(key);

        if self.queue.cancel(&id).await? {
            self.poll_pending_once().await;
            return Ok(true);
        }

        if let Some(record) = self.queue.find_submitted(&id)? {
            if record.cancelled {
                self.queue.dismiss_submitted(&id)?;
            } else {
                self.proving.cancel_submitted(&record.chain_tx_id).await?;
                self.queue.mark_submitted_cancelled(&id)?;
            }
            self.poll_pending_once().await;
            return Ok(true);
        }

        debug!("cancel {}: nothing cancellable", key);
        Ok(false)
    }

    /// wake the pending loop ahead of its next tick
    pub fn refresh_pending_now(&self) {
        self.refresh_pending.notify_one();
    }

    pub async fn run_pending_loop(&self) {
        let mut ticker = tokio::time::interval(self.pending_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.refresh_pending.notified() => {}
            }
            self.poll_pending_once().await;
        }
    }

    pub async fn run_confirmed_loop(&self) {
        let mut ticker = tokio::time::interval(self.confirmed_interval);
        loop {
            ticker.tick().await;
            self.poll_confirmed_once().await;
        }
    }

    /// start both poll loops on the runtime
    pub fn spawn(self: &Arc<Self>) -> (JoinHandle<()>, JoinHandle<()>) {
        info!(
            "starting activity feed: pending every {:?}, confirmed every {:?}",
            self.pending_interval, self.confirmed_interval
        );
        let pending = {
            let feed = self.clone();
            tokio::spawn(async move { feed.run_pending_loop().await })
        };
        let confirmed = {
            let feed = self.clone();
            tokio::spawn(async move { feed.run_confirmed_loop().await })
        };
        (pending, confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityKind;
    use crate::amount::Amount;
    use crate::client::{QueuePendingSource, Submission};
    use crate::error::GamaError;
    use crate::queue::{QueueStatus, QueuedTransaction};
    use crate::types::{unix_now, PrivacyMode, Token, TransferKind};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::tempdir;

    struct OkProver;

    #[async_trait]
    impl ProvingClient for OkProver {
        async fn generate_and_submit(
            &self,
            tx: &QueuedTransaction,
        ) -> crate::error::Result<Submission> {
            Ok(Submission {
                tx_id: TxId(format!("at1{}", tx.id.as_str())),
            })
        }

        async fn cancel_submitted(&self, _tx_id: &TxId) -> crate::error::Result<()> {
            Ok(())
        }
    }

    /// scripted confirmed history with a failure switch
    struct ScriptedConfirmed {
        rows: RwLock<Vec<Activity>>,
        failing: AtomicBool,
    }

    impl ScriptedConfirmed {
        fn new() -> Self {
            Self {
                rows: RwLock::new(Vec::new()),
                failing: AtomicBool::new(false),
            }
        }

        async fn set_rows(&self, rows: Vec<Activity>) {
            *self.rows.write().await = rows;
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ConfirmedSource for ScriptedConfirmed {
        async fn fetch_confirmed(
            &self,
            _account: &Account,
            _chain: &ChainId,
            _program_filter: Option<&str>,
        ) -> crate::error::Result<Vec<Activity>> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(GamaError::Client("endpoint unreachable".into()));
            }
            Ok(self.rows.read().await.clone())
        }
    }

    fn queued(recipient: &str) -> QueuedTransaction {
        QueuedTransaction {
            id: TxId::generate(),
            seq: 0,
            kind: TransferKind::Transfer,
            token: Token::new("credits.gama", "GAMA", 6),
            recipient: recipient.to_string(),
            amount: Amount(1_000_000),
            memo: None,
            send_type: PrivacyMode::Public,
            received_type: PrivacyMode::Public,
            fee: Amount(5_000),
            fee_type: PrivacyMode::Public,
            delegate: false,
            status: QueueStatus::Queued,
            created_at: unix_now(),
        }
    }

    fn confirmed_row(key: &str, ts: u64) -> Activity {
        let mut a = Activity::new(key, ActivityKind::Completed);
        a.timestamp = Some(ts);
        a
    }

    struct Fixture {
        queue: Arc<TxQueue>,
        confirmed: Arc<ScriptedConfirmed>,
        feed: ActivityFeed,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let queue = Arc::new(TxQueue::open(dir.path()).unwrap());
        let confirmed = Arc::new(ScriptedConfirmed::new());
        let mut config =
            WalletConfig::new(Account::from("aleo1self"), ChainId::from("testnet"));
        config.explorer_base = Some("https://scan.gama.rs".to_string());
        let feed = ActivityFeed::new(
            queue.clone(),
            Arc::new(QueuePendingSource::new(queue.clone())),
            confirmed.clone(),
            Arc::new(OkProver),
            &config,
        );
        Fixture {
            queue,
            confirmed,
            feed,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_snapshot_merges_pending_on_top() {
        let fx = fixture();
        fx.queue.enqueue(queued("aleo1bob")).unwrap();
        fx.confirmed
            .set_rows(vec![confirmed_row("at1old", 100)])
            .await;

        fx.feed.poll_pending_once().await;
        fx.feed.poll_confirmed_once().await;

        let rows = fx.feed.snapshot().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].kind, ActivityKind::Pending);
        assert_eq!(rows[1].key, "at1old");
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_last_snapshot() {
        let fx = fixture();
        fx.confirmed
            .set_rows(vec![confirmed_row("at1keep", 100)])
            .await;
        fx.feed.poll_confirmed_once().await;
        assert_eq!(fx.feed.snapshot().await.len(), 1);

        fx.confirmed.set_failing(true);
        fx.feed.poll_confirmed_once().await;

        // the endpoint failing must not blank the feed
        let rows = fx.feed.snapshot().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "at1keep");
    }

    #[tokio::test]
    async fn test_cancel_pending_refetches_immediately() {
        let fx = fixture();
        let id = fx.queue.enqueue(queued("aleo1bob")).unwrap();
        fx.feed.poll_pending_once().await;
        assert_eq!(fx.feed.snapshot().await.len(), 1);

        assert!(fx.feed.cancel(id.as_str()).await.unwrap());
        // no explicit poll here: cancel already refreshed the cache
        assert!(fx.feed.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_unknown_key_is_noop() {
        let fx = fixture();
        assert!(!fx.feed.cancel("at1nothing").await.unwrap());
    }

    #[tokio::test]
    async fn test_confirmation_prunes_submitted_row() {
        let fx = fixture();
        let id = fx.queue.enqueue(queued("aleo1bob")).unwrap();
        fx.queue.process_all(&OkProver).await.unwrap();
        fx.feed.poll_pending_once().await;

        let rows = fx.feed.snapshot().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, ActivityKind::Processing);
        let chain_key = rows[0].key.clone();

        // the chain now reports it confirmed
        fx.confirmed
            .set_rows(vec![confirmed_row(&chain_key, unix_now())])
            .await;
        fx.feed.poll_confirmed_once().await;

        let rows = fx.feed.snapshot().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, ActivityKind::Completed);
        assert!(fx.queue.find_submitted(&id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_submitted_goes_terminal_then_dismisses() {
        let fx = fixture();
        let id = fx.queue.enqueue(queued("aleo1bob")).unwrap();
        fx.queue.process_all(&OkProver).await.unwrap();
        fx.feed.poll_pending_once().await;

        // first cancel: chain-side cancel requested, row goes terminal
        assert!(fx.feed.cancel(id.as_str()).await.unwrap());
        let rows = fx.feed.snapshot().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, ActivityKind::Cancelled);

        // second cancel on the terminal row dismisses it
        assert!(fx.feed.cancel(id.as_str()).await.unwrap());
        assert!(fx.feed.snapshot().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_loop_ticks_and_honors_nudge() {
        let Fixture {
            queue,
            feed,
            _dir: dir,
            ..
        } = fixture();
        let feed = Arc::new(feed);
        let id = queue.enqueue(queued("aleo1bob")).unwrap();

        let (pending_loop, confirmed_loop) = feed.spawn();

        // the first interval tick fires as soon as the loop starts
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(feed.snapshot().await.len(), 1);

        // cancel behind the feed's back, then nudge instead of waiting
        // out the poll interval
        assert!(queue.cancel(&id).await.unwrap());
        feed.refresh_pending_now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(feed.snapshot().await.is_empty());

        pending_loop.abort();
        confirmed_loop.abort();
        drop(dir);
    }

    #[tokio::test]
    async fn test_explorer_links_attached() {
        let fx = fixture();
        fx.queue.enqueue(queued("aleo1bob")).unwrap();
        fx.feed.poll_pending_once().await;

        let rows = fx.feed.snapshot().await;
        let link = rows[0].explorer_link.as_deref().unwrap();
        assert!(link.starts_with("https://scan.gama.rs/transaction/"));
    }
}

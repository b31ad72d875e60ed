//! activity entries and feed merging
//!
//! display-ready rows for the activity screen. entries are ephemeral view
//! values, rebuilt on every refresh from the pending and confirmed sources.

use crate::amount::Amount;
use crate::types::TxId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// lifecycle stage of an activity row
///
/// the discriminants are the display sort ordinals: within one timestamp,
/// earlier stages sort first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActivityKind {
    Pending = 1,
    Processing = 2,
    Completed = 3,
    Failed = 4,
    Cancelled = 5,
}

impl ActivityKind {
    pub fn ordinal(&self) -> u8 {
        *self as u8
    }
}

/// one row of the activity feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// dedup identity: local tx id until the chain assigns one
    pub key: String,
    /// counterparty address
    pub address: String,
    /// unix seconds; queue-backed rows use enqueue time
    pub timestamp: Option<u64>,
    /// primary label, e.g. "sent" or "convert"
    pub message: String,
    pub kind: ActivityKind,
    /// token symbol when known
    pub token: Option<String>,
    /// memo or failure detail
    pub secondary: Option<String>,
    pub explorer_link: Option<String>,
    pub tx_id: Option<TxId>,
    pub fee: Option<Amount>,
    /// set only on rows still cancellable through the feed
    pub cancellable: bool,
}

impl Activity {
    pub fn new(key: impl Into<String>, kind: ActivityKind) -> Self {
        Self {
            key: key.into(),
            address: String::new(),
            timestamp: None,
            message: String::new(),
            kind,
            token: None,
            secondary: None,
            explorer_link: None,
            tx_id: None,
            fee: None,
            cancellable: false,
        }
    }
}

/// merge the pending stream into the confirmed history
///
/// pending rows keep their submission order and go on top, untouched.
/// confirmed rows are sorted newest first, ties broken by lifecycle stage.
/// when both sources carry the same key the confirmed row wins.
pub fn merge_activities(pending: &[Activity], confirmed: &[Activity]) -> Vec<Activity> {
    let mut confirmed: Vec<Activity> = confirmed.to_vec();
    confirmed.sort_by(|a, b| {
        b.timestamp
            .unwrap_or(0)
            .cmp(&a.timestamp.unwrap_or(0))
            .then(a.kind.ordinal().cmp(&b.kind.ordinal()))
    });

    let confirmed_keys: HashSet<&str> = confirmed.iter().map(|a| a.key.as_str()).collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::with_capacity(pending.len() + confirmed.len());
    for a in pending {
        if confirmed_keys.contains(a.key.as_str()) || !seen.insert(a.key.clone()) {
            continue;
        }
        merged.push(a.clone());
    }
    for a in confirmed {
        if !seen.insert(a.key.clone()) {
            continue;
        }
        merged.push(a);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, kind: ActivityKind, ts: Option<u64>) -> Activity {
        let mut a = Activity::new(key, kind);
        a.timestamp = ts;
        a
    }

    #[test]
    fn test_ordinals() {
        assert_eq!(ActivityKind::Pending.ordinal(), 1);
        assert_eq!(ActivityKind::Processing.ordinal(), 2);
        assert_eq!(ActivityKind::Completed.ordinal(), 3);
        assert_eq!(ActivityKind::Failed.ordinal(), 4);
        assert_eq!(ActivityKind::Cancelled.ordinal(), 5);
        assert!(ActivityKind::Pending < ActivityKind::Completed);
    }

    #[test]
    fn test_confirmed_sorted_newest_first_stage_breaks_ties() {
        let confirmed = vec![
            row("a", ActivityKind::Completed, Some(100)),
            row("b", ActivityKind::Processing, Some(200)),
            row("c", ActivityKind::Processing, Some(100)),
            row("d", ActivityKind::Completed, Some(200)),
        ];
        let merged = merge_activities(&[], &confirmed);
        let keys: Vec<&str> = merged.iter().map(|a| a.key.as_str()).collect();
        // ts 200 first; within each ts the lower ordinal leads
        assert_eq!(keys, vec!["b", "d", "c", "a"]);
    }

    #[test]
    fn test_pending_order_is_preserved() {
        // timestamps deliberately out of order: pending rows must keep
        // their submission order, newest-first sorting never applies
        let pending = vec![
            row("p1", ActivityKind::Pending, Some(50)),
            row("p2", ActivityKind::Pending, Some(500)),
            row("p3", ActivityKind::Pending, Some(5)),
        ];
        let confirmed = vec![row("c1", ActivityKind::Completed, Some(1000))];
        let merged = merge_activities(&pending, &confirmed);
        let keys: Vec<&str> = merged.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["p1", "p2", "p3", "c1"]);
    }

    #[test]
    fn test_dedup_confirmed_wins() {
        let pending = vec![row("x", ActivityKind::Processing, Some(10))];
        let confirmed = vec![row("x", ActivityKind::Completed, Some(20))];
        let merged = merge_activities(&pending, &confirmed);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].kind, ActivityKind::Completed);
    }

    #[test]
    fn test_dedup_within_pending_keeps_first() {
        let pending = vec![
            row("x", ActivityKind::Pending, Some(10)),
            row("x", ActivityKind::Processing, Some(20)),
        ];
        let merged = merge_activities(&pending, &[]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].kind, ActivityKind::Pending);
    }

    #[test]
    fn test_missing_timestamp_sorts_oldest() {
        let confirmed = vec![
            row("no_ts", ActivityKind::Completed, None),
            row("ts", ActivityKind::Completed, Some(1)),
        ];
        let merged = merge_activities(&[], &confirmed);
        assert_eq!(merged[0].key, "ts");
        assert_eq!(merged[1].key, "no_ts");
    }
}

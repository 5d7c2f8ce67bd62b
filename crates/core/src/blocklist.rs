//! Temporary suppression of failing providers.
//!
//! At most one entry exists per provider. Expired entries are only removed
//! when they are looked at; nothing sweeps the ledger in the background.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::SearchSettings;
use crate::metrics::PROVIDERS_BLOCKED;

/// One suppressed provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlocklistEntry {
    pub provider: String,
    /// The provider may be contacted again from this instant on.
    pub resume: DateTime<Utc>,
    pub reason: String,
}

/// Process-wide ledger of blocked providers, shared by every aggregation round.
#[derive(Debug)]
pub struct Blocklist {
    cooldown_secs: u64,
    reason_max_len: usize,
    entries: Mutex<HashMap<String, BlocklistEntry>>,
}

impl Blocklist {
    /// Create a ledger. A zero cooldown turns [`Blocklist::block`] into a no-op.
    pub fn new(cooldown_secs: u64, reason_max_len: usize) -> Self {
        Self {
            cooldown_secs,
            reason_max_len,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &SearchSettings) -> Self {
        Self::new(settings.blocklist_timer_secs, settings.reason_max_len)
    }

    pub async fn is_blocked(&self, provider: &str) -> bool {
        self.is_blocked_at(provider, Utc::now()).await
    }

    /// True iff an unexpired entry exists; an expired one is removed.
    pub async fn is_blocked_at(&self, provider: &str, now: DateTime<Utc>) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.get(provider) {
            Some(entry) if now < entry.resume => true,
            Some(_) => {
                debug!(provider = provider, "Blocklist entry expired");
                entries.remove(provider);
                false
            }
            None => false,
        }
    }

    pub async fn block(&self, provider: &str, reason: &str) -> Option<BlocklistEntry> {
        self.block_at(provider, reason, Utc::now()).await
    }

    /// Insert or replace the entry for `provider`.
    ///
    /// Returns the new entry, or `None` when blocking is disabled.
    pub async fn block_at(
        &self,
        provider: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Option<BlocklistEntry> {
        let reason = truncate_reason(reason, self.reason_max_len);

        if self.cooldown_secs == 0 {
            debug!(
                provider = provider,
                reason = %reason,
                "Not blocking provider as timer is zero"
            );
            return None;
        }

        let minutes = self.cooldown_secs.div_ceil(60);
        info!(
            provider = provider,
            minutes = minutes,
            reason = %reason,
            "Blocking provider"
        );

        let entry = BlocklistEntry {
            provider: provider.to_string(),
            resume: now + Duration::seconds(self.cooldown_secs as i64),
            reason,
        };

        let mut entries = self.entries.lock().await;
        entries.insert(provider.to_string(), entry.clone());
        PROVIDERS_BLOCKED.inc();
        debug!(entries = entries.len(), "Provider blocklist updated");

        Some(entry)
    }

    /// Unexpired entries, purging the expired ones.
    pub async fn entries(&self) -> Vec<BlocklistEntry> {
        self.entries_at(Utc::now()).await
    }

    pub async fn entries_at(&self, now: DateTime<Utc>) -> Vec<BlocklistEntry> {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, e| now < e.resume);
        let mut list: Vec<_> = entries.values().cloned().collect();
        list.sort_by(|a, b| a.resume.cmp(&b.resume));
        list
    }

    /// Raw entry count, expired entries included.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn truncate_reason(reason: &str, max_len: usize) -> String {
    if reason.chars().count() > max_len {
        let mut short: String = reason.chars().take(max_len).collect();
        short.push_str("...");
        short
    } else {
        reason.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_block_twice_keeps_one_entry_with_latest_resume() {
        let ledger = Blocklist::new(3600, 40);
        ledger.block_at("geek", "timeout", t0()).await;
        let later = t0() + Duration::minutes(10);
        ledger.block_at("geek", "HTTP 500", later).await;

        assert_eq!(ledger.len().await, 1);
        let entries = ledger.entries_at(later).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].resume, later + Duration::seconds(3600));
        assert_eq!(entries[0].reason, "HTTP 500");
    }

    #[tokio::test]
    async fn test_blocked_until_resume() {
        let ledger = Blocklist::new(60, 40);
        ledger.block_at("geek", "down", t0()).await;

        assert!(ledger.is_blocked_at("geek", t0()).await);
        assert!(ledger.is_blocked_at("geek", t0() + Duration::seconds(59)).await);
        assert!(!ledger.is_blocked_at("other", t0()).await);
    }

    #[tokio::test]
    async fn test_expired_entry_is_purged_on_check() {
        let ledger = Blocklist::new(60, 40);
        ledger.block_at("geek", "down", t0()).await;

        // resume == now counts as expired
        let resume = t0() + Duration::seconds(60);
        assert!(!ledger.is_blocked_at("geek", resume).await);
        assert_eq!(ledger.len().await, 0);
        assert!(!ledger.is_blocked_at("geek", resume).await);
    }

    #[tokio::test]
    async fn test_expired_entry_stays_until_checked() {
        let ledger = Blocklist::new(60, 40);
        ledger.block_at("a", "down", t0()).await;
        ledger.block_at("b", "down", t0()).await;

        let later = t0() + Duration::hours(1);
        assert!(!ledger.is_blocked_at("a", later).await);
        // "b" expired too but was never looked at
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn test_zero_timer_disables_blocking() {
        let ledger = Blocklist::new(0, 40);
        let entry = ledger.block_at("geek", "down", t0()).await;

        assert!(entry.is_none());
        assert!(ledger.is_empty().await);
        assert!(!ledger.is_blocked_at("geek", t0()).await);
    }

    #[tokio::test]
    async fn test_reason_is_truncated() {
        let ledger = Blocklist::new(60, 10);
        let entry = ledger
            .block_at("geek", "a very long failure description", t0())
            .await
            .unwrap();
        assert_eq!(entry.reason, "a very lon...");
    }

    #[tokio::test]
    async fn test_entries_skips_expired() {
        let ledger = Blocklist::new(60, 40);
        ledger.block_at("old", "down", t0()).await;
        ledger
            .block_at("new", "down", t0() + Duration::seconds(50))
            .await;

        let entries = ledger.entries_at(t0() + Duration::seconds(70)).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].provider, "new");
        assert_eq!(ledger.len().await, 1);
    }

    #[test]
    fn test_truncate_reason_multibyte() {
        assert_eq!(truncate_reason("ééééé", 3), "ééé...");
        assert_eq!(truncate_reason("short", 40), "short");
    }
}

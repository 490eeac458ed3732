//! Stats provider seam over the hiscores client.

use async_trait::async_trait;
use osrs_hiscores::{HiscoresClient, HiscoresError, Snapshot};

/// Source of per-account stat snapshots. `account_key` is already
/// normalized.
#[async_trait]
pub trait StatsProvider: Send + Sync {
    async fn lookup(&self, account_key: &str) -> Result<Snapshot, HiscoresError>;
}

#[async_trait]
impl StatsProvider for HiscoresClient {
    async fn lookup(&self, account_key: &str) -> Result<Snapshot, HiscoresError> {
        HiscoresClient::lookup(self, account_key).await
    }
}

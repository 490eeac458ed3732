//! Concurrent, failure-tolerant snapshot retrieval for a roster.

use std::sync::Arc;
use std::time::Duration;

use osrs_hiscores::Snapshot;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::model::Member;
use crate::provider::StatsProvider;

/// Snapshots for the members that resolved, plus the keys of those that
/// did not.
#[derive(Debug, Default)]
pub struct FetchResult {
    /// Sorted by account key.
    pub snapshots: Vec<(Member, Snapshot)>,
    /// Sorted account keys.
    pub failed: Vec<String>,
}

#[derive(Clone)]
pub struct StatFetcher {
    provider: Arc<dyn StatsProvider>,
    concurrency: usize,
    lookup_timeout: Duration,
}

impl StatFetcher {
    pub fn new(provider: Arc<dyn StatsProvider>, concurrency: usize, lookup_timeout: Duration) -> Self {
        Self {
            provider,
            concurrency: concurrency.max(1),
            lookup_timeout,
        }
    }

    /// Look up every member concurrently. Individual failures (unknown
    /// account, transport error, timeout, cancellation) are logged and
    /// reported in [`FetchResult::failed`]; they never fail the batch.
    pub async fn fetch(&self, members: Vec<Member>, cancel: &CancellationToken) -> FetchResult {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for member in members {
            let sem = semaphore.clone();
            let provider = self.provider.clone();
            let cancel = cancel.clone();
            let timeout = self.lookup_timeout;
            tasks.spawn(async move {
                let lookup = async {
                    let _permit = sem
                        .acquire()
                        .await
                        .map_err(|_| "semaphore closed".to_string())?;
                    match tokio::time::timeout(timeout, provider.lookup(&member.account_key)).await {
                        Ok(Ok(snapshot)) => Ok(snapshot),
                        Ok(Err(e)) => Err(e.to_string()),
                        Err(_) => Err(format!("lookup timed out after {}s", timeout.as_secs())),
                    }
                };
                let result = tokio::select! {
                    r = lookup => r,
                    _ = cancel.cancelled() => Err("cancelled".to_string()),
                };
                (member, result)
            });
        }

        let mut out = FetchResult::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((member, Ok(snapshot))) => out.snapshots.push((member, snapshot)),
                Ok((member, Err(reason))) => {
                    tracing::warn!(
                        group_id = %member.group_id,
                        account = %member.account_key,
                        %reason,
                        "excluding account from this run"
                    );
                    out.failed.push(member.account_key);
                }
                Err(e) => tracing::error!("lookup task join error: {e}"),
            }
        }
        out.snapshots
            .sort_by(|a, b| a.0.account_key.cmp(&b.0.account_key));
        out.failed.sort();
        out
    }
}

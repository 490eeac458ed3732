//! End-to-end leaderboard run for one group.
//!
//! ```text
//! load group + roster ─▶ reconcile ledger ─▶ fetch (fan-out) ─▶ publish (ordered fan-out)
//! ```
//!
//! Runs are single-flight per group and cancellable through
//! [`Pipeline::cancel`] or [`Pipeline::shutdown`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::catalog::ActivityCatalog;
use crate::chat::ChatPlatform;
use crate::config::Settings;
use crate::emoji::EmojiSet;
use crate::error::{LeaderboardError, Result};
use crate::fetcher::StatFetcher;
use crate::ledger::Ledger;
use crate::provider::StatsProvider;
use crate::publisher::{ActivityOutcome, OrderedPublisher};
use crate::store::Store;

// ---------------------------------------------------------------------------
// Options and report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_concurrent_lookups: usize,
    pub lookup_timeout: Duration,
    pub run_timeout: Duration,
    pub exclude_unranked: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl PipelineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_concurrent_lookups: settings.hiscores.max_concurrent_lookups,
            lookup_timeout: settings.hiscores_timeout(),
            run_timeout: settings.run_timeout(),
            exclude_unranked: settings.ranking.exclude_unranked,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub group_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub resolved_members: usize,
    /// Account keys whose lookup failed this run.
    pub failed_lookups: Vec<String>,
    /// Untracked activities whose messages were removed.
    pub pruned: Vec<String>,
    pub outcomes: Vec<ActivityOutcome>,
}

impl RunReport {
    /// Something was skipped over: an account lookup or an activity failed.
    pub fn is_degraded(&self) -> bool {
        !self.failed_lookups.is_empty() || self.outcomes.iter().any(|o| !o.status.is_success())
    }

    pub fn published(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, crate::publisher::PublishStatus::Published { .. }))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    store: Arc<dyn Store>,
    chat: Arc<dyn ChatPlatform>,
    ledger: Ledger,
    fetcher: StatFetcher,
    publisher: OrderedPublisher,
    run_timeout: Duration,
    inflight: Mutex<HashMap<String, CancellationToken>>,
    root: CancellationToken,
}

/// Clears the in-flight entry for a group when the run ends.
struct InflightGuard<'a> {
    pipeline: &'a Pipeline,
    group_id: String,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.pipeline.inflight().remove(&self.group_id);
    }
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn StatsProvider>,
        chat: Arc<dyn ChatPlatform>,
        catalog: Arc<ActivityCatalog>,
        emojis: Arc<EmojiSet>,
        options: PipelineOptions,
    ) -> Self {
        let ledger = Ledger::new(store.clone());
        Self {
            fetcher: StatFetcher::new(
                provider,
                options.max_concurrent_lookups,
                options.lookup_timeout,
            ),
            publisher: OrderedPublisher::new(
                chat.clone(),
                ledger.clone(),
                catalog,
                emojis,
                options.exclude_unranked,
            ),
            store,
            chat,
            ledger,
            run_timeout: options.run_timeout,
            inflight: Mutex::new(HashMap::new()),
            root: CancellationToken::new(),
        }
    }

    fn inflight(&self) -> MutexGuard<'_, HashMap<String, CancellationToken>> {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_running(&self, group_id: &str) -> bool {
        self.inflight().contains_key(group_id)
    }

    /// Cancel the in-flight run for `group_id`, if any.
    pub fn cancel(&self, group_id: &str) -> bool {
        match self.inflight().get(group_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every in-flight run and refuse new ones.
    pub fn shutdown(&self) {
        self.root.cancel();
    }

    /// Run the full pipeline for one group.
    ///
    /// Re-reads the group and its roster from the store, so a run always
    /// sees the latest configuration. Fails fast with
    /// [`LeaderboardError::RunInProgress`] if the group already has a run.
    pub async fn run(&self, group_id: &str) -> Result<RunReport> {
        if self.root.is_cancelled() {
            return Err(LeaderboardError::Cancelled(group_id.to_string()));
        }
        let cancel = {
            let mut inflight = self.inflight();
            if inflight.contains_key(group_id) {
                return Err(LeaderboardError::RunInProgress(group_id.to_string()));
            }
            let token = self.root.child_token();
            inflight.insert(group_id.to_string(), token.clone());
            token
        };
        let _guard = InflightGuard {
            pipeline: self,
            group_id: group_id.to_string(),
        };

        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline_run", %group_id, %run_id);
        self.run_inner(group_id, run_id, &cancel)
            .instrument(span)
            .await
    }

    async fn run_inner(&self, group_id: &str, run_id: Uuid, cancel: &CancellationToken) -> Result<RunReport> {
        let started_at = Utc::now();
        let deadline = Instant::now() + self.run_timeout;

        let group = self
            .store
            .group(group_id)?
            .ok_or_else(|| LeaderboardError::GroupNotFound(group_id.to_string()))?;
        if !group.enabled {
            return Err(LeaderboardError::GroupDisabled(group_id.to_string()));
        }

        let pruned = self.ledger.reconcile(&group, self.chat.as_ref()).await?;
        let members = self.store.members(group_id)?;
        tracing::info!(
            members = members.len(),
            activities = group.activities.len(),
            "leaderboard run started"
        );

        // Lookups still pending at the deadline are abandoned; the publish
        // phase then reports every activity as timed out.
        let fetch_cancel = cancel.child_token();
        let fetched = {
            let fetch = self.fetcher.fetch(members, &fetch_cancel);
            tokio::pin!(fetch);
            tokio::select! {
                fetched = &mut fetch => fetched,
                _ = tokio::time::sleep_until(deadline) => {
                    tracing::warn!("run deadline reached while fetching snapshots");
                    fetch_cancel.cancel();
                    fetch.await
                }
            }
        };
        if cancel.is_cancelled() {
            return Err(LeaderboardError::Cancelled(group_id.to_string()));
        }
        let resolved_members = fetched.snapshots.len();

        let outcomes = self
            .publisher
            .publish(&group, Arc::new(fetched.snapshots), deadline, cancel)
            .await;

        let report = RunReport {
            run_id,
            group_id: group_id.to_string(),
            started_at,
            finished_at: Utc::now(),
            resolved_members,
            failed_lookups: fetched.failed,
            pruned,
            outcomes,
        };
        if cancel.is_cancelled() {
            return Err(LeaderboardError::Cancelled(group_id.to_string()));
        }
        if report.is_degraded() {
            tracing::warn!(
                published = report.published(),
                failed_lookups = report.failed_lookups.len(),
                "leaderboard run finished degraded"
            );
        } else {
            tracing::info!(published = report.published(), "leaderboard run finished");
        }
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

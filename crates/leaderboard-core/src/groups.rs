//! Group configuration: validate, persist, tear down untracked messages.

use chrono::Utc;

use crate::catalog::ActivityCatalog;
use crate::chat::ChatPlatform;
use crate::error::{LeaderboardError, Result};
use crate::ledger::Ledger;
use crate::model::TrackedGroup;
use crate::scheduler::parse_schedule;
use crate::store::Store;

/// Upper bound on tracked activities per group.
pub const MAX_TRACKED_ACTIVITIES: usize = 10;

/// Administrator input for creating or updating a group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSettings {
    pub id: String,
    pub name: String,
    pub channel_id: String,
    pub schedule: String,
    pub activities: Vec<String>,
    pub edit_in_place: bool,
}

#[derive(Debug, Clone)]
pub struct Configured {
    pub group: TrackedGroup,
    /// Activities whose messages were removed because they are no longer
    /// tracked.
    pub pruned: Vec<String>,
}

/// Split a comma-separated activity list, trimming entries and dropping
/// blanks. Order is preserved.
pub fn parse_activity_list(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Check `settings`, collecting every problem into one
/// [`LeaderboardError::InvalidGroupConfig`].
pub async fn validate(settings: &GroupSettings, catalog: &ActivityCatalog) -> Result<()> {
    let mut issues: Vec<String> = Vec::new();

    if settings.id.trim().is_empty() {
        issues.push("group id must not be empty".into());
    }
    if settings.channel_id.trim().is_empty() {
        issues.push("channel must not be empty".into());
    }
    if let Err(e) = parse_schedule(&settings.schedule) {
        issues.push(e.to_string());
    }

    if settings.activities.is_empty() {
        issues.push("at least one activity is required".into());
    }
    if settings.activities.len() > MAX_TRACKED_ACTIVITIES {
        issues.push(format!(
            "at most {MAX_TRACKED_ACTIVITIES} activities can be tracked (got {})",
            settings.activities.len()
        ));
    }
    let mut seen: Vec<String> = Vec::new();
    for activity in &settings.activities {
        let folded = activity.trim().to_lowercase();
        if seen.contains(&folded) {
            issues.push(format!("duplicate activity: {}", activity.trim()));
        } else {
            seen.push(folded);
        }
    }

    match catalog.names().await {
        Ok(names) => {
            for activity in &settings.activities {
                if let Err(e) = names.classify(activity) {
                    issues.push(e.to_string());
                }
            }
        }
        Err(e) => issues.push(format!("could not load activity catalog: {e}")),
    }

    if issues.is_empty() {
        Ok(())
    } else {
        let list: String = issues.iter().map(|i| format!("\n  - {i}")).collect();
        Err(LeaderboardError::InvalidGroupConfig(list))
    }
}

/// Validate, persist the group (enabled), and reconcile its ledger so
/// removed activities lose their messages right away.
pub async fn configure_group(
    store: &dyn Store,
    ledger: &Ledger,
    catalog: &ActivityCatalog,
    chat: Option<&dyn ChatPlatform>,
    settings: GroupSettings,
) -> Result<Configured> {
    validate(&settings, catalog).await?;

    let group = TrackedGroup {
        id: settings.id.trim().to_string(),
        name: settings.name.trim().to_string(),
        channel_id: settings.channel_id.trim().to_string(),
        schedule: settings.schedule.trim().to_string(),
        activities: settings
            .activities
            .iter()
            .map(|a| a.trim().to_string())
            .collect(),
        edit_in_place: settings.edit_in_place,
        enabled: true,
        updated_at: Utc::now(),
    };
    store.put_group(&group)?;
    tracing::info!(
        group_id = %group.id,
        activities = group.activities.len(),
        schedule = %group.schedule,
        "group configured"
    );

    let pruned = match chat {
        Some(chat) => ledger.reconcile(&group, chat).await?,
        None => Vec::new(),
    };
    Ok(Configured { group, pruned })
}

/// Stop scheduling a group. Roster and ledger are kept.
pub fn disable_group(store: &dyn Store, group_id: &str) -> Result<TrackedGroup> {
    let mut group = store
        .group(group_id)?
        .ok_or_else(|| LeaderboardError::GroupNotFound(group_id.to_string()))?;
    group.enabled = false;
    group.updated_at = Utc::now();
    store.put_group(&group)?;
    tracing::info!(group_id = %group.id, "group disabled");
    Ok(group)
}

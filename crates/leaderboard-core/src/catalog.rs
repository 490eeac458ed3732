//! Known skill and activity names.
//!
//! The hiscores API has no catalog endpoint, so the catalog is read off a
//! lookup of a probe account and cached for the life of the process.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::error::{LeaderboardError, Result};
use crate::model::ActivityKind;
use crate::provider::StatsProvider;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogNames {
    pub skills: Vec<String>,
    pub activities: Vec<String>,
}

impl CatalogNames {
    /// Resolve a tracked name to its kind. Activities are checked before
    /// skills, both case-insensitively.
    pub fn classify(&self, name: &str) -> Result<ActivityKind> {
        let wanted = name.trim();
        let found = |list: &[String]| list.iter().any(|n| n.eq_ignore_ascii_case(wanted));
        if found(&self.activities) {
            Ok(ActivityKind::Activity)
        } else if found(&self.skills) {
            Ok(ActivityKind::Skill)
        } else {
            Err(LeaderboardError::UnknownActivity(wanted.to_string()))
        }
    }
}

pub struct ActivityCatalog {
    provider: Option<Arc<dyn StatsProvider>>,
    probe_account: String,
    cell: OnceCell<CatalogNames>,
}

impl ActivityCatalog {
    pub fn new(provider: Arc<dyn StatsProvider>, probe_account: impl Into<String>) -> Self {
        Self {
            provider: Some(provider),
            probe_account: probe_account.into(),
            cell: OnceCell::new(),
        }
    }

    /// A catalog with fixed contents that never touches the provider.
    pub fn from_names(skills: Vec<String>, activities: Vec<String>) -> Self {
        Self {
            provider: None,
            probe_account: String::new(),
            cell: OnceCell::from(CatalogNames { skills, activities }),
        }
    }

    /// Load on first use. A failed load is not cached, so the next call
    /// retries.
    pub async fn names(&self) -> Result<&CatalogNames> {
        self.cell
            .get_or_try_init(|| async {
                let provider = self.provider.as_ref().ok_or_else(|| {
                    LeaderboardError::InvalidSettings("catalog has no provider".into())
                })?;
                let snapshot = provider.lookup(&self.probe_account).await?;
                let names = CatalogNames {
                    skills: snapshot.skill_names(),
                    activities: snapshot.activity_names(),
                };
                tracing::debug!(
                    skills = names.skills.len(),
                    activities = names.activities.len(),
                    "activity catalog loaded"
                );
                Ok::<_, LeaderboardError>(names)
            })
            .await
    }

    pub async fn classify(&self, name: &str) -> Result<ActivityKind> {
        self.names().await?.classify(name)
    }
}

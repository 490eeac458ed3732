use crate::error::{LeaderboardError, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// HiscoresSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiscoresSettings {
    #[serde(default = "default_hiscores_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_lookups: usize,
    /// Account whose lookup is used to learn the skill and activity names.
    #[serde(default = "default_probe_account")]
    pub probe_account: String,
}

fn default_hiscores_url() -> String {
    osrs_hiscores::HiscoresClient::DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_concurrent() -> usize {
    8
}

fn default_probe_account() -> String {
    "sample".to_string()
}

impl Default for HiscoresSettings {
    fn default() -> Self {
        Self {
            base_url: default_hiscores_url(),
            timeout_secs: default_timeout_secs(),
            max_concurrent_lookups: default_max_concurrent(),
            probe_account: default_probe_account(),
        }
    }
}

// ---------------------------------------------------------------------------
// DiscordSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscordSettings {
    #[serde(default = "default_discord_api")]
    pub api_base: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_discord_api() -> String {
    crate::discord::DiscordChat::DEFAULT_API_BASE.to_string()
}

impl Default for DiscordSettings {
    fn default() -> Self {
        Self {
            api_base: default_discord_api(),
            token: None,
            application_id: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Ranking / pipeline / scheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingSettings {
    #[serde(default = "default_true")]
    pub exclude_unranked: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            exclude_unranked: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Upper bound on a whole run, fetch through the last publish.
    #[serde(default = "default_run_timeout")]
    pub run_timeout_secs: u64,
}

fn default_run_timeout() -> u64 {
    600
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            run_timeout_secs: default_run_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    #[serde(default = "default_resync")]
    pub resync_secs: u64,
}

fn default_resync() -> u64 {
    60
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            resync_secs: default_resync(),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Process-wide settings. Every field has a default, so an empty (or
/// missing) file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_database")]
    pub database: PathBuf,
    /// IANA zone that cron schedules are evaluated in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub hiscores: HiscoresSettings,
    #[serde(default)]
    pub discord: DiscordSettings,
    #[serde(default)]
    pub ranking: RankingSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

fn default_database() -> PathBuf {
    PathBuf::from("leaderboard.redb")
}

fn default_timezone() -> String {
    "America/Chicago".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: default_database(),
            timezone: default_timezone(),
            hiscores: HiscoresSettings::default(),
            discord: DiscordSettings::default(),
            ranking: RankingSettings::default(),
            pipeline: PipelineSettings::default(),
            scheduler: SchedulerSettings::default(),
        }
    }
}

impl Settings {
    /// Read `path` (if given), apply environment overrides, validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(p) => Self::from_yaml(&std::fs::read_to_string(p)?)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    /// Overlay `LEADERBOARD_*` / `DISCORD_*` variables. Empty values are
    /// ignored.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = var("LEADERBOARD_DB") {
            self.database = PathBuf::from(v);
        }
        if let Some(v) = var("LEADERBOARD_TZ") {
            self.timezone = v;
        }
        if let Some(v) = var("LEADERBOARD_HISCORES_URL") {
            self.hiscores.base_url = v;
        }
        if let Some(v) = var("DISCORD_BOT_TOKEN") {
            self.discord.token = Some(v);
        }
        if let Some(v) = var("DISCORD_APP_ID") {
            self.discord.application_id = Some(v);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut issues = Vec::new();
        if let Err(e) = self.tz() {
            issues.push(e.to_string());
        }
        let limits = [
            ("hiscores.timeout_secs", self.hiscores.timeout_secs),
            (
                "hiscores.max_concurrent_lookups",
                self.hiscores.max_concurrent_lookups as u64,
            ),
            ("discord.timeout_secs", self.discord.timeout_secs),
            ("pipeline.run_timeout_secs", self.pipeline.run_timeout_secs),
            ("scheduler.resync_secs", self.scheduler.resync_secs),
        ];
        for (name, value) in limits {
            if value == 0 {
                issues.push(format!("{name} must be greater than zero"));
            }
        }
        if self.hiscores.probe_account.trim().is_empty() {
            issues.push("hiscores.probe_account must not be empty".to_string());
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(LeaderboardError::InvalidSettings(issues.join("; ")))
        }
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| LeaderboardError::InvalidTimezone(self.timezone.clone()))
    }

    pub fn hiscores_timeout(&self) -> Duration {
        Duration::from_secs(self.hiscores.timeout_secs)
    }

    pub fn discord_timeout(&self) -> Duration {
        Duration::from_secs(self.discord.timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline.run_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::from_yaml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.tz().unwrap(), chrono_tz::America::Chicago);
        assert_eq!(settings.hiscores.max_concurrent_lookups, 8);
        assert!(settings.ranking.exclude_unranked);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let yaml = "timezone: Europe/London\nhiscores:\n  timeout_secs: 3\n";
        let settings = Settings::from_yaml(yaml).unwrap();
        assert_eq!(settings.timezone, "Europe/London");
        assert_eq!(settings.hiscores.timeout_secs, 3);
        assert_eq!(settings.hiscores.probe_account, "sample");
        assert_eq!(settings.pipeline.run_timeout_secs, 600);
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("LEADERBOARD_DB", "/tmp/x.redb"),
            ("DISCORD_BOT_TOKEN", "tok"),
            ("LEADERBOARD_TZ", ""),
        ]
        .into_iter()
        .collect();
        let mut settings = Settings::default();
        settings.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(settings.database, PathBuf::from("/tmp/x.redb"));
        assert_eq!(settings.discord.token.as_deref(), Some("tok"));
        assert_eq!(settings.timezone, "America/Chicago");
    }

    #[test]
    fn validate_collects_every_issue() {
        let mut settings = Settings::default();
        settings.timezone = "Mars/Olympus".into();
        settings.hiscores.max_concurrent_lookups = 0;
        let msg = settings.validate().unwrap_err().to_string();
        assert!(msg.contains("Mars/Olympus"));
        assert!(msg.contains("max_concurrent_lookups"));
    }
}

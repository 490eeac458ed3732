use osrs_hiscores::HiscoresError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("group is disabled: {0}")]
    GroupDisabled(String),

    #[error("member '{account}' is not enrolled in group {group}")]
    MemberNotFound { group: String, account: String },

    #[error("account '{0}' could not be found on the hiscores")]
    AccountNotFound(String),

    #[error("not a known skill or activity: {0}")]
    UnknownActivity(String),

    #[error("invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },

    #[error("invalid time zone: {0}")]
    InvalidTimezone(String),

    #[error("invalid group configuration:{0}")]
    InvalidGroupConfig(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("a leaderboard run is already in progress for group {0}")]
    RunInProgress(String),

    #[error("run cancelled for group {0}")]
    Cancelled(String),

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Hiscores(#[from] HiscoresError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Failures talking to the chat platform.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat resource not found")]
    NotFound,

    #[error("missing permission for chat channel")]
    Forbidden,

    #[error("rate limited by chat platform (retry after {retry_after_secs:.1}s)")]
    RateLimited { retry_after_secs: f64 },

    #[error("chat platform returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("chat request timed out")]
    Timeout,

    #[error("chat client not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, LeaderboardError>;

/// Stringify a storage-engine error into [`LeaderboardError::Store`].
pub(crate) fn store_err(e: impl std::fmt::Display) -> LeaderboardError {
    LeaderboardError::Store(e.to_string())
}

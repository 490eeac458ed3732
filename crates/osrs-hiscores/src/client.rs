use std::time::Duration;

use reqwest::StatusCode;

use crate::types::Snapshot;
use crate::{normalize_account_key, HiscoresError, Result};

// ─── HiscoresClient ───────────────────────────────────────────────────────

/// HTTP client for `index_lite.json`.
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections.
#[derive(Debug, Clone)]
pub struct HiscoresClient {
    http: reqwest::Client,
    base_url: String,
}

impl HiscoresClient {
    /// The main (non-ironman) Old School hiscores board.
    pub const DEFAULT_BASE_URL: &'static str = "https://secure.runescape.com/m=hiscore_oldschool";

    /// Build a client against `base_url` with a per-request `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the snapshot for one account.
    ///
    /// `account` is normalized before the request, so callers may pass either
    /// a display name or a stored key. A 404 maps to
    /// [`HiscoresError::NotFound`].
    pub async fn lookup(&self, account: &str) -> Result<Snapshot> {
        let key = normalize_account_key(account);
        let url = format!("{}/index_lite.json", self.base_url);
        tracing::debug!(account = %key, "hiscores lookup");

        let response = self
            .http
            .get(&url)
            .query(&[("player", key.as_str())])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(HiscoresError::NotFound(key)),
            status if !status.is_success() => {
                return Err(HiscoresError::Status {
                    account: key,
                    status: status.as_u16(),
                })
            }
            _ => {}
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| HiscoresError::Decode {
            account: key,
            source,
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

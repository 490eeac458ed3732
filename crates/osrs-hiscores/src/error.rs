use thiserror::Error;

#[derive(Debug, Error)]
pub enum HiscoresError {
    #[error("account not found on the hiscores: {0}")]
    NotFound(String),

    #[error("hiscores returned HTTP {status} for {account}")]
    Status { account: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode hiscores response for {account}: {source}")]
    Decode {
        account: String,
        #[source]
        source: serde_json::Error,
    },
}

impl HiscoresError {
    /// `true` when the account itself is unknown (renamed, banned, typo),
    /// as opposed to a transient transport failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

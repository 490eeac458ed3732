//! Wiring from [`Settings`] to the core services each command needs.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use leaderboard_core::{ActivityCatalog, DiscordChat, EmojiSet, RedbStore, Settings};
use osrs_hiscores::HiscoresClient;

pub struct App {
    pub settings: Settings,
}

impl App {
    pub fn load(config: Option<&Path>) -> anyhow::Result<Self> {
        let settings = Settings::load(config).with_context(|| match config {
            Some(p) => format!("failed to load settings from {}", p.display()),
            None => "invalid settings".to_string(),
        })?;
        Ok(Self { settings })
    }

    pub fn runtime(&self) -> anyhow::Result<tokio::runtime::Runtime> {
        tokio::runtime::Runtime::new().context("failed to start async runtime")
    }

    pub fn store(&self) -> anyhow::Result<Arc<RedbStore>> {
        let path = &self.settings.database;
        let store = RedbStore::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?;
        Ok(Arc::new(store))
    }

    pub fn hiscores(&self) -> anyhow::Result<Arc<HiscoresClient>> {
        let client = HiscoresClient::new(
            self.settings.hiscores.base_url.clone(),
            self.settings.hiscores_timeout(),
        )
        .context("failed to build hiscores client")?;
        Ok(Arc::new(client))
    }

    pub fn catalog(&self, hiscores: Arc<HiscoresClient>) -> ActivityCatalog {
        ActivityCatalog::new(hiscores, self.settings.hiscores.probe_account.clone())
    }

    /// Discord client, or an error explaining how to configure one.
    pub fn chat(&self) -> anyhow::Result<Arc<DiscordChat>> {
        let token = self
            .settings
            .discord
            .token
            .clone()
            .context("no Discord bot token configured (set DISCORD_BOT_TOKEN or discord.token)")?;
        let chat = DiscordChat::new(
            self.settings.discord.api_base.clone(),
            token,
            self.settings.discord_timeout(),
        )?;
        Ok(Arc::new(chat))
    }

    /// Discord client if a token is configured.
    pub fn chat_if_configured(&self) -> anyhow::Result<Option<Arc<DiscordChat>>> {
        match self.settings.discord.token {
            Some(_) => self.chat().map(Some),
            None => Ok(None),
        }
    }

    /// Application emojis. Failures degrade to an empty set.
    pub async fn emojis(&self, chat: &DiscordChat) -> EmojiSet {
        let Some(app_id) = self.settings.discord.application_id.as_deref() else {
            tracing::info!("no Discord application id configured; posting without emojis");
            return EmojiSet::new();
        };
        match chat.application_emojis(app_id).await {
            Ok(set) => {
                tracing::info!(count = set.len(), "loaded application emojis");
                set
            }
            Err(e) => {
                tracing::warn!("could not load application emojis: {e}");
                EmojiSet::new()
            }
        }
    }
}

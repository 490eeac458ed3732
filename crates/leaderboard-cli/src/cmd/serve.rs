use crate::app::App;
use anyhow::Context;
use leaderboard_core::{Pipeline, PipelineOptions, Scheduler};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub fn run(app: &App) -> anyhow::Result<()> {
    let store = app.store()?;
    let hiscores = app.hiscores()?;
    let catalog = Arc::new(app.catalog(hiscores.clone()));
    let chat = app.chat()?;
    let tz = app.settings.tz()?;

    let rt = app.runtime()?;
    rt.block_on(async {
        if let Err(e) = catalog.names().await {
            tracing::warn!("activity catalog unavailable at startup, will retry per run: {e}");
        }
        let emojis = Arc::new(app.emojis(&chat).await);

        let pipeline = Arc::new(Pipeline::new(
            store.clone(),
            hiscores,
            chat,
            catalog,
            emojis,
            PipelineOptions::from_settings(&app.settings),
        ));
        let scheduler = Arc::new(Scheduler::new(
            pipeline,
            store,
            tz,
            Duration::from_secs(app.settings.scheduler.resync_secs),
        ));
        let jobs = scheduler.sync().context("failed to load groups")?;
        tracing::info!(jobs, database = %app.settings.database.display(), "serving leaderboards");

        let shutdown = CancellationToken::new();
        let handle = scheduler.clone().start(shutdown.clone());

        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for shutdown signal")?;
        tracing::info!("shutdown requested");
        shutdown.cancel();
        handle.await.context("scheduler task failed")?;
        anyhow::Ok(())
    })
}

use crate::app::App;
use crate::output::{print_json, Table};
use leaderboard_core::{Pipeline, PipelineOptions, PublishStatus, RunReport};
use std::sync::Arc;

pub fn run(app: &App, group: &str, json: bool) -> anyhow::Result<()> {
    let store = app.store()?;
    let hiscores = app.hiscores()?;
    let catalog = Arc::new(app.catalog(hiscores.clone()));
    let chat = app.chat()?;

    let rt = app.runtime()?;
    let report = rt.block_on(async {
        let emojis = Arc::new(app.emojis(&chat).await);
        let pipeline = Pipeline::new(
            store,
            hiscores,
            chat,
            catalog,
            emojis,
            PipelineOptions::from_settings(&app.settings),
        );
        pipeline.run(group).await
    })?;

    if json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    println!(
        "Run {} for group '{}': {} published, {} member{} resolved",
        report.run_id,
        report.group_id,
        report.published(),
        report.resolved_members,
        if report.resolved_members == 1 { "" } else { "s" }
    );
    if !report.failed_lookups.is_empty() {
        println!("Lookups failed: {}", report.failed_lookups.join(", "));
    }
    for activity in &report.pruned {
        println!("Removed message for untracked activity {activity}");
    }

    let rows = report
        .outcomes
        .iter()
        .map(|o| {
            let (status, detail) = match &o.status {
                PublishStatus::Published {
                    message_id,
                    replaced,
                } => (
                    "published",
                    match replaced {
                        Some(old) => format!("{message_id} (replaced {old})"),
                        None => message_id.clone(),
                    },
                ),
                PublishStatus::Skipped { .. } => ("skipped", "no ranked members".to_string()),
                PublishStatus::Failed { reason } => ("failed", reason.clone()),
                PublishStatus::TimedOut => ("timed out", String::new()),
                PublishStatus::Cancelled => ("cancelled", String::new()),
            };
            vec![
                o.position.to_string(),
                o.activity.clone(),
                status.to_string(),
                detail,
            ]
        })
        .collect();
    Table::new(&["#", "ACTIVITY", "STATUS", "DETAIL"])
        .numeric(&["#"])
        .rows(rows)
        .print();
}

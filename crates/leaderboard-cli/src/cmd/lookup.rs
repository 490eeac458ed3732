use crate::app::App;
use crate::output::{print_json, thousands, Table};
use anyhow::Context;
use leaderboard_core::{groups::parse_activity_list, ActivityKind};
use serde::Serialize;

#[derive(Serialize)]
struct Row {
    activity: String,
    kind: ActivityKind,
    rank: i64,
    /// Level for skills, score for activities.
    value: i64,
    xp: Option<i64>,
}

pub fn run(app: &App, username: &str, activities: &str, json: bool) -> anyhow::Result<()> {
    let wanted = parse_activity_list(activities);
    anyhow::ensure!(!wanted.is_empty(), "no activities given");

    let hiscores = app.hiscores()?;
    let catalog = app.catalog(hiscores.clone());

    let rt = app.runtime()?;
    let (snapshot, rows) = rt.block_on(async {
        let snapshot = hiscores
            .lookup(username)
            .await
            .with_context(|| format!("lookup failed for '{username}'"))?;
        let mut rows = Vec::with_capacity(wanted.len());
        for activity in &wanted {
            let kind = catalog.classify(activity).await?;
            let row = match kind {
                ActivityKind::Skill => snapshot.skill(activity).map(|s| Row {
                    activity: s.name.clone(),
                    kind,
                    rank: s.rank,
                    value: s.level,
                    xp: Some(s.xp),
                }),
                ActivityKind::Activity => snapshot.activity(activity).map(|a| Row {
                    activity: a.name.clone(),
                    kind,
                    rank: a.rank,
                    value: a.score,
                    xp: None,
                }),
            };
            rows.push(row.unwrap_or(Row {
                activity: activity.clone(),
                kind,
                rank: osrs_hiscores::UNRANKED,
                value: 0,
                xp: None,
            }));
        }
        anyhow::Ok((snapshot, rows))
    })?;

    if json {
        print_json(&serde_json::json!({ "name": snapshot.name, "entries": rows }))?;
        return Ok(());
    }

    println!("{}", snapshot.name);
    let table = rows
        .iter()
        .map(|r| {
            vec![
                r.activity.clone(),
                r.kind.to_string(),
                if r.rank > 0 { thousands(r.rank) } else { "unranked".into() },
                thousands(r.value),
                r.xp.map(thousands).unwrap_or_default(),
            ]
        })
        .collect();
    Table::new(&["ACTIVITY", "KIND", "RANK", "LEVEL/SCORE", "XP"])
        .numeric(&["RANK", "LEVEL/SCORE", "XP"])
        .rows(table)
        .print();
    Ok(())
}

use crate::app::App;
use crate::output::{print_json, Table};
use anyhow::Context;
use chrono::Utc;
use clap::Subcommand;
use leaderboard_core::{
    groups::{self, parse_activity_list, GroupSettings},
    ledger::Ledger,
    scheduler::{next_after, parse_schedule},
    ChatPlatform, Store,
};
use serde_json::json;

#[derive(Subcommand)]
pub enum GroupSubcommand {
    /// Create or update a group (re-enables a disabled group)
    Configure {
        id: String,
        /// Display name (defaults to the id)
        #[arg(long)]
        name: Option<String>,
        /// Destination channel id
        #[arg(long)]
        channel: String,
        /// Cron expression, 5 or 6 fields, evaluated in the configured time zone
        #[arg(long)]
        schedule: String,
        /// Comma-separated skills and activities, in publish order
        #[arg(long)]
        activities: String,
        /// Replace each activity's previous message instead of keeping history
        #[arg(long)]
        edit_in_place: bool,
    },
    /// List all groups
    List,
    /// Show a group, its roster size and its posted messages
    Show { id: String },
    /// Stop scheduling a group (roster and messages are kept)
    Disable { id: String },
}

pub fn run(app: &App, subcmd: GroupSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        GroupSubcommand::Configure {
            id,
            name,
            channel,
            schedule,
            activities,
            edit_in_place,
        } => configure(
            app,
            GroupSettings {
                name: name.unwrap_or_else(|| id.clone()),
                id,
                channel_id: channel,
                schedule,
                activities: parse_activity_list(&activities),
                edit_in_place,
            },
            json,
        ),
        GroupSubcommand::List => list(app, json),
        GroupSubcommand::Show { id } => show(app, &id, json),
        GroupSubcommand::Disable { id } => disable(app, &id, json),
    }
}

fn configure(app: &App, settings: GroupSettings, json: bool) -> anyhow::Result<()> {
    let store = app.store()?;
    let ledger = Ledger::new(store.clone());
    let catalog = app.catalog(app.hiscores()?);
    let chat = app.chat_if_configured()?;

    let rt = app.runtime()?;
    let configured = rt.block_on(groups::configure_group(
        store.as_ref(),
        &ledger,
        &catalog,
        chat.as_deref().map(|c| c as &dyn ChatPlatform),
        settings,
    ))?;
    let group = configured.group;

    if json {
        print_json(&json!({
            "group": group,
            "pruned": configured.pruned,
            "teardown_deferred": chat.is_none(),
        }))?;
    } else {
        println!(
            "Configured group '{}': {} activit{} on '{}'",
            group.id,
            group.activities.len(),
            if group.activities.len() == 1 { "y" } else { "ies" },
            group.schedule
        );
        for activity in &configured.pruned {
            println!("  removed message for {activity}");
        }
        if chat.is_none() {
            println!("  no Discord token configured; stale messages are removed on the next run");
        }
    }
    Ok(())
}

fn list(app: &App, json: bool) -> anyhow::Result<()> {
    let store = app.store()?;
    let groups = store.groups()?;

    if json {
        print_json(&groups)?;
        return Ok(());
    }
    if groups.is_empty() {
        println!("No groups configured.");
        return Ok(());
    }
    let rows = groups
        .iter()
        .map(|g| {
            vec![
                g.id.clone(),
                g.name.clone(),
                g.channel_id.clone(),
                g.schedule.clone(),
                g.activities.len().to_string(),
                if g.enabled { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    Table::new(&["ID", "NAME", "CHANNEL", "SCHEDULE", "ACTIVITIES", "ENABLED"])
        .numeric(&["ACTIVITIES"])
        .rows(rows)
        .print();
    Ok(())
}

fn show(app: &App, id: &str, json: bool) -> anyhow::Result<()> {
    let store = app.store()?;
    let group = store
        .group(id)?
        .with_context(|| format!("group not found: {id}"))?;
    let members = store.members(id)?;
    let messages = store.posted_messages(id)?;
    let tz = app.settings.tz()?;
    let next_fire = match parse_schedule(&group.schedule) {
        Ok(schedule) if group.enabled => next_after(&schedule, &tz, Utc::now()),
        _ => None,
    };

    if json {
        print_json(&json!({
            "group": group,
            "members": members.len(),
            "messages": messages,
            "next_run": next_fire,
        }))?;
        return Ok(());
    }

    println!("Group:     {} ({})", group.id, group.name);
    println!("Channel:   {}", group.channel_id);
    println!("Schedule:  {} [{}]", group.schedule, tz);
    println!("Enabled:   {}", group.enabled);
    println!("Mode:      {}", if group.edit_in_place { "edit in place" } else { "history" });
    println!("Members:   {}", members.len());
    if let Some(next) = next_fire {
        println!("Next run:  {}", next.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z"));
    }
    println!();

    let rows = group
        .activities
        .iter()
        .enumerate()
        .map(|(i, activity)| {
            let posted = messages
                .iter()
                .find(|m| m.activity.eq_ignore_ascii_case(activity));
            vec![
                i.to_string(),
                activity.clone(),
                posted.map(|m| m.message_id.clone()).unwrap_or_else(|| "-".into()),
                posted
                    .map(|m| m.posted_at.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default(),
            ]
        })
        .collect();
    Table::new(&["#", "ACTIVITY", "MESSAGE", "POSTED"])
        .numeric(&["#"])
        .rows(rows)
        .print();
    Ok(())
}

fn disable(app: &App, id: &str, json: bool) -> anyhow::Result<()> {
    let store = app.store()?;
    let group = groups::disable_group(store.as_ref(), id)?;
    if json {
        print_json(&group)?;
    } else {
        println!("Disabled group '{}'", group.id);
    }
    Ok(())
}

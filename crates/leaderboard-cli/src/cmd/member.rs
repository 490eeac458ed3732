use crate::app::App;
use crate::output::{print_json, Table};
use clap::Subcommand;
use leaderboard_core::{
    roster::{self, Enrollment},
    StatsProvider,
};
use osrs_hiscores::AccountType;

#[derive(Subcommand)]
pub enum MemberSubcommand {
    /// Track an account in a group (updates it if already tracked)
    Assign {
        group: String,
        username: String,
        /// Account kind: main, ironman, hardcore_ironman, ultimate_ironman,
        /// group_ironman, hardcore_group_ironman, unranked_group_ironman
        #[arg(long, default_value = "main")]
        kind: AccountType,
        /// Chat user id to mention next to the account
        #[arg(long)]
        chat_user: Option<String>,
        /// Chat user display name
        #[arg(long)]
        chat_name: Option<String>,
        /// Skip checking that the account exists on the hiscores
        #[arg(long)]
        no_verify: bool,
    },
    /// Stop tracking an account
    Unassign { group: String, username: String },
    /// List tracked accounts
    List { group: String },
}

pub fn run(app: &App, subcmd: MemberSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        MemberSubcommand::Assign {
            group,
            username,
            kind,
            chat_user,
            chat_name,
            no_verify,
        } => assign(
            app,
            &group,
            Enrollment {
                username,
                account_type: kind,
                chat_user_id: chat_user,
                chat_username: chat_name,
            },
            no_verify,
            json,
        ),
        MemberSubcommand::Unassign { group, username } => unassign(app, &group, &username, json),
        MemberSubcommand::List { group } => list(app, &group, json),
    }
}

fn assign(
    app: &App,
    group: &str,
    enrollment: Enrollment,
    no_verify: bool,
    json: bool,
) -> anyhow::Result<()> {
    let store = app.store()?;
    let hiscores = if no_verify {
        None
    } else {
        Some(app.hiscores()?)
    };

    let rt = app.runtime()?;
    let member = rt.block_on(roster::enroll_member(
        store.as_ref(),
        hiscores.as_deref().map(|h| h as &dyn StatsProvider),
        group,
        enrollment,
    ))?;

    if json {
        print_json(&member)?;
    } else {
        println!(
            "Tracking '{}' ({}) in group '{}'",
            member.display_name, member.account_type, group
        );
    }
    Ok(())
}

fn unassign(app: &App, group: &str, username: &str, json: bool) -> anyhow::Result<()> {
    let store = app.store()?;
    let member = roster::remove_member(store.as_ref(), group, username)?;
    if json {
        print_json(&member)?;
    } else {
        println!(
            "Stopped tracking '{}' in group '{}'",
            member.display_name, group
        );
    }
    Ok(())
}

fn list(app: &App, group: &str, json: bool) -> anyhow::Result<()> {
    let store = app.store()?;
    let members = roster::list_members(store.as_ref(), group)?;

    if json {
        print_json(&members)?;
        return Ok(());
    }
    if members.is_empty() {
        println!("No members in group '{group}'.");
        return Ok(());
    }
    let rows = members
        .iter()
        .map(|m| {
            vec![
                m.display_name.clone(),
                m.account_key.clone(),
                m.account_type.to_string(),
                m.chat_username
                    .clone()
                    .or_else(|| m.chat_user_id.clone())
                    .unwrap_or_else(|| "-".into()),
            ]
        })
        .collect();
    Table::new(&["NAME", "KEY", "KIND", "CHAT USER"])
        .rows(rows)
        .print();
    Ok(())
}

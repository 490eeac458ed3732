mod app;
mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{group::GroupSubcommand, member::MemberSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "leaderboard",
    about = "Scheduled Old School RuneScape clan leaderboards for Discord",
    version,
    propagate_version = true
)]
struct Cli {
    /// Settings file (YAML)
    #[arg(long, global = true, env = "LEADERBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure, inspect and disable tracked groups
    Group {
        #[command(subcommand)]
        subcommand: GroupSubcommand,
    },

    /// Manage the accounts tracked by a group
    Member {
        #[command(subcommand)]
        subcommand: MemberSubcommand,
    },

    /// Run the leaderboard pipeline for a group right now
    Post { group: String },

    /// Show one account's hiscores for a list of activities
    Lookup {
        username: String,
        /// Comma-separated skills and activities
        #[arg(long)]
        activities: String,
    },

    /// List the known skills and activities
    Catalog,

    /// Schedule every enabled group and run until interrupted
    Serve,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve | Commands::Post { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let result = app::App::load(cli.config.as_deref()).and_then(|app| match cli.command {
        Commands::Group { subcommand } => cmd::group::run(&app, subcommand, cli.json),
        Commands::Member { subcommand } => cmd::member::run(&app, subcommand, cli.json),
        Commands::Post { group } => cmd::post::run(&app, &group, cli.json),
        Commands::Lookup {
            username,
            activities,
        } => cmd::lookup::run(&app, &username, &activities, cli.json),
        Commands::Catalog => cmd::catalog::run(&app, cli.json),
        Commands::Serve => cmd::serve::run(&app),
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

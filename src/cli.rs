//! Command line interface for modwatch

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "modwatch",
    about = "Monitor Reddit moderation activity — track new bans and auto-handle modmail from rule-violation bans",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Path to an environment file with Reddit credentials
    #[arg(long, short = 'c', global = true, default_value = ".env")]
    pub config: PathBuf,

    /// Enable verbose logging output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Report bans not seen on previous runs
    Track {
        /// Comma-separated list of subreddits to monitor
        #[arg(long, short = 's', value_delimiter = ',', default_value = "announcements,reddit")]
        subreddits: Vec<String>,

        /// Maximum number of entries to fetch per subreddit
        #[arg(long, short = 'l', default_value_t = 50)]
        limit: u32,

        /// Path to the JSON ban history file
        #[arg(long, default_value = "banned_users.json")]
        storage: PathBuf,
    },

    /// Reply to and mute modmail from users banned for the target rule
    Mute {
        /// Comma-separated list of subreddits to monitor
        #[arg(long, short = 's', value_delimiter = ',', default_value = "announcements,help")]
        subreddits: Vec<String>,

        /// Maximum number of conversations to handle per run
        #[arg(long, short = 'l')]
        limit: Option<usize>,

        /// Path to the JSON processed-conversation cache file
        #[arg(long, default_value = "processed_conversations.json")]
        cache: PathBuf,

        /// Target rule for ban detection (overrides TARGET_RULE)
        #[arg(long)]
        rule: Option<String>,

        /// Log actions without replying or muting
        #[arg(long)]
        dry_run: bool,
    },
}

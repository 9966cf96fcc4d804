pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod mutebot;
pub mod reddit;
pub mod tracker;

// Customize these constants for your bot
pub const BOT_NAME: &str = "modwatch";
pub const TRACKER_TARGET: &str = "modwatch::tracker";
pub const MUTE_TARGET: &str = "modwatch::mutebot";
pub const ERROR_TARGET: &str = "modwatch::error";
pub const CONSOLE_TARGET: &str = "modwatch";

pub use config::{MuteConfig, RedditCredentials};
pub use error::{BotError, BotResult};
pub use mutebot::MuteBot;
pub use tracker::BanTracker;

//! Configuration loading for the moderation bots
//!
//! Credentials and tunables come from the environment (optionally seeded
//! from a `.env` file); the CLI can override the mute bot tunables.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{BotError, BotResult};

/// Environment variables that must be present before any network call.
const REQUIRED_VARS: [&str; 3] = [
    "REDDIT_CLIENT_ID",
    "REDDIT_CLIENT_SECRET",
    "REDDIT_USER_AGENT",
];

/// Default reply sent to banned users who write in to modmail.
pub const DEFAULT_RESPONSE_TEMPLATE: &str = "Your message has been received. \
    Due to your recent ban for {rule}, your ability to message the moderators \
    has been temporarily restricted.";

/// Load a `.env` style file into the process environment, if it exists.
///
/// A missing file is not an error: credentials may already be in the
/// environment (CI, systemd units).
pub fn load_env_file(path: &Path) {
    match dotenvy::from_path(path) {
        Ok(()) => info!(path = %path.display(), "Loaded environment file"),
        Err(dotenvy::Error::Io(_)) => {
            warn!(path = %path.display(), "No environment file found, using process environment");
        }
        Err(e) => warn!(path = %path.display(), error = %e, "Could not parse environment file"),
    }
}

/// Reddit API credentials
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
    // Script-auth account; without these the client is read-only
    pub username: Option<String>,
    pub password: Option<String>,
}

impl RedditCredentials {
    /// Read credentials from the environment.
    ///
    /// # Errors
    /// Returns `BotError::MissingCredentials` naming every absent required
    /// variable, so a misconfigured deployment fails in one pass.
    pub fn from_env() -> BotResult<Self> {
        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .filter(|var| env::var(var).map_or(true, |v| v.is_empty()))
            .map(|var| (*var).to_string())
            .collect();

        if !missing.is_empty() {
            return Err(BotError::MissingCredentials(missing));
        }

        let username = env::var("REDDIT_USERNAME").ok().filter(|v| !v.is_empty());
        let password = env::var("REDDIT_PASSWORD").ok().filter(|v| !v.is_empty());
        if username.is_none() || password.is_none() {
            warn!("No Reddit username/password provided, using read-only access");
        }

        Ok(Self {
            client_id: env::var("REDDIT_CLIENT_ID").unwrap_or_default(),
            client_secret: env::var("REDDIT_CLIENT_SECRET").unwrap_or_default(),
            user_agent: env::var("REDDIT_USER_AGENT").unwrap_or_default(),
            username,
            password,
        })
    }

    /// Whether the credentials allow an authenticated (non read-only) session
    #[must_use]
    pub fn has_user_auth(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

/// Mute bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuteConfig {
    // Ban reason text that qualifies a conversation for auto-handling
    pub target_rule: String,
    // Reply body; {rule}, {username} and {subreddit} are substituted
    pub response_template: String,
    // Upper bound on conversations handled in one run
    pub max_conversations_per_run: usize,
    // Processed-conversation cache retention window
    pub cache_retention_days: i64,
    // How far back in the mod log to look for qualifying bans
    pub lookback_days: i64,
    // Log actions without performing them
    pub dry_run: bool,
    // Mute the conversation after replying
    pub auto_mute: bool,
}

impl Default for MuteConfig {
    fn default() -> Self {
        Self {
            target_rule: "Rule 7".to_string(),
            response_template: DEFAULT_RESPONSE_TEMPLATE.to_string(),
            max_conversations_per_run: 50,
            cache_retention_days: 30,
            lookback_days: 7,
            dry_run: false,
            auto_mute: true,
        }
    }
}

impl MuteConfig {
    /// Build a config from environment variables, falling back to defaults
    /// for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            target_rule: env_or("TARGET_RULE", defaults.target_rule),
            response_template: env_or("RESPONSE_TEMPLATE", defaults.response_template),
            max_conversations_per_run: env_parsed(
                "MAX_CONVERSATIONS_PER_RUN",
                defaults.max_conversations_per_run,
            ),
            cache_retention_days: env_parsed(
                "CONVERSATION_CACHE_DAYS",
                defaults.cache_retention_days,
            ),
            lookback_days: env_parsed("BAN_LOOKBACK_DAYS", defaults.lookback_days),
            dry_run: env_flag("DRY_RUN", defaults.dry_run),
            auto_mute: env_flag("AUTO_MUTE", defaults.auto_mute),
        }
    }

    /// Render the response template for a specific conversation
    #[must_use]
    pub fn render_response(&self, username: &str, subreddit: &str) -> String {
        self.response_template
            .replace("{rule}", &self.target_rule)
            .replace("{username}", username)
            .replace("{subreddit}", subreddit)
    }
}

fn env_or(var: &str, default: String) -> String {
    env::var(var).ok().filter(|v| !v.is_empty()).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(var: &str, default: bool) -> bool {
    env::var(var).map_or(default, |v| v.eq_ignore_ascii_case("true") || v == "1")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_response() {
        let config = MuteConfig {
            target_rule: "Rule 7".to_string(),
            response_template: "u/{username} was banned from r/{subreddit} for {rule}".to_string(),
            ..Default::default()
        };

        assert_eq!(
            config.render_response("spammer", "announcements"),
            "u/spammer was banned from r/announcements for Rule 7"
        );
    }

    #[test]
    fn test_default_config() {
        let config = MuteConfig::default();
        assert_eq!(config.target_rule, "Rule 7");
        assert_eq!(config.max_conversations_per_run, 50);
        assert_eq!(config.cache_retention_days, 30);
        assert!(config.auto_mute);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_missing_credentials_lists_all_variables() {
        // Run in a scratch environment: clear the required variables first.
        // Serialize access through a lock so parallel tests don't race on env.
        let _guard = ENV_LOCK.lock().unwrap();
        let saved: Vec<(String, Option<String>)> = REQUIRED_VARS
            .iter()
            .map(|var| ((*var).to_string(), env::var(var).ok()))
            .collect();
        for var in REQUIRED_VARS {
            unsafe { env::remove_var(var) };
        }

        let err = RedditCredentials::from_env().unwrap_err();
        match &err {
            BotError::MissingCredentials(vars) => {
                assert_eq!(vars.len(), 3);
                assert!(vars.contains(&"REDDIT_CLIENT_ID".to_string()));
                assert!(vars.contains(&"REDDIT_CLIENT_SECRET".to_string()));
                assert!(vars.contains(&"REDDIT_USER_AGENT".to_string()));
            }
            other => panic!("expected MissingCredentials, got {other:?}"),
        }

        for (var, value) in saved {
            match value {
                Some(v) => unsafe { env::set_var(&var, v) },
                None => unsafe { env::remove_var(&var) },
            }
        }
    }

    #[test]
    fn test_credentials_from_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        let saved: Vec<(String, Option<String>)> = REQUIRED_VARS
            .iter()
            .map(|var| ((*var).to_string(), env::var(var).ok()))
            .collect();
        unsafe {
            env::set_var("REDDIT_CLIENT_ID", "id");
            env::set_var("REDDIT_CLIENT_SECRET", "secret");
            env::set_var("REDDIT_USER_AGENT", "modwatch-test/1.0");
            env::remove_var("REDDIT_USERNAME");
            env::remove_var("REDDIT_PASSWORD");
        }

        let creds = RedditCredentials::from_env().unwrap();
        assert_eq!(creds.client_id, "id");
        assert_eq!(creds.user_agent, "modwatch-test/1.0");
        assert!(!creds.has_user_auth());

        for (var, value) in saved {
            match value {
                Some(v) => unsafe { env::set_var(&var, v) },
                None => unsafe { env::remove_var(&var) },
            }
        }
    }

    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
}

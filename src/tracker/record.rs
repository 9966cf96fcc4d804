//! Ban record structure and identity keys

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reddit::{BannedUser, ModLogEntry};

/// A single observed moderation event, unified across the ban list and the
/// moderation log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanRecord {
    pub subreddit: String,
    pub action: String,
    pub target_user: String,
    pub details: Option<String>,
    pub moderator: String,
    /// When the action happened upstream, when known
    pub created_utc: Option<DateTime<Utc>>,
    /// When this record was fetched
    pub fetched_at: DateTime<Utc>,
}

impl BanRecord {
    /// Build a record from a ban-list entry. The ban list does not expose
    /// the acting moderator.
    #[must_use]
    pub fn from_ban(subreddit: &str, user: BannedUser) -> Self {
        Self {
            subreddit: subreddit.to_string(),
            action: "ban".to_string(),
            target_user: user.username,
            details: user.note,
            moderator: "unknown".to_string(),
            created_utc: user.banned_at,
            fetched_at: Utc::now(),
        }
    }

    /// Build a record from a moderation-log entry
    #[must_use]
    pub fn from_mod_log(subreddit: &str, entry: ModLogEntry) -> Self {
        Self {
            subreddit: subreddit.to_string(),
            action: entry.action,
            target_user: entry.target_user.unwrap_or_else(|| "N/A".to_string()),
            details: entry.details,
            moderator: entry.moderator,
            created_utc: entry.created_utc,
            fetched_at: Utc::now(),
        }
    }

    /// Deterministic identity key used as the history map key.
    ///
    /// Composite of every identifying field; identical upstream data always
    /// produces the same key, so re-runs diff to nothing.
    #[must_use]
    pub fn history_key(&self) -> String {
        let timestamp = self
            .created_utc
            .map_or_else(|| "-".to_string(), |t| t.to_rfc3339());
        format!(
            "{}:{}:{}:{}",
            self.subreddit, self.action, self.target_user, timestamp
        )
    }
}

impl Display for BanRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Subreddit: r/{}", self.subreddit)?;
        writeln!(f, "Action: {}", self.action)?;
        writeln!(f, "Target: u/{}", self.target_user)?;
        if let Some(details) = &self.details {
            writeln!(f, "Details: {details}")?;
        }
        writeln!(f, "Moderator: {}", self.moderator)?;
        if let Some(created) = self.created_utc {
            writeln!(f, "Date: {}", created.format("%Y-%m-%d %H:%M:%S"))?;
        }
        write!(f, "{}", "-".repeat(30))
    }
}

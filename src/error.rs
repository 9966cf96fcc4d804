//! Error types for the moderation bots
//!
//! This module defines the various errors that can occur while talking to
//! Reddit or persisting local state.

use thiserror::Error;

/// Errors that can occur during a bot run
#[derive(Debug, Error)]
pub enum BotError {
    /// Required credentials are absent from the environment
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingCredentials(Vec<String>),

    /// The OAuth token handshake failed
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Reddit API error
    #[error("Reddit API error: {0}")]
    Api(#[from] reqwest::Error),

    /// The authenticated account lacks moderator access to a resource
    #[error("no permission to read {resource} for r/{subreddit}")]
    PermissionDenied { subreddit: String, resource: String },

    /// Error reading or writing a persistence file
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error encoding or decoding persisted JSON
    #[error("storage format error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("bot error: {0}")]
    Other(String),
}

/// Convert a string into a BotError
impl From<String> for BotError {
    fn from(message: String) -> Self {
        Self::Other(message)
    }
}

impl BotError {
    /// True when the error means "you are not a moderator here", which the
    /// fetch paths treat as a cue to fall back to public data.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

/// Result type for bot operations
pub type BotResult<T> = Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = BotError::MissingCredentials(vec![
            "REDDIT_CLIENT_ID".to_string(),
            "REDDIT_USER_AGENT".to_string(),
        ]);
        assert_eq!(
            error.to_string(),
            "missing required environment variables: REDDIT_CLIENT_ID, REDDIT_USER_AGENT"
        );

        let error = BotError::PermissionDenied {
            subreddit: "announcements".to_string(),
            resource: "ban list".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "no permission to read ban list for r/announcements"
        );
        assert!(error.is_permission_denied());

        let error = BotError::from("something went wrong".to_string());
        assert_eq!(error.to_string(), "bot error: something went wrong");
        assert!(!error.is_permission_denied());
    }
}

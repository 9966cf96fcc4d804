//! Reddit OAuth client
//!
//! [`RedditClient`] performs the OAuth2 token handshake and wraps the five
//! moderation endpoints the bots use. The [`ModerationApi`] trait is the
//! seam the bot services are written against.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::RedditCredentials;
use crate::error::{BotError, BotResult};
use crate::reddit::types::{
    BannedUserData, ConversationsResponse, Listing, ModActionThing,
};
use crate::reddit::{BannedUser, ModLogEntry, ModmailConversation};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const OAUTH_BASE: &str = "https://oauth.reddit.com";

/// How long a conversation stays muted, in hours (Reddit accepts 72/168/672)
const MUTE_NUM_HOURS: u32 = 72;

/// Moderation operations the bots need from the platform
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModerationApi: Send + Sync {
    /// List the subreddit's ban list (moderator permission required)
    async fn banned_users(&self, subreddit: &str, limit: u32) -> BotResult<Vec<BannedUser>>;

    /// List the subreddit's moderation log, optionally filtered to one
    /// action type (e.g. `banuser`)
    async fn mod_log(
        &self,
        subreddit: &str,
        action: Option<&'static str>,
        limit: u32,
    ) -> BotResult<Vec<ModLogEntry>>;

    /// List modmail conversation headers for the subreddit
    async fn modmail_conversations(
        &self,
        subreddit: &str,
        state: &'static str,
        limit: u32,
    ) -> BotResult<Vec<ModmailConversation>>;

    /// Reply to a modmail conversation
    async fn reply_to_conversation(
        &self,
        conversation_id: &str,
        body: &str,
        author_hidden: bool,
    ) -> BotResult<()>;

    /// Mute the non-moderator participant of a conversation
    async fn mute_conversation(&self, conversation_id: &str) -> BotResult<()>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

/// Thin OAuth client over the Reddit moderation endpoints
pub struct RedditClient {
    http: reqwest::Client,
    token: String,
}

impl RedditClient {
    /// Perform the OAuth2 token handshake and return a ready client.
    ///
    /// Uses the password grant when an account is configured, the
    /// client-credentials (application-only) grant otherwise. Application-only
    /// sessions can read public data but not moderator resources.
    ///
    /// # Errors
    /// Returns `BotError::Auth` when the token endpoint rejects the
    /// credentials, or `BotError::Api` on transport failures.
    pub async fn login(credentials: &RedditCredentials) -> BotResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(credentials.user_agent.clone())
            .build()?;

        let mut params: Vec<(&str, &str)> = Vec::new();
        match (&credentials.username, &credentials.password) {
            (Some(username), Some(password)) => {
                params.push(("grant_type", "password"));
                params.push(("username", username));
                params.push(("password", password));
            }
            _ => params.push(("grant_type", "client_credentials")),
        }

        let response = http
            .post(TOKEN_URL)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(BotError::Auth(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let token: TokenResponse = response.json().await?;
        match token.access_token {
            Some(access_token) => {
                let mode = if credentials.has_user_auth() {
                    credentials.username.as_deref().unwrap_or("authenticated")
                } else {
                    "read-only"
                };
                info!("Connected to Reddit as: {mode}");
                Ok(Self {
                    http,
                    token: access_token,
                })
            }
            None => Err(BotError::Auth(
                token
                    .error
                    .unwrap_or_else(|| "no access token in response".to_string()),
            )),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        subreddit: &str,
        resource: &str,
    ) -> BotResult<T> {
        debug!(path, subreddit, "GET {OAUTH_BASE}{path}");
        let response = self
            .http
            .get(format!("{OAUTH_BASE}{path}"))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;

        if response.status() == StatusCode::FORBIDDEN {
            return Err(BotError::PermissionDenied {
                subreddit: subreddit.to_string(),
                resource: resource.to_string(),
            });
        }

        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }

    async fn post_form(&self, path: &str, form: &[(&str, String)]) -> BotResult<()> {
        debug!(path, "POST {OAUTH_BASE}{path}");
        let response = self
            .http
            .post(format!("{OAUTH_BASE}{path}"))
            .bearer_auth(&self.token)
            .form(form)
            .send()
            .await?;

        response.error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl ModerationApi for RedditClient {
    async fn banned_users(&self, subreddit: &str, limit: u32) -> BotResult<Vec<BannedUser>> {
        let listing: Listing<BannedUserData> = self
            .get_json(
                &format!("/r/{subreddit}/about/banned"),
                &[("limit", limit.to_string())],
                subreddit,
                "ban list",
            )
            .await?;

        Ok(listing
            .data
            .children
            .into_iter()
            .map(BannedUser::from)
            .collect())
    }

    async fn mod_log(
        &self,
        subreddit: &str,
        action: Option<&'static str>,
        limit: u32,
    ) -> BotResult<Vec<ModLogEntry>> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(action) = action {
            query.push(("type", action.to_string()));
        }

        let listing: Listing<ModActionThing> = self
            .get_json(
                &format!("/r/{subreddit}/about/log"),
                &query,
                subreddit,
                "moderation log",
            )
            .await?;

        Ok(listing
            .data
            .children
            .into_iter()
            .map(ModLogEntry::from)
            .collect())
    }

    async fn modmail_conversations(
        &self,
        subreddit: &str,
        state: &'static str,
        limit: u32,
    ) -> BotResult<Vec<ModmailConversation>> {
        let response: ConversationsResponse = self
            .get_json(
                "/api/mod/conversations",
                &[
                    ("entity", subreddit.to_string()),
                    ("state", state.to_string()),
                    ("limit", limit.to_string()),
                ],
                subreddit,
                "modmail",
            )
            .await?;

        Ok(response.into_conversations())
    }

    async fn reply_to_conversation(
        &self,
        conversation_id: &str,
        body: &str,
        author_hidden: bool,
    ) -> BotResult<()> {
        self.post_form(
            &format!("/api/mod/conversations/{conversation_id}"),
            &[
                ("body", body.to_string()),
                ("isAuthorHidden", author_hidden.to_string()),
                ("isInternal", "false".to_string()),
            ],
        )
        .await
    }

    async fn mute_conversation(&self, conversation_id: &str) -> BotResult<()> {
        self.post_form(
            &format!("/api/mod/conversations/{conversation_id}/mute"),
            &[("num_hours", MUTE_NUM_HOURS.to_string())],
        )
        .await
    }
}

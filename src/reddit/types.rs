//! Domain types for Reddit moderation data and the wire structs they are
//! parsed from.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user on a subreddit's ban list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannedUser {
    pub username: String,
    /// Moderator note, which usually carries the ban reason
    pub note: Option<String>,
    pub banned_at: Option<DateTime<Utc>>,
}

/// A single entry from a subreddit's moderation log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModLogEntry {
    pub id: String,
    pub action: String,
    pub moderator: String,
    pub target_user: Option<String>,
    pub details: Option<String>,
    pub created_utc: Option<DateTime<Utc>>,
}

/// A modmail conversation header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModmailConversation {
    pub id: String,
    /// The non-moderator participant, absent for internal threads
    pub participant: Option<String>,
    pub subject: String,
}

fn epoch_to_datetime(secs: Option<f64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::from_timestamp(s as i64, 0))
}

// ---------------------------------------------------------------------------
// Wire structs. Reddit wraps listings in a kind/data envelope; modmail has
// its own response shape.
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct Listing<T> {
    pub data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData<T> {
    #[serde(default = "Vec::new")]
    pub children: Vec<T>,
}

/// Child of `/r/{sub}/about/banned` (a bare user object, no envelope)
#[derive(Debug, Deserialize)]
pub(crate) struct BannedUserData {
    pub name: String,
    pub note: Option<String>,
    pub date: Option<f64>,
}

impl From<BannedUserData> for BannedUser {
    fn from(raw: BannedUserData) -> Self {
        Self {
            username: raw.name,
            note: raw.note.filter(|n| !n.is_empty()),
            banned_at: epoch_to_datetime(raw.date),
        }
    }
}

/// Child of `/r/{sub}/about/log` (a `modaction` thing)
#[derive(Debug, Deserialize)]
pub(crate) struct ModActionThing {
    pub data: ModActionData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModActionData {
    pub id: String,
    pub action: String,
    #[serde(rename = "mod")]
    pub moderator: String,
    pub target_author: Option<String>,
    pub details: Option<String>,
    pub created_utc: Option<f64>,
}

impl From<ModActionThing> for ModLogEntry {
    fn from(thing: ModActionThing) -> Self {
        let raw = thing.data;
        Self {
            id: raw.id,
            action: raw.action,
            moderator: raw.moderator,
            target_user: raw.target_author.filter(|t| !t.is_empty()),
            details: raw.details.filter(|d| !d.is_empty()),
            created_utc: epoch_to_datetime(raw.created_utc),
        }
    }
}

/// Response of `/api/mod/conversations`
#[derive(Debug, Deserialize)]
pub(crate) struct ConversationsResponse {
    #[serde(rename = "conversationIds", default = "Vec::new")]
    pub conversation_ids: Vec<String>,
    #[serde(default = "HashMap::new")]
    pub conversations: HashMap<String, ConversationData>,
}

impl ConversationsResponse {
    /// Flatten to conversation headers, preserving the listing order
    pub fn into_conversations(mut self) -> Vec<ModmailConversation> {
        self.conversation_ids
            .iter()
            .filter_map(|id| self.conversations.remove(id))
            .map(ModmailConversation::from)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConversationData {
    pub id: String,
    pub subject: Option<String>,
    pub participant: Option<ParticipantData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ParticipantData {
    pub name: Option<String>,
}

impl From<ConversationData> for ModmailConversation {
    fn from(raw: ConversationData) -> Self {
        Self {
            id: raw.id,
            participant: raw.participant.and_then(|p| p.name).filter(|n| !n.is_empty()),
            subject: raw.subject.unwrap_or_default(),
        }
    }
}

//! Reddit moderation API seam
//!
//! This module provides the domain types for moderation data and a thin
//! OAuth client over the endpoints the bots need. Everything downstream
//! talks to the [`ModerationApi`] trait so runs can be driven by fixtures
//! in tests.

mod client;
mod types;

pub use client::{ModerationApi, RedditClient};
pub use types::{BannedUser, ModLogEntry, ModmailConversation};

#[cfg(test)]
pub use client::MockModerationApi;

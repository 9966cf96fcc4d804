//! Modmail mute bot
//!
//! Finds users recently banned for the target rule, replies to their
//! modmail conversations with a canned response and mutes them, keeping a
//! JSON cache of conversations that were already handled.

mod cache;
mod rule;
mod service;

pub use cache::{CacheStats, ConversationCache, ProcessedConversation};
pub use rule::RuleMatcher;
pub use service::{MuteBot, MuteSummary};

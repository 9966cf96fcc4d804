//! Ban tracker
//!
//! Fetches moderation events for a set of subreddits, diffs them against a
//! JSON history file and reports only the entries never seen before.

mod record;
mod service;
mod store;

pub use record::BanRecord;
pub use service::{BanTracker, TrackerSummary};
pub use store::HistoryStore;

//! Processed-conversation cache
//!
//! JSON-persisted map of modmail conversations the bot has already handled,
//! with a retention window so the file does not grow forever.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::BotResult;

/// Record of a handled modmail conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedConversation {
    pub conversation_id: String,
    pub user: String,
    pub subreddit: String,
    pub processed_at: DateTime<Utc>,
    /// What was done: `responded_and_muted`, `responded_only`, `dry_run`
    pub action_taken: String,
    pub ban_reason: String,
}

/// Cache statistics for the session summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_conversations: usize,
    pub last_24h: usize,
    pub last_7d: usize,
}

/// Cache of processed conversations, keyed by conversation id
pub struct ConversationCache {
    path: PathBuf,
    retention_days: i64,
    entries: DashMap<String, ProcessedConversation>,
}

impl ConversationCache {
    /// Create an empty cache backed by the given path
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, retention_days: i64) -> Self {
        Self {
            path: path.into(),
            retention_days,
            entries: DashMap::new(),
        }
    }

    /// Load the cache file; missing or corrupt files yield an empty cache
    pub async fn load(path: impl Into<PathBuf>, retention_days: i64) -> Self {
        let cache = Self::new(path, retention_days);

        match tokio::fs::read_to_string(&cache.path).await {
            Ok(contents) => {
                match serde_json::from_str::<BTreeMap<String, ProcessedConversation>>(&contents) {
                    Ok(entries) => {
                        for (id, entry) in entries {
                            cache.entries.insert(id, entry);
                        }
                        info!(
                            count = cache.entries.len(),
                            path = %cache.path.display(),
                            "Loaded conversation cache"
                        );
                    }
                    Err(e) => {
                        warn!(path = %cache.path.display(), error = %e, "Could not load conversation cache");
                    }
                }
            }
            Err(_) => {
                info!(path = %cache.path.display(), "No existing conversation cache, starting empty");
            }
        }

        cache
    }

    /// Save the cache, overwriting the previous file
    async fn save(&self) -> BotResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let entries: BTreeMap<String, ProcessedConversation> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let json = serde_json::to_string_pretty(&entries)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    /// Whether this conversation was handled before
    #[must_use]
    pub fn is_processed(&self, conversation_id: &str) -> bool {
        self.entries.contains_key(conversation_id)
    }

    /// Record a handled conversation, prune expired entries and persist.
    ///
    /// # Errors
    /// Returns an error if the cache file cannot be written.
    pub async fn add_processed(&self, conversation: ProcessedConversation) -> BotResult<()> {
        self.entries
            .insert(conversation.conversation_id.clone(), conversation);
        self.cleanup_expired();
        if let Err(e) = self.save().await {
            error!(path = %self.path.display(), "Could not save conversation cache: {e}");
            return Err(e);
        }
        Ok(())
    }

    /// Drop entries older than the retention window
    fn cleanup_expired(&self) {
        let cutoff = Utc::now() - Duration::days(self.retention_days);
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.processed_at >= cutoff);

        let removed = before - self.entries.len();
        if removed > 0 {
            info!(removed, "Cleaned up old cache entries");
        }
    }

    /// Counts for the session summary
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let now = Utc::now();
        let day_ago = now - Duration::hours(24);
        let week_ago = now - Duration::days(7);

        let mut last_24h = 0;
        let mut last_7d = 0;
        for entry in self.entries.iter() {
            if entry.processed_at >= day_ago {
                last_24h += 1;
            }
            if entry.processed_at >= week_ago {
                last_7d += 1;
            }
        }

        CacheStats {
            total_conversations: self.entries.len(),
            last_24h,
            last_7d,
        }
    }

    /// Number of cached conversations
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Path of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(id: &str, age_days: i64) -> ProcessedConversation {
        ProcessedConversation {
            conversation_id: id.to_string(),
            user: "testuser".to_string(),
            subreddit: "testsubreddit".to_string(),
            processed_at: Utc::now() - Duration::days(age_days),
            action_taken: "responded_and_muted".to_string(),
            ban_reason: "Rule 7 violation".to_string(),
        }
    }

    #[tokio::test]
    async fn test_add_and_check_processed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ConversationCache::new(dir.path().join("cache.json"), 7);

        assert!(!cache.is_processed("test123"));
        cache.add_processed(conversation("test123", 0)).await.unwrap();
        assert!(cache.is_processed("test123"));
    }

    #[tokio::test]
    async fn test_cache_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let cache = ConversationCache::new(&path, 7);
        cache
            .add_processed(conversation("persist123", 0))
            .await
            .unwrap();

        let reloaded = ConversationCache::load(&path, 7).await;
        assert!(reloaded.is_processed("persist123"));
    }

    #[tokio::test]
    async fn test_cleanup_drops_entries_past_retention() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ConversationCache::new(dir.path().join("cache.json"), 7);

        cache.add_processed(conversation("old123", 10)).await.unwrap();
        // Adding the recent entry triggers cleanup of the old one
        cache.add_processed(conversation("recent123", 0)).await.unwrap();

        assert!(cache.is_processed("recent123"));
        assert!(!cache.is_processed("old123"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_stats_buckets() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ConversationCache::new(dir.path().join("cache.json"), 30);

        cache.add_processed(conversation("today", 0)).await.unwrap();
        cache.add_processed(conversation("this_week", 3)).await.unwrap();
        cache.add_processed(conversation("older", 20)).await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.total_conversations, 3);
        assert_eq!(stats.last_24h, 1);
        assert_eq!(stats.last_7d, 2);
    }

    #[tokio::test]
    async fn test_load_corrupt_cache_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        tokio::fs::write(&path, "[1, 2").await.unwrap();

        let cache = ConversationCache::load(&path, 7).await;
        assert!(cache.is_empty());
    }
}

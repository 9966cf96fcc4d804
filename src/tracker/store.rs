//! Ban history store
//!
//! A previously-seen set of ban records persisted as a flat JSON object.
//! The file is read fully at the start of a run and overwritten fully at
//! the end; keys are only ever added.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use tracing::{error, info};

use crate::error::BotResult;
use crate::tracker::BanRecord;

/// Store for previously reported ban records
pub struct HistoryStore {
    path: PathBuf,
    records: DashMap<String, BanRecord>,
}

impl HistoryStore {
    /// Create an empty store backed by the given path
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: DashMap::new(),
        }
    }

    /// Load the history file.
    ///
    /// A missing file yields an empty store. A corrupt file is logged and
    /// also yields an empty store, so a damaged history never blocks a run.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let store = Self::new(path);

        match tokio::fs::read_to_string(&store.path).await {
            Ok(contents) => match serde_json::from_str::<BTreeMap<String, BanRecord>>(&contents) {
                Ok(entries) => {
                    for (key, record) in entries {
                        store.records.insert(key, record);
                    }
                    info!(
                        count = store.records.len(),
                        path = %store.path.display(),
                        "Loaded ban history"
                    );
                }
                Err(e) => {
                    error!(path = %store.path.display(), error = %e, "Could not parse ban history, starting empty");
                }
            },
            Err(_) => {
                info!(path = %store.path.display(), "No existing ban history file, starting empty");
            }
        }

        store
    }

    /// Save the full history to disk, overwriting the previous file.
    ///
    /// # Errors
    /// Returns an error if the parent directory cannot be created or the
    /// JSON cannot be written.
    pub async fn save(&self) -> BotResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // BTreeMap so output ordering is stable across runs
        let entries: BTreeMap<String, BanRecord> = self
            .records
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let json = serde_json::to_string_pretty(&entries)?;
        tokio::fs::write(&self.path, json).await?;

        info!(
            count = entries.len(),
            path = %self.path.display(),
            "Saved ban history"
        );
        Ok(())
    }

    /// Whether a record with this key has been seen before
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Records in `fresh` whose keys are absent from the history
    #[must_use]
    pub fn diff<'a>(&self, fresh: &'a [BanRecord]) -> Vec<&'a BanRecord> {
        fresh
            .iter()
            .filter(|record| !self.contains(&record.history_key()))
            .collect()
    }

    /// Merge fetched records into the history. Existing keys keep their
    /// original record; returns the number of keys added.
    pub fn merge(&self, fresh: &[BanRecord]) -> usize {
        let mut added = 0;
        for record in fresh {
            let key = record.history_key();
            if !self.records.contains_key(&key) {
                self.records.insert(key, record.clone());
                added += 1;
            }
        }
        added
    }

    /// Number of records in the history
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the history is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
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
    use chrono::{DateTime, Utc};

    fn record(subreddit: &str, target: &str) -> BanRecord {
        BanRecord {
            subreddit: subreddit.to_string(),
            action: "banuser".to_string(),
            target_user: target.to_string(),
            details: Some("Rule 7".to_string()),
            moderator: "some_mod".to_string(),
            created_utc: DateTime::from_timestamp(1_700_000_000, 0),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_diff_finds_exactly_the_unseen_records() {
        let store = HistoryStore::new("unused.json");
        let a = record("announcements", "a");
        let b = record("announcements", "b");
        let c = record("announcements", "c");

        store.merge(&[a.clone(), b.clone()]);

        let fresh = vec![a, b, c];
        let new = store.diff(&fresh);
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].target_user, "c");
    }

    #[test]
    fn test_merge_only_grows() {
        let store = HistoryStore::new("unused.json");
        let a = record("announcements", "a");
        let b = record("announcements", "b");

        assert_eq!(store.merge(&[a.clone()]), 1);
        assert_eq!(store.len(), 1);

        // Re-merging the same data adds nothing and removes nothing
        assert_eq!(store.merge(&[a.clone(), b]), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.merge(&[a]), 0);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banned_users.json");

        let store = HistoryStore::new(&path);
        store.merge(&[record("announcements", "a"), record("help", "b")]);
        store.save().await.unwrap();

        let reloaded = HistoryStore::load(&path).await;
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains(&record("announcements", "a").history_key()));
        assert!(reloaded.contains(&record("help", "b").history_key()));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::load(dir.path().join("nope.json")).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banned_users.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let store = HistoryStore::load(&path).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_history_superset_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banned_users.json");

        // First run sees one record
        let store = HistoryStore::load(&path).await;
        store.merge(&[record("announcements", "a")]);
        store.save().await.unwrap();

        // Second run sees a different record; the first must survive
        let store = HistoryStore::load(&path).await;
        store.merge(&[record("announcements", "b")]);
        store.save().await.unwrap();

        let final_store = HistoryStore::load(&path).await;
        assert_eq!(final_store.len(), 2);
    }
}

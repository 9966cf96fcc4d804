//! Ban tracker service
//!
//! Drives one tracker run: fetch moderation events through the API seam,
//! diff against the history store, report the new entries and persist the
//! union.

use std::io::Write;

use tracing::{error, info, warn};

use crate::TRACKER_TARGET;
use crate::error::BotResult;
use crate::reddit::ModerationApi;
use crate::tracker::{BanRecord, HistoryStore};

/// Outcome of a single tracker run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSummary {
    /// Records fetched upstream this run
    pub fetched: usize,
    /// Records reported as new
    pub new_reported: usize,
    /// Keys added to the history
    pub added: usize,
}

/// Service that fetches, diffs, reports and persists ban records
pub struct BanTracker<C> {
    client: C,
    store: HistoryStore,
    limit: u32,
}

impl<C: ModerationApi> BanTracker<C> {
    pub fn new(client: C, store: HistoryStore, limit: u32) -> Self {
        Self {
            client,
            store,
            limit,
        }
    }

    /// Run the tracker over the given subreddits, writing the report to
    /// `out`.
    ///
    /// # Errors
    /// Returns an error only when the report cannot be written or the
    /// history cannot be saved; per-subreddit API failures are logged and
    /// skip that subreddit.
    pub async fn run(
        &self,
        subreddits: &[String],
        out: &mut (impl Write + Send),
    ) -> BotResult<TrackerSummary> {
        info!(target: TRACKER_TARGET, "Starting ban tracker run");

        let mut fetched = self.fetch_ban_lists(subreddits).await;
        if fetched.is_empty() {
            info!(
                target: TRACKER_TARGET,
                "No ban data available, trying moderation log data"
            );
            fetched = self.fetch_mod_logs(subreddits).await;
        }

        let new = self.store.diff(&fetched);
        info!(
            target: TRACKER_TARGET,
            new = new.len(),
            total = fetched.len(),
            "Identified new entries"
        );

        Self::report(out, &new)?;
        let new_reported = new.len();

        let added = self.store.merge(&fetched);
        if fetched.is_empty() {
            warn!(target: TRACKER_TARGET, "No ban or moderation data was fetched");
        } else {
            self.store.save().await?;
        }

        Ok(TrackerSummary {
            fetched: fetched.len(),
            new_reported,
            added,
        })
    }

    /// Fetch ban lists; moderator-only, so permission failures are expected
    /// and only logged.
    async fn fetch_ban_lists(&self, subreddits: &[String]) -> Vec<BanRecord> {
        let mut records = Vec::new();

        for subreddit in subreddits {
            info!(target: TRACKER_TARGET, subreddit = %subreddit, "Fetching ban list");
            match self.client.banned_users(subreddit, self.limit).await {
                Ok(users) => {
                    records.extend(
                        users
                            .into_iter()
                            .map(|user| BanRecord::from_ban(subreddit, user)),
                    );
                }
                Err(e) if e.is_permission_denied() => {
                    warn!(
                        target: TRACKER_TARGET,
                        subreddit = %subreddit,
                        "Cannot access ban list: {e}"
                    );
                }
                Err(e) => {
                    error!(
                        target: TRACKER_TARGET,
                        subreddit = %subreddit,
                        "Error fetching ban list: {e}"
                    );
                }
            }
        }

        records
    }

    /// Fallback: the moderation log, which is readable on more subreddits
    async fn fetch_mod_logs(&self, subreddits: &[String]) -> Vec<BanRecord> {
        let mut records = Vec::new();

        for subreddit in subreddits {
            info!(target: TRACKER_TARGET, subreddit = %subreddit, "Fetching moderation log");
            match self.client.mod_log(subreddit, None, self.limit).await {
                Ok(entries) => {
                    records.extend(
                        entries
                            .into_iter()
                            .map(|entry| BanRecord::from_mod_log(subreddit, entry)),
                    );
                }
                Err(e) if e.is_permission_denied() => {
                    warn!(
                        target: TRACKER_TARGET,
                        subreddit = %subreddit,
                        "Cannot access moderation log: {e}"
                    );
                }
                Err(e) => {
                    error!(
                        target: TRACKER_TARGET,
                        subreddit = %subreddit,
                        "Error fetching moderation log: {e}"
                    );
                }
            }
        }

        records
    }

    /// Print new records in the fixed report layout
    fn report(out: &mut impl Write, new: &[&BanRecord]) -> BotResult<()> {
        let banner = "=".repeat(50);

        if new.is_empty() {
            writeln!(out, "\n{banner}")?;
            writeln!(out, "No new bans found!")?;
            writeln!(out, "{banner}")?;
            return Ok(());
        }

        writeln!(out, "\n{banner}")?;
        writeln!(out, "NEW BANS DETECTED: {}", new.len())?;
        writeln!(out, "{banner}")?;
        for record in new {
            writeln!(out, "\n{record}")?;
        }

        Ok(())
    }

    /// Consume the tracker and hand back its store
    pub fn into_store(self) -> HistoryStore {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BotError;
    use crate::reddit::{BannedUser, MockModerationApi, ModLogEntry};
    use chrono::DateTime;

    fn banned(username: &str) -> BannedUser {
        BannedUser {
            username: username.to_string(),
            note: Some("Rule 7".to_string()),
            banned_at: DateTime::from_timestamp(1_700_000_000, 0),
        }
    }

    fn log_entry(target: &str) -> ModLogEntry {
        ModLogEntry {
            id: format!("ModAction_{target}"),
            action: "banuser".to_string(),
            moderator: "some_mod".to_string(),
            target_user: Some(target.to_string()),
            details: Some("Rule 7: spam".to_string()),
            created_utc: DateTime::from_timestamp(1_700_000_000, 0),
        }
    }

    fn subs(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_first_run_reports_everything() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        let mut client = MockModerationApi::new();
        client
            .expect_banned_users()
            .returning(|_, _| Ok(vec![banned("alice"), banned("bob")]));

        let tracker = BanTracker::new(client, store, 50);
        let mut out = Vec::new();
        let summary = tracker.run(&subs(&["announcements"]), &mut out).await.unwrap();

        assert_eq!(summary.fetched, 2);
        assert_eq!(summary.new_reported, 2);
        assert_eq!(summary.added, 2);

        let report = String::from_utf8(out).unwrap();
        assert!(report.contains("NEW BANS DETECTED: 2"));
        assert!(report.contains("Target: u/alice"));
        assert!(report.contains("Target: u/bob"));
    }

    #[tokio::test]
    async fn test_second_run_with_identical_data_reports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        let mut client = MockModerationApi::new();
        client
            .expect_banned_users()
            .times(2)
            .returning(|_, _| Ok(vec![banned("alice")]));

        let tracker = BanTracker::new(client, store, 50);

        let mut out = Vec::new();
        let first = tracker.run(&subs(&["announcements"]), &mut out).await.unwrap();
        assert_eq!(first.new_reported, 1);

        let mut out = Vec::new();
        let second = tracker.run(&subs(&["announcements"]), &mut out).await.unwrap();
        assert_eq!(second.new_reported, 0);
        assert_eq!(second.added, 0);

        let report = String::from_utf8(out).unwrap();
        assert!(report.contains("No new bans found!"));
    }

    #[tokio::test]
    async fn test_diff_reports_only_the_unseen_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        // history = {A, B}
        store.merge(&[
            BanRecord::from_ban("announcements", banned("a")),
            BanRecord::from_ban("announcements", banned("b")),
        ]);

        // fresh = {A, B, C}
        let mut client = MockModerationApi::new();
        client
            .expect_banned_users()
            .returning(|_, _| Ok(vec![banned("a"), banned("b"), banned("c")]));

        let tracker = BanTracker::new(client, store, 50);
        let mut out = Vec::new();
        let summary = tracker.run(&subs(&["announcements"]), &mut out).await.unwrap();

        assert_eq!(summary.new_reported, 1);
        let report = String::from_utf8(out).unwrap();
        assert!(report.contains("Target: u/c"));
        assert!(!report.contains("Target: u/a\n"));
    }

    #[tokio::test]
    async fn test_permission_denied_falls_back_to_mod_log() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        let mut client = MockModerationApi::new();
        client.expect_banned_users().returning(|subreddit, _| {
            Err(BotError::PermissionDenied {
                subreddit: subreddit.to_string(),
                resource: "ban list".to_string(),
            })
        });
        client
            .expect_mod_log()
            .returning(|_, _, _| Ok(vec![log_entry("spammer")]));

        let tracker = BanTracker::new(client, store, 50);
        let mut out = Vec::new();
        let summary = tracker.run(&subs(&["announcements"]), &mut out).await.unwrap();

        assert_eq!(summary.fetched, 1);
        let report = String::from_utf8(out).unwrap();
        assert!(report.contains("Action: banuser"));
        assert!(report.contains("Moderator: some_mod"));
    }

    #[tokio::test]
    async fn test_failing_subreddit_does_not_abort_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        let mut client = MockModerationApi::new();
        client.expect_banned_users().returning(|subreddit, _| {
            if subreddit == "broken" {
                Err(BotError::Other("boom".to_string()))
            } else {
                Ok(vec![banned("alice")])
            }
        });

        let tracker = BanTracker::new(client, store, 50);
        let mut out = Vec::new();
        let summary = tracker
            .run(&subs(&["broken", "announcements"]), &mut out)
            .await
            .unwrap();

        assert_eq!(summary.fetched, 1);
        assert_eq!(summary.new_reported, 1);
    }
}

//! Mute bot service
//!
//! Drives one mute-bot run: find users recently banned for the target rule,
//! scan modmail for unhandled conversations from them, reply and mute, and
//! record everything in the conversation cache.

use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use crate::MUTE_TARGET;
use crate::config::MuteConfig;
use crate::error::BotResult;
use crate::mutebot::{ConversationCache, ProcessedConversation, RuleMatcher};
use crate::reddit::{ModerationApi, ModmailConversation};

/// Outcome of a single mute-bot run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuteSummary {
    /// Conversations handled per subreddit
    pub results: BTreeMap<String, usize>,
    /// Conversations handled in total
    pub total: usize,
}

/// Service that auto-handles modmail from rule-violation bans
pub struct MuteBot<C> {
    client: C,
    cache: ConversationCache,
    config: MuteConfig,
    matcher: RuleMatcher,
}

impl<C: ModerationApi> MuteBot<C> {
    pub fn new(client: C, cache: ConversationCache, config: MuteConfig) -> Self {
        let matcher = RuleMatcher::new(&config.target_rule);
        Self {
            client,
            cache,
            config,
            matcher,
        }
    }

    /// Run the bot over the given subreddits.
    ///
    /// Per-subreddit failures are logged and count as zero conversations;
    /// the run itself only fails if nothing can be persisted.
    pub async fn run(&self, subreddits: &[String]) -> BotResult<MuteSummary> {
        info!(target: MUTE_TARGET, "Starting mute bot run");
        if self.config.dry_run {
            info!(
                target: MUTE_TARGET,
                "Running in dry-run mode, no actions will be taken"
            );
        }

        let mut results = BTreeMap::new();
        let mut total = 0;

        for subreddit in subreddits {
            info!(target: MUTE_TARGET, subreddit = %subreddit, "Processing subreddit");
            let processed = match self.process_subreddit(subreddit).await {
                Ok(count) => count,
                Err(e) => {
                    error!(
                        target: MUTE_TARGET,
                        subreddit = %subreddit,
                        "Error processing subreddit: {e}"
                    );
                    0
                }
            };
            total += processed;
            results.insert(subreddit.clone(), processed);
        }

        let stats = self.cache.stats();
        info!(
            target: MUTE_TARGET,
            total,
            cache_total = stats.total_conversations,
            cache_last_24h = stats.last_24h,
            cache_last_7d = stats.last_7d,
            "Session complete"
        );

        Ok(MuteSummary { results, total })
    }

    async fn process_subreddit(&self, subreddit: &str) -> BotResult<usize> {
        let recent_bans = self.recent_rule_bans(subreddit).await;
        if recent_bans.is_empty() {
            info!(
                target: MUTE_TARGET,
                subreddit = %subreddit,
                rule = %self.config.target_rule,
                "No recent qualifying bans found"
            );
            return Ok(0);
        }

        // Lowercased usernames, since modmail participants vary in case
        let banned: HashMap<String, String> = recent_bans
            .into_iter()
            .map(|(user, reason)| (user.to_lowercase(), reason))
            .collect();
        info!(
            target: MUTE_TARGET,
            subreddit = %subreddit,
            users = banned.len(),
            "Processing modmail for recently banned users"
        );

        let fetch_limit =
            u32::try_from(self.config.max_conversations_per_run).unwrap_or(u32::MAX);
        let conversations = self
            .client
            .modmail_conversations(subreddit, "all", fetch_limit)
            .await?;

        let mut processed = 0;
        for conversation in conversations {
            if processed >= self.config.max_conversations_per_run {
                break;
            }
            if self.cache.is_processed(&conversation.id) {
                continue;
            }
            let Some(username) = conversation.participant.clone() else {
                continue;
            };
            let Some(ban_reason) = banned.get(&username.to_lowercase()) else {
                continue;
            };

            processed += self
                .handle_conversation(subreddit, &conversation, &username, ban_reason)
                .await;
        }

        Ok(processed)
    }

    /// Recently banned users whose ban reason matches the target rule, as
    /// (username, reason) pairs. Falls back from the moderation log to the
    /// ban list; failures are logged and yield an empty set.
    async fn recent_rule_bans(&self, subreddit: &str) -> Vec<(String, String)> {
        let cutoff = Utc::now() - Duration::days(self.config.lookback_days);
        let fetch_limit =
            u32::try_from(self.config.max_conversations_per_run * 2).unwrap_or(u32::MAX);

        match self.client.mod_log(subreddit, Some("banuser"), fetch_limit).await {
            Ok(entries) => entries
                .into_iter()
                .filter(|entry| entry.created_utc.is_none_or(|t| t >= cutoff))
                .filter_map(|entry| {
                    let target = entry.target_user?;
                    let details = entry.details?;
                    self.matcher.matches(&details).then_some((target, details))
                })
                .collect(),
            Err(e) => {
                warn!(
                    target: MUTE_TARGET,
                    subreddit = %subreddit,
                    "Cannot access moderation log, falling back to ban list: {e}"
                );
                match self.client.banned_users(subreddit, 100).await {
                    Ok(users) => users
                        .into_iter()
                        .filter_map(|user| {
                            let note = user.note?;
                            self.matcher
                                .matches(&note)
                                .then_some((user.username, note))
                        })
                        .collect(),
                    Err(e) => {
                        warn!(
                            target: MUTE_TARGET,
                            subreddit = %subreddit,
                            "Cannot access ban list: {e}"
                        );
                        Vec::new()
                    }
                }
            }
        }
    }

    /// Handle one qualifying conversation; returns 1 when it was recorded
    async fn handle_conversation(
        &self,
        subreddit: &str,
        conversation: &ModmailConversation,
        username: &str,
        ban_reason: &str,
    ) -> usize {
        info!(
            target: MUTE_TARGET,
            conversation = %conversation.id,
            user = %username,
            "Processing conversation from banned user"
        );

        let action_taken = if self.config.dry_run {
            info!(
                target: MUTE_TARGET,
                conversation = %conversation.id,
                user = %username,
                "DRY RUN: would respond and mute"
            );
            "dry_run"
        } else {
            let body = self.config.render_response(username, subreddit);
            match self
                .client
                .reply_to_conversation(&conversation.id, &body, true)
                .await
            {
                Ok(()) => info!(target: MUTE_TARGET, user = %username, "Sent response"),
                Err(e) => error!(target: MUTE_TARGET, user = %username, "Failed to send response: {e}"),
            }

            if self.config.auto_mute {
                match self.client.mute_conversation(&conversation.id).await {
                    Ok(()) => info!(target: MUTE_TARGET, user = %username, "Muted conversation"),
                    Err(e) => {
                        error!(target: MUTE_TARGET, user = %username, "Failed to mute conversation: {e}");
                    }
                }
                "responded_and_muted"
            } else {
                "responded_only"
            }
        };

        let record = ProcessedConversation {
            conversation_id: conversation.id.clone(),
            user: username.to_string(),
            subreddit: subreddit.to_string(),
            processed_at: Utc::now(),
            action_taken: action_taken.to_string(),
            ban_reason: ban_reason.to_string(),
        };

        if let Err(e) = self.cache.add_processed(record).await {
            error!(
                target: MUTE_TARGET,
                conversation = %conversation.id,
                "Could not record processed conversation: {e}"
            );
        }

        1
    }

    /// Consume the bot and hand back its cache
    pub fn into_cache(self) -> ConversationCache {
        self.cache
    }
}

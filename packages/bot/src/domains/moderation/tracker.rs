//! Post lifecycle tracking.
//!
//! The tracker owns the working set and drives one poll cycle:
//!
//! ```text
//! run_cycle
//!     ├─► admit_posts (new + unmoderated listings, marker guard)
//!     ├─► refresh (re-sync moderation flags, tolerate per-post failures)
//!     ├─► For each record → resolve → decide → execute
//!     └─► retire checked records into the bounded recently-retired set
//! ```
//!
//! Nothing is persisted: after a restart the working set is rebuilt from the
//! listings, and the bot's own comments on the forum are the only durable
//! evidence of what was already handled.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::kernel::{BaseForum, CommentNode, PostSnapshot};

use super::models::PostRecord;
use super::policy::{Action, ActionPolicy};
use super::resolver::{find_request_comment, StatementResolver};
use super::templates;

/// How many retired permalinks to remember for cross-cycle dedup. Anything
/// evicted past this bound is still covered by the confirmation marker on
/// the forum itself.
const RETIRED_CAPACITY: usize = 1024;

/// Subreddit-specific carve-outs (e.g. a weekly casual-flair exception),
/// injected as a predicate instead of configuration subclassing. Exempt
/// posts are never tracked.
pub type ExemptionRule = Box<dyn Fn(&PostSnapshot) -> bool + Send + Sync>;

/// A cycle failed before any per-post work could happen. Per-post failures
/// never surface here; they are logged and retried next cycle.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("new-posts feed unavailable")]
    FeedUnavailable(#[source] anyhow::Error),
}

/// What one cycle did, for the log line and for tests.
#[derive(Debug, Clone)]
pub struct CycleStats {
    pub cycle_id: Uuid,
    pub admitted: usize,
    pub actions: usize,
    pub retired: usize,
    pub skipped: usize,
    pub tracked: usize,
    pub elapsed: std::time::Duration,
}

impl std::fmt::Display for CycleStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "admitted {} post(s), took {} action(s), retired {}, skipped {}, tracking {} ({:?})",
            self.admitted, self.actions, self.retired, self.skipped, self.tracked, self.elapsed
        )
    }
}

pub struct LifecycleTracker {
    forum: Arc<dyn BaseForum>,
    config: Arc<Config>,
    resolver: StatementResolver,
    policy: ActionPolicy,
    /// Working set, keyed by permalink.
    records: BTreeMap<String, PostRecord>,
    recently_retired: RecentSet,
    exemption: Option<ExemptionRule>,
    started_at: DateTime<Utc>,
}

impl LifecycleTracker {
    pub fn new(forum: Arc<dyn BaseForum>, config: Arc<Config>) -> Self {
        Self {
            forum,
            resolver: StatementResolver::new(config.username.clone()),
            policy: ActionPolicy::new(config.clone()),
            config,
            records: BTreeMap::new(),
            recently_retired: RecentSet::new(RETIRED_CAPACITY),
            exemption: None,
            started_at: Utc::now(),
        }
    }

    /// Override the backfill cutoff; posts created at or before this instant
    /// are never admitted.
    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn with_exemption_rule(mut self, rule: ExemptionRule) -> Self {
        self.exemption = Some(rule);
        self
    }

    pub fn tracked_count(&self) -> usize {
        self.records.len()
    }

    pub fn is_tracked(&self, permalink: &str) -> bool {
        self.records.contains_key(permalink)
    }

    /// Discard the in-memory working set after a failed cycle. The next
    /// cycle rebuilds it from the listings plus the durable markers; posts
    /// whose only "checked" evidence was in memory may be handled again.
    pub fn reset(&mut self) {
        let dropped = self.records.len();
        if dropped > 0 {
            warn!(dropped, "discarding in-memory working set");
        }
        self.records.clear();
        self.recently_retired.clear();
    }

    /// One full poll cycle: admit, refresh, resolve, decide, execute, retire.
    pub async fn run_cycle(&mut self) -> Result<CycleStats, CycleError> {
        let cycle_id = Uuid::new_v4();
        let started = Instant::now();
        // One clock reading per cycle, so every decision in it agrees on
        // what "now" means.
        let now = Utc::now();
        debug!(cycle_id = %cycle_id, tracked = self.records.len(), "cycle starting");

        let admitted = self.admit_posts().await?;
        let unreachable = self.refresh().await;

        let mut actions = 0;
        let mut retired = 0;
        let mut skipped = unreachable.len();

        let permalinks: Vec<String> = self.records.keys().cloned().collect();
        for permalink in permalinks {
            if unreachable.contains(&permalink) {
                continue;
            }
            let Some(mut record) = self.records.remove(&permalink) else {
                continue;
            };

            match self.handle_record(&mut record, now).await {
                Ok(acted) => {
                    if acted {
                        actions += 1;
                    }
                }
                Err(error) => {
                    warn!(
                        permalink = %permalink,
                        error = %error,
                        "post skipped this cycle"
                    );
                    skipped += 1;
                }
            }

            if record.checked() {
                self.recently_retired.insert(record.permalink().to_string());
                retired += 1;
            } else {
                self.records.insert(permalink, record);
            }
        }

        let stats = CycleStats {
            cycle_id,
            admitted,
            actions,
            retired,
            skipped,
            tracked: self.records.len(),
            elapsed: started.elapsed(),
        };
        info!(cycle_id = %cycle_id, "cycle complete: {stats}");
        Ok(stats)
    }

    /// Pull both listings and start tracking anything new. The new-posts
    /// feed is load-bearing (its failure aborts the cycle); the unmoderated
    /// sweep is best-effort.
    async fn admit_posts(&mut self) -> Result<usize, CycleError> {
        let mut posts = self
            .forum
            .new_posts()
            .await
            .map_err(CycleError::FeedUnavailable)?;

        match self.forum.unmoderated_posts().await {
            Ok(more) => posts.extend(more),
            Err(error) => warn!(
                error = %error,
                "unmoderated listing unavailable; continuing with the new feed"
            ),
        }

        let mut admitted = 0;
        for post in posts {
            if post.created_at <= self.started_at {
                continue;
            }
            if post.flags.removed {
                continue;
            }
            if self.records.contains_key(&post.permalink)
                || self.recently_retired.contains(&post.permalink)
            {
                continue;
            }
            if let Some(rule) = &self.exemption {
                if rule(&post) {
                    debug!(permalink = %post.permalink, "post exempt by rule; not tracking");
                    self.recently_retired.insert(post.permalink.clone());
                    continue;
                }
            }

            match self.was_already_finalized(&post).await {
                Ok(true) => {
                    debug!(
                        permalink = %post.permalink,
                        "confirmation marker already present; not tracking"
                    );
                    self.recently_retired.insert(post.permalink.clone());
                    continue;
                }
                Ok(false) => {}
                Err(error) => {
                    warn!(
                        permalink = %post.permalink,
                        error = %error,
                        "could not check for a prior confirmation; retrying next cycle"
                    );
                    continue;
                }
            }

            debug!(permalink = %post.permalink, title = %post.title, "tracking new post");
            self.records
                .insert(post.permalink.clone(), PostRecord::new(post));
            admitted += 1;
        }
        Ok(admitted)
    }

    /// The durable restart guard: a confirmation comment on the forum is the
    /// only evidence that an earlier process already handled this post.
    /// At-least-once, not exactly-once; a crash between posting the
    /// confirmation and the next scan can still double-handle.
    async fn was_already_finalized(&self, post: &PostSnapshot) -> Result<bool> {
        let tree = self.forum.comment_tree(&post.id).await?;
        Ok(tree.iter().any(|comment| {
            comment.author.as_deref() == Some(self.config.username.as_str())
                && comment.body.contains(templates::CONFIRMATION_MARKER)
        }))
    }

    /// Re-sync every tracked post's moderation flags. Returns the permalinks
    /// that could not be refreshed; those are left untouched this cycle.
    async fn refresh(&mut self) -> HashSet<String> {
        let mut unreachable = HashSet::new();
        let keys: Vec<(String, String)> = self
            .records
            .values()
            .map(|r| (r.permalink().to_string(), r.id().to_string()))
            .collect();

        for (permalink, id) in keys {
            match self.forum.refresh_post(&id).await {
                Ok(snapshot) => {
                    if let Some(record) = self.records.get_mut(&permalink) {
                        record.apply_snapshot(&snapshot);
                    }
                }
                Err(error) => {
                    warn!(
                        permalink = %permalink,
                        error = %error,
                        "could not refresh post; skipping it this cycle"
                    );
                    unreachable.insert(permalink);
                }
            }
        }
        unreachable
    }

    /// Resolve, decide, and execute for one record. Returns whether a forum
    /// action was taken. Errors leave the record exactly as the cycle found
    /// it, minus whatever monotonic progress already stuck.
    async fn handle_record(&self, record: &mut PostRecord, now: DateTime<Utc>) -> Result<bool> {
        if record.flags().removed {
            debug!(
                permalink = %record.permalink(),
                "post removed by a moderator; dropping without action"
            );
            record.finalize(false);
            return Ok(false);
        }

        let tree = self.forum.comment_tree(record.id()).await?;
        let resolution = self.resolver.resolve(record, &tree);

        // Seeing our own request comment is how a restarted tracker
        // re-learns that the request was already made.
        if resolution.request_observed() {
            record.mark_requested();
        }
        record.statement = resolution.candidate().cloned();

        let action = self
            .policy
            .decide(record, record.statement.as_ref(), now);
        self.execute(record, action, &tree).await
    }

    async fn execute(
        &self,
        record: &mut PostRecord,
        action: Action,
        tree: &[CommentNode],
    ) -> Result<bool> {
        match action {
            Action::None => Ok(false),

            Action::Request => {
                let body = templates::request_body(&self.config);
                let comment_id = self.forum.reply_to_post(record.id(), &body).await?;
                self.forum
                    .distinguish_comment(&comment_id, self.config.pin_request)
                    .await?;
                record.mark_requested();
                info!(
                    permalink = %record.permalink(),
                    title = %record.title(),
                    "requested submission statement"
                );
                Ok(true)
            }

            Action::Accept => {
                let acted = if let Some(statement) = record.statement.clone() {
                    let body =
                        templates::confirmation_body(&statement.author, &statement.body, &self.config);
                    let comment_id = self.forum.reply_to_post(record.id(), &body).await?;
                    self.forum
                        .distinguish_comment(&comment_id, self.config.pin_confirmation)
                        .await?;
                    self.forum.lock_comment(&comment_id).await?;
                    if self.config.strip_request_thread {
                        self.strip_request_thread(tree).await?;
                    }
                    info!(
                        permalink = %record.permalink(),
                        statement = %statement.comment_id,
                        "statement accepted"
                    );
                    true
                } else {
                    debug!(
                        permalink = %record.permalink(),
                        "distinguished post; requirement waived"
                    );
                    false
                };
                record.finalize(true);
                Ok(acted)
            }

            Action::RejectShort | Action::RejectMissingKeywords | Action::RejectNoStatement => {
                let note = action
                    .removal_note()
                    .unwrap_or(templates::NOTE_NO_STATEMENT);

                if action == Action::RejectNoStatement && self.config.strip_request_thread {
                    self.strip_request_thread(tree).await?;
                }

                let report_only = !self.config.remove_posts
                    || (self.config.report_approved_posts && record.flags().approved);

                if report_only {
                    self.forum.report_post(record.id(), note).await?;
                    if let Some(statement) = &record.statement {
                        self.forum
                            .report_comment(&statement.comment_id, note)
                            .await?;
                    }
                    info!(permalink = %record.permalink(), reason = note, "post reported");
                } else {
                    self.forum.remove_post(record.id(), note).await?;
                    let body = templates::removal_body(note, &self.config);
                    let comment_id = self.forum.reply_to_post(record.id(), &body).await?;
                    self.forum.distinguish_comment(&comment_id, true).await?;
                    info!(permalink = %record.permalink(), reason = note, "post removed");
                }

                record.finalize(false);
                Ok(true)
            }
        }
    }

    /// Remove every reply under the bot's request comment, then delete the
    /// request comment itself.
    async fn strip_request_thread(&self, tree: &[CommentNode]) -> Result<()> {
        let Some(request) = find_request_comment(tree, &self.config.username) else {
            return Ok(());
        };
        for reply in request.descendants() {
            self.forum.remove_comment(&reply.id).await?;
        }
        self.forum.delete_comment(&request.id).await?;
        Ok(())
    }
}

/// An insertion-ordered set with a hard capacity; inserting past the bound
/// evicts the oldest member.
struct RecentSet {
    capacity: usize,
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl RecentSet {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
        }
    }

    fn insert(&mut self, value: String) {
        if self.members.contains(&value) {
            return;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        self.members.insert(value.clone());
        self.order.push_back(value);
    }

    fn contains(&self, value: &str) -> bool {
        self.members.contains(value)
    }

    fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_set_evicts_oldest_past_capacity() {
        let mut set = RecentSet::new(2);
        set.insert("a".to_string());
        set.insert("b".to_string());
        set.insert("c".to_string());

        assert!(!set.contains("a"));
        assert!(set.contains("b"));
        assert!(set.contains("c"));
    }

    #[test]
    fn recent_set_ignores_duplicates() {
        let mut set = RecentSet::new(2);
        set.insert("a".to_string());
        set.insert("a".to_string());
        set.insert("b".to_string());

        // "a" was inserted once; both members still fit.
        assert!(set.contains("a"));
        assert!(set.contains("b"));
        assert_eq!(set.order.len(), 2);
    }
}

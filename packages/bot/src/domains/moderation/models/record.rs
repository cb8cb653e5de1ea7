use chrono::{DateTime, Duration, Utc};

use crate::kernel::{ModerationFlags, PostSnapshot};

use super::CandidateStatement;

/// One tracked post and its place in the submission-statement protocol.
///
/// Identity (id, permalink, title, author, creation time) is fixed at
/// construction; map membership uses the permalink only, never the mutable
/// snapshot. The three protocol booleans move in one direction: `requested`
/// and `checked` are never unset, and `valid` implies `checked`.
#[derive(Debug, Clone)]
pub struct PostRecord {
    id: String,
    permalink: String,
    title: String,
    created_at: DateTime<Utc>,

    flags: ModerationFlags,

    requested: bool,
    checked: bool,
    valid: bool,

    /// The statement resolved for this post during the current cycle.
    pub statement: Option<CandidateStatement>,
}

impl PostRecord {
    /// Track a post on first observation; all protocol state starts false.
    pub fn new(snapshot: PostSnapshot) -> Self {
        Self {
            id: snapshot.id,
            permalink: snapshot.permalink,
            title: snapshot.title,
            created_at: snapshot.created_at,
            flags: snapshot.flags,
            requested: false,
            checked: false,
            valid: false,
            statement: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn permalink(&self) -> &str {
        &self.permalink
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn flags(&self) -> ModerationFlags {
        self.flags
    }

    pub fn requested(&self) -> bool {
        self.requested
    }

    pub fn checked(&self) -> bool {
        self.checked
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    /// Fold a fresh observation into the record. Only the moderation flags
    /// are taken; identity fields are ignored even if the source disagrees.
    pub fn apply_snapshot(&mut self, snapshot: &PostSnapshot) {
        self.flags = snapshot.flags;
    }

    /// The bot has asked (or observed that it already asked) for a statement.
    pub fn mark_requested(&mut self) {
        self.requested = true;
    }

    /// Record the final determination. Monotonic: once checked, later calls
    /// can only widen `valid`, never revoke it.
    pub fn finalize(&mut self, valid: bool) {
        self.checked = true;
        self.valid = self.valid || valid;
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }
}

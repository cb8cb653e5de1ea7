// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// The moderation rules (what to request, when to remove) live in the
// domains/moderation components, which only ever see this contract.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Moderation-state flags of a post, as last observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationFlags {
    /// A moderator explicitly approved the post.
    pub approved: bool,
    /// A moderator removed the post.
    pub removed: bool,
    /// The post was made in official moderator capacity.
    pub distinguished: bool,
}

/// One observation of a post. Identity fields (`id`, `permalink`, `author`,
/// `created_at`) never change between observations; the flags do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSnapshot {
    pub id: String,
    pub permalink: String,
    pub title: String,
    /// None when the account was deleted.
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_self: bool,
    pub flags: ModerationFlags,
}

/// One comment in a fully expanded tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentNode {
    /// Fullname, e.g. `t1_abc123`.
    pub id: String,
    pub author: Option<String>,
    pub body: String,
    /// Authored by the post's original poster.
    pub is_submitter: bool,
    pub distinguished: bool,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    /// Flatten this comment's whole reply subtree, depth first.
    pub fn descendants(&self) -> Vec<&CommentNode> {
        let mut out = Vec::new();
        let mut stack: Vec<&CommentNode> = self.replies.iter().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.replies.iter());
        }
        out
    }
}

// =============================================================================
// Forum Trait (Infrastructure - everything the bot asks of Reddit)
// =============================================================================

/// The external forum collaborator. One implementation talks to Reddit
/// (`RedditForum`); tests inject `MockForum`.
///
/// Comment trees returned by `comment_tree` have every lazy placeholder node
/// already expanded; callers never see pagination.
#[async_trait]
pub trait BaseForum: Send + Sync {
    /// Newest submissions, newest first.
    async fn new_posts(&self) -> Result<Vec<PostSnapshot>>;

    /// Submissions still awaiting moderator review.
    async fn unmoderated_posts(&self) -> Result<Vec<PostSnapshot>>;

    /// Re-fetch one post to pick up moderation-state changes.
    async fn refresh_post(&self, post_id: &str) -> Result<PostSnapshot>;

    /// Top-level comments (with nested replies) of a post.
    async fn comment_tree(&self, post_id: &str) -> Result<Vec<CommentNode>>;

    /// Post a top-level reply on a post; returns the new comment's id.
    async fn reply_to_post(&self, post_id: &str, body: &str) -> Result<String>;

    /// Mark a comment as posted in moderator capacity, optionally stickied.
    async fn distinguish_comment(&self, comment_id: &str, sticky: bool) -> Result<()>;

    async fn lock_comment(&self, comment_id: &str) -> Result<()>;

    /// Delete one of the bot's own comments.
    async fn delete_comment(&self, comment_id: &str) -> Result<()>;

    /// Moderator-remove someone else's comment.
    async fn remove_comment(&self, comment_id: &str) -> Result<()>;

    async fn remove_post(&self, post_id: &str, mod_note: &str) -> Result<()>;

    async fn report_post(&self, post_id: &str, reason: &str) -> Result<()>;

    async fn report_comment(&self, comment_id: &str, reason: &str) -> Result<()>;
}

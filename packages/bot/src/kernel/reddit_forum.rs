use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reddit::models::{CommentData, SubmissionData, Thing};
use reddit::RedditClient;

use super::{BaseForum, CommentNode, ModerationFlags, PostSnapshot};

/// `BaseForum` implementation over the Reddit API client.
pub struct RedditForum {
    client: RedditClient,
    subreddit: String,
}

impl RedditForum {
    pub fn new(client: RedditClient, subreddit: String) -> Self {
        Self { client, subreddit }
    }
}

#[async_trait]
impl BaseForum for RedditForum {
    async fn new_posts(&self) -> Result<Vec<PostSnapshot>> {
        let posts = self
            .client
            .new_posts(&self.subreddit, 100)
            .await
            .context("Failed to fetch the new-posts listing")?;
        Ok(posts.into_iter().map(snapshot_from_submission).collect())
    }

    async fn unmoderated_posts(&self) -> Result<Vec<PostSnapshot>> {
        let posts = self
            .client
            .unmoderated_posts(&self.subreddit)
            .await
            .context("Failed to fetch the unmoderated listing")?;
        Ok(posts.into_iter().map(snapshot_from_submission).collect())
    }

    async fn refresh_post(&self, post_id: &str) -> Result<PostSnapshot> {
        let post = self
            .client
            .submission(post_id)
            .await
            .with_context(|| format!("Failed to refresh post {post_id}"))?;
        Ok(snapshot_from_submission(post))
    }

    async fn comment_tree(&self, post_id: &str) -> Result<Vec<CommentNode>> {
        let tree = self
            .client
            .comment_tree(post_id)
            .await
            .with_context(|| format!("Failed to fetch comments of post {post_id}"))?;
        Ok(tree.iter().filter_map(node_from_thing).collect())
    }

    async fn reply_to_post(&self, post_id: &str, body: &str) -> Result<String> {
        let comment = self
            .client
            .reply(&format!("t3_{post_id}"), body)
            .await
            .with_context(|| format!("Failed to reply to post {post_id}"))?;
        Ok(comment.name)
    }

    async fn distinguish_comment(&self, comment_id: &str, sticky: bool) -> Result<()> {
        self.client
            .distinguish(comment_id, sticky)
            .await
            .with_context(|| format!("Failed to distinguish comment {comment_id}"))
    }

    async fn lock_comment(&self, comment_id: &str) -> Result<()> {
        self.client
            .lock(comment_id)
            .await
            .with_context(|| format!("Failed to lock comment {comment_id}"))
    }

    async fn delete_comment(&self, comment_id: &str) -> Result<()> {
        self.client
            .delete(comment_id)
            .await
            .with_context(|| format!("Failed to delete comment {comment_id}"))
    }

    async fn remove_comment(&self, comment_id: &str) -> Result<()> {
        self.client
            .remove(comment_id, "")
            .await
            .with_context(|| format!("Failed to remove comment {comment_id}"))
    }

    async fn remove_post(&self, post_id: &str, mod_note: &str) -> Result<()> {
        self.client
            .remove(&format!("t3_{post_id}"), mod_note)
            .await
            .with_context(|| format!("Failed to remove post {post_id}"))
    }

    async fn report_post(&self, post_id: &str, reason: &str) -> Result<()> {
        self.client
            .report(&format!("t3_{post_id}"), reason)
            .await
            .with_context(|| format!("Failed to report post {post_id}"))
    }

    async fn report_comment(&self, comment_id: &str, reason: &str) -> Result<()> {
        self.client
            .report(comment_id, reason)
            .await
            .with_context(|| format!("Failed to report comment {comment_id}"))
    }
}

fn snapshot_from_submission(data: SubmissionData) -> PostSnapshot {
    PostSnapshot {
        created_at: epoch_to_utc(data.created_utc),
        flags: ModerationFlags {
            approved: data.approved,
            removed: data.removed,
            distinguished: data.distinguished.is_some(),
        },
        id: data.id,
        permalink: data.permalink,
        title: data.title,
        author: data.author,
        is_self: data.is_self,
    }
}

/// Convert a `t1` thing to a node; anything else (stray `more` nodes the
/// client failed to expand) is dropped.
fn node_from_thing(thing: &Thing<CommentData>) -> Option<CommentNode> {
    if thing.kind != "t1" {
        return None;
    }
    Some(node_from_comment(&thing.data))
}

fn node_from_comment(data: &CommentData) -> CommentNode {
    let replies = data
        .replies
        .as_ref()
        .map(|listing| listing.data.children.iter().filter_map(node_from_thing).collect())
        .unwrap_or_default();

    CommentNode {
        id: data.name.clone(),
        author: data.author.clone(),
        body: data.body.clone(),
        is_submitter: data.is_submitter,
        distinguished: data.distinguished.is_some(),
        replies,
    }
}

fn epoch_to_utc(epoch: f64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(epoch as i64, 0).unwrap_or_else(Utc::now)
}

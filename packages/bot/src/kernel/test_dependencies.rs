// MockForum - in-memory forum implementation for testing
//
// Behaves like a tiny live subreddit: replies posted by the bot are inserted
// into the comment tree, so a later cycle observes its own earlier actions
// exactly the way it would against Reddit.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::{BaseForum, CommentNode, ModerationFlags, PostSnapshot};

#[derive(Default)]
struct MockState {
    new_feed: Vec<PostSnapshot>,
    unmoderated_feed: Vec<PostSnapshot>,
    trees: HashMap<String, Vec<CommentNode>>,
    next_comment_id: usize,
    fail_refresh: HashSet<String>,
    fail_tree: HashSet<String>,
    fail_new_feed: bool,
    fail_unmoderated_feed: bool,
}

/// Arguments captured from a reply call.
#[derive(Debug, Clone)]
pub struct ReplyCall {
    pub post_id: String,
    pub comment_id: String,
    pub body: String,
}

pub struct MockForum {
    bot_username: String,
    state: Arc<Mutex<MockState>>,
    replies: Arc<Mutex<Vec<ReplyCall>>>,
    distinguished: Arc<Mutex<Vec<(String, bool)>>>,
    locked: Arc<Mutex<Vec<String>>>,
    deleted: Arc<Mutex<Vec<String>>>,
    removed_comments: Arc<Mutex<Vec<String>>>,
    removed_posts: Arc<Mutex<Vec<(String, String)>>>,
    reported_posts: Arc<Mutex<Vec<(String, String)>>>,
    reported_comments: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockForum {
    pub fn new(bot_username: impl Into<String>) -> Self {
        Self {
            bot_username: bot_username.into(),
            state: Arc::new(Mutex::new(MockState::default())),
            replies: Arc::new(Mutex::new(Vec::new())),
            distinguished: Arc::new(Mutex::new(Vec::new())),
            locked: Arc::new(Mutex::new(Vec::new())),
            deleted: Arc::new(Mutex::new(Vec::new())),
            removed_comments: Arc::new(Mutex::new(Vec::new())),
            removed_posts: Arc::new(Mutex::new(Vec::new())),
            reported_posts: Arc::new(Mutex::new(Vec::new())),
            reported_comments: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a post to the new-posts feed with an empty comment tree.
    pub fn with_post(self, post: PostSnapshot) -> Self {
        self.add_post(post);
        self
    }

    pub fn add_post(&self, post: PostSnapshot) {
        let mut state = self.state.lock().unwrap();
        state.trees.entry(post.id.clone()).or_default();
        state.new_feed.push(post);
    }

    pub fn add_unmoderated_post(&self, post: PostSnapshot) {
        let mut state = self.state.lock().unwrap();
        state.trees.entry(post.id.clone()).or_default();
        state.unmoderated_feed.push(post);
    }

    /// Replace a post's comment tree wholesale.
    pub fn set_comments(&self, post_id: &str, tree: Vec<CommentNode>) {
        self.state
            .lock()
            .unwrap()
            .trees
            .insert(post_id.to_string(), tree);
    }

    /// Append a reply under the given top-level comment.
    pub fn add_reply_under(&self, post_id: &str, parent_comment_id: &str, reply: CommentNode) {
        let mut state = self.state.lock().unwrap();
        let tree = state.trees.entry(post_id.to_string()).or_default();
        if let Some(parent) = tree.iter_mut().find(|c| c.id == parent_comment_id) {
            parent.replies.push(reply);
        }
    }

    /// Append an original-poster reply under the bot's own top-level comment
    /// (the request comment, in every scenario that uses this).
    pub fn reply_as_op(&self, post_id: &str, body: &str) {
        let mut state = self.state.lock().unwrap();
        let comment_id = format!("t1_op{}", state.next_comment_id);
        state.next_comment_id += 1;
        let bot = self.bot_username.clone();
        let tree = state.trees.entry(post_id.to_string()).or_default();
        if let Some(parent) = tree
            .iter_mut()
            .find(|c| c.author.as_deref() == Some(bot.as_str()))
        {
            parent.replies.push(CommentNode {
                id: comment_id,
                author: Some("op".to_string()),
                body: body.to_string(),
                is_submitter: true,
                distinguished: false,
                replies: Vec::new(),
            });
        }
    }

    /// Update a post's moderation flags in both feeds.
    pub fn set_flags(&self, post_id: &str, flags: ModerationFlags) {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;
        for post in state
            .new_feed
            .iter_mut()
            .chain(state.unmoderated_feed.iter_mut())
        {
            if post.id == post_id {
                post.flags = flags;
            }
        }
    }

    /// Make `refresh_post` fail for this post until cleared.
    pub fn fail_refresh_for(&self, post_id: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_refresh
            .insert(post_id.to_string());
    }

    pub fn clear_refresh_failure(&self, post_id: &str) {
        self.state.lock().unwrap().fail_refresh.remove(post_id);
    }

    /// Make `comment_tree` fail for this post until cleared.
    pub fn fail_tree_for(&self, post_id: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_tree
            .insert(post_id.to_string());
    }

    pub fn clear_tree_failure(&self, post_id: &str) {
        self.state.lock().unwrap().fail_tree.remove(post_id);
    }

    /// Make the new-posts listing fail until turned off again.
    pub fn set_new_feed_failure(&self, fail: bool) {
        self.state.lock().unwrap().fail_new_feed = fail;
    }

    /// Make the unmoderated listing fail until turned off again.
    pub fn set_unmoderated_feed_failure(&self, fail: bool) {
        self.state.lock().unwrap().fail_unmoderated_feed = fail;
    }

    // Recorded-call accessors

    pub fn replies(&self) -> Vec<ReplyCall> {
        self.replies.lock().unwrap().clone()
    }

    pub fn distinguished(&self) -> Vec<(String, bool)> {
        self.distinguished.lock().unwrap().clone()
    }

    pub fn locked(&self) -> Vec<String> {
        self.locked.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn removed_comments(&self) -> Vec<String> {
        self.removed_comments.lock().unwrap().clone()
    }

    pub fn removed_posts(&self) -> Vec<(String, String)> {
        self.removed_posts.lock().unwrap().clone()
    }

    pub fn reported_posts(&self) -> Vec<(String, String)> {
        self.reported_posts.lock().unwrap().clone()
    }

    pub fn reported_comments(&self) -> Vec<(String, String)> {
        self.reported_comments.lock().unwrap().clone()
    }

    pub fn was_post_removed(&self, post_id: &str) -> bool {
        self.removed_posts
            .lock()
            .unwrap()
            .iter()
            .any(|(id, _)| id == post_id)
    }

    pub fn comment_tree_of(&self, post_id: &str) -> Vec<CommentNode> {
        self.state
            .lock()
            .unwrap()
            .trees
            .get(post_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl BaseForum for MockForum {
    async fn new_posts(&self) -> Result<Vec<PostSnapshot>> {
        let state = self.state.lock().unwrap();
        if state.fail_new_feed {
            return Err(anyhow!("injected new-feed failure"));
        }
        Ok(state.new_feed.clone())
    }

    async fn unmoderated_posts(&self) -> Result<Vec<PostSnapshot>> {
        let state = self.state.lock().unwrap();
        if state.fail_unmoderated_feed {
            return Err(anyhow!("injected unmoderated-feed failure"));
        }
        Ok(state.unmoderated_feed.clone())
    }

    async fn refresh_post(&self, post_id: &str) -> Result<PostSnapshot> {
        let state = self.state.lock().unwrap();
        if state.fail_refresh.contains(post_id) {
            return Err(anyhow!("injected refresh failure for {post_id}"));
        }
        state
            .new_feed
            .iter()
            .chain(state.unmoderated_feed.iter())
            .find(|p| p.id == post_id)
            .cloned()
            .ok_or_else(|| anyhow!("post {post_id} not found"))
    }

    async fn comment_tree(&self, post_id: &str) -> Result<Vec<CommentNode>> {
        let state = self.state.lock().unwrap();
        if state.fail_tree.contains(post_id) {
            return Err(anyhow!("injected comment-tree failure for {post_id}"));
        }
        Ok(state.trees.get(post_id).cloned().unwrap_or_default())
    }

    async fn reply_to_post(&self, post_id: &str, body: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        let comment_id = format!("t1_bot{}", state.next_comment_id);
        state.next_comment_id += 1;

        let node = CommentNode {
            id: comment_id.clone(),
            author: Some(self.bot_username.clone()),
            body: body.to_string(),
            is_submitter: false,
            distinguished: false,
            replies: Vec::new(),
        };
        state.trees.entry(post_id.to_string()).or_default().push(node);

        self.replies.lock().unwrap().push(ReplyCall {
            post_id: post_id.to_string(),
            comment_id: comment_id.clone(),
            body: body.to_string(),
        });
        Ok(comment_id)
    }

    async fn distinguish_comment(&self, comment_id: &str, sticky: bool) -> Result<()> {
        self.distinguished
            .lock()
            .unwrap()
            .push((comment_id.to_string(), sticky));
        Ok(())
    }

    async fn lock_comment(&self, comment_id: &str) -> Result<()> {
        self.locked.lock().unwrap().push(comment_id.to_string());
        Ok(())
    }

    async fn delete_comment(&self, comment_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        for tree in state.trees.values_mut() {
            tree.retain(|c| c.id != comment_id);
        }
        drop(state);
        self.deleted.lock().unwrap().push(comment_id.to_string());
        Ok(())
    }

    async fn remove_comment(&self, comment_id: &str) -> Result<()> {
        self.removed_comments
            .lock()
            .unwrap()
            .push(comment_id.to_string());
        Ok(())
    }

    async fn remove_post(&self, post_id: &str, mod_note: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        {
            let state = &mut *state;
            for post in state
                .new_feed
                .iter_mut()
                .chain(state.unmoderated_feed.iter_mut())
            {
                if post.id == post_id {
                    post.flags.removed = true;
                }
            }
        }
        drop(state);
        self.removed_posts
            .lock()
            .unwrap()
            .push((post_id.to_string(), mod_note.to_string()));
        Ok(())
    }

    async fn report_post(&self, post_id: &str, reason: &str) -> Result<()> {
        self.reported_posts
            .lock()
            .unwrap()
            .push((post_id.to_string(), reason.to_string()));
        Ok(())
    }

    async fn report_comment(&self, comment_id: &str, reason: &str) -> Result<()> {
        self.reported_comments
            .lock()
            .unwrap()
            .push((comment_id.to_string(), reason.to_string()));
        Ok(())
    }
}

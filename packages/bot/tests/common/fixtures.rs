use std::sync::Arc;

use chrono::{Duration, Utc};
use janitor_core::domains::moderation::LifecycleTracker;
use janitor_core::kernel::{CommentNode, MockForum, ModerationFlags, PostSnapshot};
use janitor_core::Config;

/// The bot account every fixture agrees on; matches `Config::default()`.
pub const BOT: &str = "statement-janitor";

/// A link post created this many minutes ago.
pub fn post_aged(id: &str, minutes: i64) -> PostSnapshot {
    PostSnapshot {
        id: id.to_string(),
        permalink: format!("/r/example/comments/{id}/some_title/"),
        title: format!("Post {id}"),
        author: Some("op".to_string()),
        created_at: Utc::now() - Duration::minutes(minutes),
        is_self: false,
        flags: ModerationFlags::default(),
    }
}

pub fn distinguished_post_aged(id: &str, minutes: i64) -> PostSnapshot {
    let mut post = post_aged(id, minutes);
    post.flags.distinguished = true;
    post
}

pub fn comment(id: &str, author: &str, body: &str, is_submitter: bool) -> CommentNode {
    CommentNode {
        id: id.to_string(),
        author: Some(author.to_string()),
        body: body.to_string(),
        is_submitter,
        distinguished: false,
        replies: Vec::new(),
    }
}

/// A pre-existing request comment, as an earlier bot process would have
/// left it.
pub fn request_comment(id: &str) -> CommentNode {
    comment(
        id,
        BOT,
        "###Submission Statement Request\n\nPlease reply with a statement.",
        false,
    )
}

/// A statement body that satisfies the default config (>= 150 chars) and
/// contains the word "context" for keyword tests.
pub fn good_statement_body() -> String {
    let mut body = "This post provides context about an ongoing situation. ".repeat(4);
    body.truncate(200);
    body
}

/// A tracker whose startup cutoff is far enough in the past that every
/// fixture post is admissible.
pub fn tracker_for(forum: Arc<MockForum>, config: Arc<Config>) -> LifecycleTracker {
    LifecycleTracker::new(forum, config).with_started_at(Utc::now() - Duration::hours(2))
}

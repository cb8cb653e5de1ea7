//! Crash/restart behavior: the forum's own comments are the only durable
//! state, and a cold tracker has to rebuild everything from them.

mod common;

use std::sync::Arc;

use common::*;
use janitor_core::kernel::MockForum;
use janitor_core::Config;

fn default_config() -> Arc<Config> {
    Arc::new(Config::default())
}

#[tokio::test]
async fn finalized_marker_prevents_readmission() {
    let forum = Arc::new(MockForum::new(BOT).with_post(post_aged("p1", 40)));
    // A confirmation left by a previous process.
    forum.set_comments(
        "p1",
        vec![comment(
            "t1_old",
            BOT,
            "The following submission statement was provided by u/op: ...",
            false,
        )],
    );
    let mut tracker = tracker_for(forum.clone(), default_config());

    let stats = tracker.run_cycle().await.unwrap();

    assert_eq!(stats.admitted, 0);
    assert_eq!(tracker.tracked_count(), 0);
    assert!(forum.replies().is_empty());
}

#[tokio::test]
async fn existing_request_comment_prevents_duplicate_request() {
    let forum = Arc::new(MockForum::new(BOT).with_post(post_aged("p1", 5)));
    // A request left by a previous process; the window is still open.
    forum.set_comments("p1", vec![request_comment("t1_req")]);
    let mut tracker = tracker_for(forum.clone(), default_config());

    let stats = tracker.run_cycle().await.unwrap();

    assert_eq!(stats.admitted, 1);
    assert!(forum.replies().is_empty());
    assert!(tracker.is_tracked("/r/example/comments/p1/some_title/"));
}

#[tokio::test]
async fn restart_still_enforces_deadline_from_cold_state() {
    let forum = Arc::new(MockForum::new(BOT).with_post(post_aged("p1", 45)));
    let mut request = request_comment("t1_req");
    request.replies = vec![comment("t1_ss", "op", "too short to count", true)];
    forum.set_comments("p1", vec![request]);
    let mut tracker = tracker_for(forum.clone(), default_config());

    // A single cycle from a cold start: the request comment proves the ask
    // was made, the deadline has passed, and the reply is judged.
    let stats = tracker.run_cycle().await.unwrap();

    assert_eq!(stats.actions, 1);
    let removed = forum.removed_posts();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].1, "Submission statement is too short");
}

#[tokio::test]
async fn reset_discards_working_set_and_recovers_from_markers() {
    let forum = Arc::new(MockForum::new(BOT).with_post(post_aged("p1", 5)));
    let mut tracker = tracker_for(forum.clone(), default_config());

    tracker.run_cycle().await.unwrap();
    assert_eq!(forum.replies().len(), 1);
    assert_eq!(tracker.tracked_count(), 1);

    // A failed cycle discards everything in memory.
    tracker.reset();
    assert_eq!(tracker.tracked_count(), 0);

    // The next cycle re-admits the post, sees its own request comment in
    // the tree, and does not ask twice.
    tracker.run_cycle().await.unwrap();
    assert_eq!(forum.replies().len(), 1);
    assert_eq!(tracker.tracked_count(), 1);
}

#[tokio::test]
async fn retired_posts_are_not_readmitted_within_the_bound() {
    let forum = Arc::new(MockForum::new(BOT).with_post(distinguished_post_aged("p1", 5)));
    let mut tracker = tracker_for(forum.clone(), default_config());

    let first = tracker.run_cycle().await.unwrap();
    assert_eq!(first.retired, 1);

    // The post is still in the feed, but stays retired.
    let second = tracker.run_cycle().await.unwrap();
    assert_eq!(second.admitted, 0);
    assert_eq!(tracker.tracked_count(), 0);
}

//! Candidate-statement resolution over a comment-tree snapshot.
//!
//! Pure: identical snapshots always resolve to the same result, which is what
//! makes retrying a failed cycle safe.

use crate::kernel::CommentNode;

use super::models::{CandidateStatement, PostRecord, Resolution};
use super::templates;

pub struct StatementResolver {
    bot_username: String,
}

impl StatementResolver {
    pub fn new(bot_username: impl Into<String>) -> Self {
        Self {
            bot_username: bot_username.into(),
        }
    }

    /// Decide which comment, if any, is the post's submission statement.
    ///
    /// Selection among multiple candidates: the first (in traversal order)
    /// that names "submission statement" outright wins; otherwise the longest
    /// body; a single candidate wins trivially.
    pub fn resolve(&self, record: &PostRecord, comments: &[CommentNode]) -> Resolution {
        if record.flags().distinguished {
            return Resolution::Exempt;
        }

        let Some(request) = find_request_comment(comments, &self.bot_username) else {
            return Resolution::NotRequested;
        };

        let candidates: Vec<&CommentNode> = request
            .replies
            .iter()
            .filter(|reply| reply.is_submitter)
            .collect();

        if candidates.is_empty() {
            return Resolution::AwaitingReply;
        }

        let chosen = select_candidate(&candidates);
        Resolution::Candidate(CandidateStatement::from_node(chosen))
    }
}

/// The bot's own top-level request comment: authored by the bot account and
/// carrying the literal request marker.
pub fn find_request_comment<'a>(
    comments: &'a [CommentNode],
    bot_username: &str,
) -> Option<&'a CommentNode> {
    comments.iter().find(|comment| {
        comment.author.as_deref() == Some(bot_username)
            && comment.body.contains(templates::REQUEST_MARKER)
    })
}

fn select_candidate<'a>(candidates: &[&'a CommentNode]) -> &'a CommentNode {
    if candidates.len() == 1 {
        return candidates[0];
    }

    if let Some(explicit) = candidates
        .iter()
        .find(|c| names_submission_statement(&c.body))
    {
        return explicit;
    }

    // Longest body by character count; ties keep the earliest.
    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if candidate.body.chars().count() > best.body.chars().count() {
            best = candidate;
        }
    }
    best
}

/// Whole-word, case-insensitive check for both "submission" and "statement".
fn names_submission_statement(body: &str) -> bool {
    let lowered = body.to_lowercase();
    let mut has_submission = false;
    let mut has_statement = false;
    for word in lowered.split_whitespace() {
        if word == "submission" {
            has_submission = true;
        } else if word == "statement" {
            has_statement = true;
        }
    }
    has_submission && has_statement
}

//! The action decision table.
//!
//! `decide` is a pure function of the record, the resolved candidate, the
//! cycle clock, and configuration. It never touches the forum and never
//! mutates the record; the tracker owns both of those effects.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::Config;

use super::models::{CandidateStatement, PostRecord};
use super::templates;

/// The single action a cycle may take on a post. Terminal actions finalize
/// the record; `None` leaves it tracked for the next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Request,
    Accept,
    RejectShort,
    RejectMissingKeywords,
    RejectNoStatement,
}

impl Action {
    /// The mod-note / report reason for a rejection.
    pub fn removal_note(self) -> Option<&'static str> {
        match self {
            Action::RejectNoStatement => Some(templates::NOTE_NO_STATEMENT),
            Action::RejectShort => Some(templates::NOTE_TOO_SHORT),
            Action::RejectMissingKeywords => Some(templates::NOTE_MISSING_KEYWORDS),
            _ => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::None => write!(f, "none"),
            Action::Request => write!(f, "request"),
            Action::Accept => write!(f, "accept"),
            Action::RejectShort => write!(f, "reject_short"),
            Action::RejectMissingKeywords => write!(f, "reject_missing_keywords"),
            Action::RejectNoStatement => write!(f, "reject_no_statement"),
        }
    }
}

pub struct ActionPolicy {
    config: Arc<Config>,
}

impl ActionPolicy {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Evaluate the decision table in order; exactly one rule fires.
    pub fn decide(
        &self,
        record: &PostRecord,
        candidate: Option<&CandidateStatement>,
        now: DateTime<Utc>,
    ) -> Action {
        // 1. Already finalized. Callers stop calling once checked, but the
        //    table stays idempotent anyway.
        if record.checked() {
            return Action::None;
        }

        // 2. Official-capacity posts are exempt.
        if record.flags().distinguished {
            return Action::Accept;
        }

        // 3. Ask before judging.
        if !record.requested() {
            return Action::Request;
        }

        // 4. The window is still open.
        if record.age(now) < self.config.time_limit() {
            return Action::None;
        }

        // 5-8. Window closed: judge whatever was resolved.
        let Some(statement) = candidate else {
            return Action::RejectNoStatement;
        };

        if statement.len_chars() < self.config.min_statement_length {
            return Action::RejectShort;
        }

        if self
            .config
            .required_keywords
            .iter()
            .any(|word| !statement.body.contains(word))
        {
            return Action::RejectMissingKeywords;
        }

        Action::Accept
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::kernel::{ModerationFlags, PostSnapshot};

    use super::*;

    fn config() -> Config {
        Config {
            time_limit_minutes: 30,
            min_statement_length: 150,
            required_keywords: vec!["context".to_string()],
            ..Config::default()
        }
    }

    fn policy() -> ActionPolicy {
        ActionPolicy::new(Arc::new(config()))
    }

    fn record_aged(minutes: i64, now: DateTime<Utc>) -> PostRecord {
        PostRecord::new(PostSnapshot {
            id: "p1".to_string(),
            permalink: "/r/test/comments/p1/".to_string(),
            title: "A post".to_string(),
            author: Some("op".to_string()),
            created_at: now - Duration::minutes(minutes),
            is_self: false,
            flags: ModerationFlags::default(),
        })
    }

    fn statement_of_len(len: usize) -> CandidateStatement {
        let mut body = "context ".repeat(len / 8 + 1);
        body.truncate(len);
        CandidateStatement {
            comment_id: "t1_ss".to_string(),
            author: "op".to_string(),
            body,
        }
    }

    #[test]
    fn checked_record_gets_nothing() {
        let now = Utc::now();
        let mut record = record_aged(120, now);
        record.finalize(false);

        assert_eq!(policy().decide(&record, None, now), Action::None);
    }

    #[test]
    fn distinguished_post_is_accepted_immediately() {
        // Exempt regardless of elapsed time or replies.
        let now = Utc::now();
        let mut record = record_aged(0, now);
        let mut snapshot_flags = record.flags();
        snapshot_flags.distinguished = true;
        record.apply_snapshot(&PostSnapshot {
            id: "p1".to_string(),
            permalink: "/r/test/comments/p1/".to_string(),
            title: "A post".to_string(),
            author: Some("op".to_string()),
            created_at: record.created_at(),
            is_self: false,
            flags: snapshot_flags,
        });

        assert_eq!(policy().decide(&record, None, now), Action::Accept);
    }

    #[test]
    fn unrequested_post_gets_request() {
        let now = Utc::now();
        let record = record_aged(0, now);

        assert_eq!(policy().decide(&record, None, now), Action::Request);
    }

    #[test]
    fn requested_post_inside_window_waits() {
        let now = Utc::now();
        let mut record = record_aged(10, now);
        record.mark_requested();

        assert_eq!(policy().decide(&record, None, now), Action::None);
    }

    #[test]
    fn expired_without_candidate_rejects_no_statement() {
        let now = Utc::now();
        let mut record = record_aged(31, now);
        record.mark_requested();

        assert_eq!(
            policy().decide(&record, None, now),
            Action::RejectNoStatement
        );
    }

    #[test]
    fn expired_with_good_candidate_accepts() {
        // 31 minutes old, 200 chars, contains "context".
        let now = Utc::now();
        let mut record = record_aged(31, now);
        record.mark_requested();
        let statement = statement_of_len(200);

        assert_eq!(
            policy().decide(&record, Some(&statement), now),
            Action::Accept
        );
    }

    #[test]
    fn short_candidate_rejects_short() {
        // 80 chars < the 150 minimum.
        let now = Utc::now();
        let mut record = record_aged(31, now);
        record.mark_requested();
        let statement = statement_of_len(80);

        assert_eq!(
            policy().decide(&record, Some(&statement), now),
            Action::RejectShort
        );
    }

    #[test]
    fn missing_keyword_rejects_keywords() {
        let now = Utc::now();
        let mut record = record_aged(31, now);
        record.mark_requested();
        let statement = CandidateStatement {
            comment_id: "t1_ss".to_string(),
            author: "op".to_string(),
            body: "x".repeat(200),
        };

        assert_eq!(
            policy().decide(&record, Some(&statement), now),
            Action::RejectMissingKeywords
        );
    }

    #[test]
    fn keyword_match_is_case_sensitive() {
        let now = Utc::now();
        let mut record = record_aged(31, now);
        record.mark_requested();
        let mut body = "Context ".repeat(30);
        body.truncate(200);
        let statement = CandidateStatement {
            comment_id: "t1_ss".to_string(),
            author: "op".to_string(),
            body,
        };

        // "Context" does not satisfy the required word "context".
        assert_eq!(
            policy().decide(&record, Some(&statement), now),
            Action::RejectMissingKeywords
        );
    }

    #[test]
    fn decide_is_deterministic() {
        let now = Utc::now();
        let mut record = record_aged(31, now);
        record.mark_requested();
        let statement = statement_of_len(200);

        let policy = policy();
        assert_eq!(
            policy.decide(&record, Some(&statement), now),
            policy.decide(&record, Some(&statement), now)
        );
    }

    #[test]
    fn length_is_counted_in_characters() {
        let now = Utc::now();
        let mut record = record_aged(31, now);
        record.mark_requested();

        // 150 multibyte characters: long enough, even though the keyword
        // check then fails.
        let statement = CandidateStatement {
            comment_id: "t1_ss".to_string(),
            author: "op".to_string(),
            body: "é".repeat(150),
        };

        assert_ne!(
            policy().decide(&record, Some(&statement), now),
            Action::RejectShort
        );
    }
}

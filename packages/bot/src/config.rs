use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Inter-cycle sleep is never allowed below this, whatever the env says.
pub const POLL_INTERVAL_FLOOR_SECS: u64 = 30;

/// Posters always get at least one minute to supply a statement.
pub const TIME_LIMIT_FLOOR_MINUTES: i64 = 1;

const DEFAULT_REQUEST_TEXT: &str = "Please reply to this comment with a submission statement: \
a couple of sentences explaining why this post is relevant to the community and what discussion \
you hope it starts. Posts without a submission statement are removed once the time limit expires.";

const DEFAULT_REMOVAL_TEXT: &str = "Your post has been removed because it did not receive a \
valid submission statement in time. You are welcome to resubmit it together with a statement \
that meets the subreddit's requirements.";

const DEFAULT_CONFIRMATION_TEXT: &str = "Does this explain the post? If not, please report \
and a moderator will review.";

const DEFAULT_FOOTER_TEXT: &str = "I am a bot. Replies will not receive responses. \
Please message the moderators if you believe this was an error.";

/// Application configuration loaded from environment variables.
///
/// Built once at startup and passed by reference into the resolver, policy,
/// and tracker; nothing reads the environment after this point.
#[derive(Debug, Clone)]
pub struct Config {
    // Credentials (script app)
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,

    // What to moderate
    pub subreddit: String,

    // Cadence
    pub poll_interval: Duration,
    pub error_backoff: Duration,

    // Statement requirements
    pub time_limit_minutes: i64,
    pub min_statement_length: usize,
    /// Case-sensitive substrings, all of which must appear in the statement.
    pub required_keywords: Vec<String>,

    // Enforcement behavior
    pub remove_posts: bool,
    pub pin_request: bool,
    pub pin_confirmation: bool,
    pub strip_request_thread: bool,
    pub use_spoiler_tags: bool,
    /// When a moderator already approved the post, report failures instead of
    /// removing over their head.
    pub report_approved_posts: bool,

    // Wording
    pub request_text: String,
    pub removal_text: String,
    /// Trails the quoted statement in the confirmation comment. The marker
    /// phrase that precedes the quote is fixed; only this part is wording.
    pub confirmation_text: String,
    pub footer_text: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let poll_interval_secs: u64 = env_parse("JANITOR_POLL_INTERVAL_SECS", 30)?;
        let time_limit_minutes: i64 = env_parse("JANITOR_TIME_LIMIT_MINUTES", 30)?;
        let error_backoff_secs: u64 = env_parse("JANITOR_ERROR_BACKOFF_SECS", 10)?;

        Ok(Self {
            client_id: env::var("REDDIT_CLIENT_ID").context("REDDIT_CLIENT_ID must be set")?,
            client_secret: env::var("REDDIT_CLIENT_SECRET")
                .context("REDDIT_CLIENT_SECRET must be set")?,
            username: env::var("REDDIT_USERNAME").context("REDDIT_USERNAME must be set")?,
            password: env::var("REDDIT_PASSWORD").context("REDDIT_PASSWORD must be set")?,
            subreddit: env::var("JANITOR_SUBREDDIT").context("JANITOR_SUBREDDIT must be set")?,
            poll_interval: Duration::from_secs(clamp_poll_interval(poll_interval_secs)),
            error_backoff: Duration::from_secs(error_backoff_secs.max(1)),
            time_limit_minutes: clamp_time_limit(time_limit_minutes),
            min_statement_length: env_parse("JANITOR_MIN_STATEMENT_LENGTH", 150)?,
            required_keywords: parse_keywords(
                &env::var("JANITOR_REQUIRED_KEYWORDS").unwrap_or_default(),
            ),
            remove_posts: env_bool("JANITOR_REMOVE_POSTS", true)?,
            pin_request: env_bool("JANITOR_PIN_REQUEST", true)?,
            pin_confirmation: env_bool("JANITOR_PIN_CONFIRMATION", true)?,
            strip_request_thread: env_bool("JANITOR_STRIP_REQUEST_THREAD", false)?,
            use_spoiler_tags: env_bool("JANITOR_USE_SPOILER_TAGS", false)?,
            report_approved_posts: env_bool("JANITOR_REPORT_APPROVED_POSTS", false)?,
            request_text: env::var("JANITOR_REQUEST_TEXT")
                .unwrap_or_else(|_| DEFAULT_REQUEST_TEXT.to_string()),
            removal_text: env::var("JANITOR_REMOVAL_TEXT")
                .unwrap_or_else(|_| DEFAULT_REMOVAL_TEXT.to_string()),
            confirmation_text: env::var("JANITOR_CONFIRMATION_TEXT")
                .unwrap_or_else(|_| DEFAULT_CONFIRMATION_TEXT.to_string()),
            footer_text: env::var("JANITOR_FOOTER_TEXT")
                .unwrap_or_else(|_| DEFAULT_FOOTER_TEXT.to_string()),
        })
    }

    /// The statement window as a chrono duration.
    pub fn time_limit(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.time_limit_minutes)
    }
}

impl Default for Config {
    /// Defaults mirror the documented env defaults, with empty credentials.
    /// Used by tests; `from_env` is the production path.
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            username: "statement-janitor".to_string(),
            password: String::new(),
            subreddit: "example".to_string(),
            poll_interval: Duration::from_secs(POLL_INTERVAL_FLOOR_SECS),
            error_backoff: Duration::from_secs(10),
            time_limit_minutes: 30,
            min_statement_length: 150,
            required_keywords: Vec::new(),
            remove_posts: true,
            pin_request: true,
            pin_confirmation: true,
            strip_request_thread: false,
            use_spoiler_tags: false,
            report_approved_posts: false,
            request_text: DEFAULT_REQUEST_TEXT.to_string(),
            removal_text: DEFAULT_REMOVAL_TEXT.to_string(),
            confirmation_text: DEFAULT_CONFIRMATION_TEXT.to_string(),
            footer_text: DEFAULT_FOOTER_TEXT.to_string(),
        }
    }
}

fn clamp_poll_interval(secs: u64) -> u64 {
    secs.max(POLL_INTERVAL_FLOOR_SECS)
}

fn clamp_time_limit(minutes: i64) -> i64 {
    minutes.max(TIME_LIMIT_FLOOR_MINUTES)
}

fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{key} must be a valid number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}

fn env_bool(key: &str, default: bool) -> Result<bool> {
    match env::var(key) {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => anyhow::bail!("{key} must be a boolean, got {other:?}"),
        },
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_interval_clamps_to_floor() {
        assert_eq!(clamp_poll_interval(5), POLL_INTERVAL_FLOOR_SECS);
        assert_eq!(clamp_poll_interval(120), 120);
    }

    #[test]
    fn time_limit_clamps_to_one_minute() {
        assert_eq!(clamp_time_limit(0), 1);
        assert_eq!(clamp_time_limit(-10), 1);
        assert_eq!(clamp_time_limit(45), 45);
    }

    #[test]
    fn keywords_split_and_trim() {
        assert_eq!(
            parse_keywords("context, IRTR ,because"),
            vec!["context", "IRTR", "because"]
        );
        assert!(parse_keywords("").is_empty());
        assert!(parse_keywords(" , ,").is_empty());
    }
}

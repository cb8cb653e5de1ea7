//! Comment wording. Two phrases here are load-bearing markers, not prose:
//! the request marker identifies the bot's own request comment when scanning
//! a tree, and the confirmation marker is the durable "already handled"
//! evidence that survives restarts. Composers and detectors share the same
//! constants; changing a marker without reposting history would orphan every
//! comment the bot has ever left.

use crate::config::Config;

/// Present in every request comment; used to find it again later.
pub const REQUEST_MARKER: &str = "Submission Statement Request";

/// Present in every confirmation comment; scanned for by
/// `was_already_finalized` to avoid double-handling after a restart.
pub const CONFIRMATION_MARKER: &str = "submission statement was provided";

// Mod-note / report reasons for the three failure outcomes.
pub const NOTE_NO_STATEMENT: &str = "No submission statement provided";
pub const NOTE_TOO_SHORT: &str = "Submission statement is too short";
pub const NOTE_MISSING_KEYWORDS: &str = "Submission statement does not contain the requisite words";

/// The initial comment asking the poster for a statement.
pub fn request_body(config: &Config) -> String {
    format!(
        "###{REQUEST_MARKER}\n\n{}{}",
        config.request_text,
        footer(config)
    )
}

/// The acceptance comment, quoting the statement verbatim.
pub fn confirmation_body(author: &str, statement: &str, config: &Config) -> String {
    let quoted = if config.use_spoiler_tags {
        spoiler_wrap(statement)
    } else {
        statement.to_string()
    };
    format!(
        "The following {CONFIRMATION_MARKER} by u/{author}:\n\n---\n\n{quoted}\n\n---\n\n{}{}",
        config.confirmation_text,
        footer(config)
    )
}

/// The comment left behind on a removed post.
pub fn removal_body(note: &str, config: &Config) -> String {
    format!(
        "{}\n\n(Removal reason: {note}){}",
        config.removal_text,
        footer(config)
    )
}

fn footer(config: &Config) -> String {
    format!("\n\n*{}*", config.footer_text)
}

/// Spoiler tags do not span blank lines in Reddit markdown, so every
/// paragraph break has to close and reopen them.
fn spoiler_wrap(text: &str) -> String {
    format!(">!{}!<", text.replace("\n\n", "!<\n\n>!"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_the_marker() {
        let config = Config::default();
        assert!(request_body(&config).contains(REQUEST_MARKER));
    }

    #[test]
    fn confirmation_body_carries_marker_and_verbatim_statement() {
        let config = Config::default();
        let body = confirmation_body("op", "This post matters because reasons.", &config);

        assert!(body.contains(CONFIRMATION_MARKER));
        assert!(body.contains("u/op"));
        assert!(body.contains("This post matters because reasons."));
        assert!(body.contains(&config.footer_text));
    }

    #[test]
    fn spoiler_mode_wraps_every_paragraph() {
        let config = Config {
            use_spoiler_tags: true,
            ..Config::default()
        };
        let body = confirmation_body("op", "first\n\nsecond", &config);

        assert!(body.contains(">!first!<"));
        assert!(body.contains(">!second!<"));
    }

    #[test]
    fn removal_body_names_the_reason() {
        let config = Config::default();
        let body = removal_body(NOTE_TOO_SHORT, &config);

        assert!(body.contains("(Removal reason: Submission statement is too short)"));
        assert!(body.contains(&config.removal_text));
    }
}

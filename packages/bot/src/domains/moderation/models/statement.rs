use crate::kernel::CommentNode;

/// A comment by the original poster chosen as the post's submission
/// statement. A detached copy of the comment at resolution time; it lives
/// only for the decision that consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateStatement {
    /// Fullname of the source comment.
    pub comment_id: String,
    pub author: String,
    pub body: String,
}

impl CandidateStatement {
    pub fn from_node(node: &CommentNode) -> Self {
        Self {
            comment_id: node.id.clone(),
            author: node
                .author
                .clone()
                .unwrap_or_else(|| "[deleted]".to_string()),
            body: node.body.clone(),
        }
    }

    /// Statement length in characters (not bytes).
    pub fn len_chars(&self) -> usize {
        self.body.chars().count()
    }
}

/// Outcome of resolving a post's comment tree.
///
/// Refines "candidate or none" with why there is none, which is what lets a
/// freshly restarted tracker re-learn that a request comment already exists
/// instead of posting a duplicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Post made in official moderator capacity; requirement waived.
    Exempt,
    /// The bot's request comment is not on the post (never posted, or gone).
    NotRequested,
    /// Request comment present, no reply from the original poster yet.
    AwaitingReply,
    /// Best reply from the original poster.
    Candidate(CandidateStatement),
}

impl Resolution {
    pub fn candidate(&self) -> Option<&CandidateStatement> {
        match self {
            Resolution::Candidate(statement) => Some(statement),
            _ => None,
        }
    }

    /// Whether the tree shows the statement request was already made.
    pub fn request_observed(&self) -> bool {
        matches!(self, Resolution::AwaitingReply | Resolution::Candidate(_))
    }
}

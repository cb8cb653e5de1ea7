//! Minimal Reddit API client for moderation bots.
//!
//! Covers the small slice of the API a subreddit janitor needs: script-app
//! OAuth (password grant), the `new` and `about/unmoderated` listings,
//! comment trees with `morechildren` expansion, and the moderation write
//! endpoints (comment, distinguish, lock, delete, remove, report).

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use thiserror::Error;
use tokio::sync::Mutex;

pub mod models;

use models::{
    AccessToken, ApiResponse, CommentData, Listing, SubmissionData, Thing,
};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const OAUTH_BASE: &str = "https://oauth.reddit.com";

/// Refresh the token this long before Reddit says it expires.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// `morechildren` accepts at most 100 ids per call.
const MORE_CHILDREN_BATCH: usize = 100;

/// Upper bound on expansion rounds for pathological trees.
const MAX_EXPANSION_ROUNDS: usize = 10;

#[derive(Debug, Error)]
pub enum RedditError {
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("unexpected status {status} from {endpoint}")]
    Status {
        status: reqwest::StatusCode,
        endpoint: String,
    },

    #[error("api error from {endpoint}: {detail}")]
    Api { endpoint: String, detail: String },
}

#[derive(Debug, Clone)]
pub struct RedditOptions {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

pub struct RedditClient {
    http: Client,
    options: RedditOptions,
    token: Mutex<Option<CachedToken>>,
}

impl RedditClient {
    pub fn new(options: RedditOptions) -> Result<Self, RedditError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(options.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            options,
            token: Mutex::new(None),
        })
    }

    /// Username of the authenticated account.
    pub fn username(&self) -> &str {
        &self.options.username
    }

    /// Return a valid bearer token, authenticating (or re-authenticating)
    /// when the cached one is missing or about to expire.
    async fn bearer_token(&self) -> Result<String, RedditError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Utc::now() {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.options.client_id, Some(&self.options.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.options.username.as_str()),
                ("password", self.options.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RedditError::Auth(format!("{status}: {body}")));
        }

        let token: AccessToken = response.json().await?;
        let expires_at =
            Utc::now() + chrono::Duration::seconds(token.expires_in as i64 - TOKEN_EXPIRY_MARGIN_SECS);
        let value = token.access_token.clone();
        *cached = Some(CachedToken {
            value: token.access_token,
            expires_at,
        });
        Ok(value)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RedditError> {
        let token = self.bearer_token().await?;
        let url = format!("{OAUTH_BASE}{path}");
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RedditError::Status {
                status,
                endpoint: path.to_string(),
            });
        }
        Ok(response.json().await?)
    }

    async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Result<reqwest::Response, RedditError> {
        let token = self.bearer_token().await?;
        let url = format!("{OAUTH_BASE}{path}");
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RedditError::Status {
                status,
                endpoint: path.to_string(),
            });
        }
        Ok(response)
    }

    /// Fire-and-forget moderation endpoints return `{}` or jQuery noise we
    /// don't care about; success is the 2xx status.
    async fn post_form_discard(&self, path: &str, form: &[(&str, &str)]) -> Result<(), RedditError> {
        self.post_form(path, form).await.map(|_| ())
    }

    /// Newest submissions in the subreddit, newest first.
    pub async fn new_posts(
        &self,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<SubmissionData>, RedditError> {
        let path = format!("/r/{subreddit}/new");
        let limit = limit.to_string();
        let listing: Listing<SubmissionData> =
            self.get_json(&path, &[("limit", limit.as_str())]).await?;
        Ok(listing.data.children.into_iter().map(|t| t.data).collect())
    }

    /// Submissions still awaiting moderator review.
    pub async fn unmoderated_posts(
        &self,
        subreddit: &str,
    ) -> Result<Vec<SubmissionData>, RedditError> {
        let path = format!("/r/{subreddit}/about/unmoderated");
        let listing: Listing<SubmissionData> = self.get_json(&path, &[]).await?;
        Ok(listing.data.children.into_iter().map(|t| t.data).collect())
    }

    /// Re-fetch one submission to pick up moderation-state changes.
    pub async fn submission(&self, article_id: &str) -> Result<SubmissionData, RedditError> {
        let fullname = format!("t3_{article_id}");
        let listing: Listing<SubmissionData> = self
            .get_json("/api/info", &[("id", fullname.as_str())])
            .await?;
        listing
            .data
            .children
            .into_iter()
            .map(|t| t.data)
            .next()
            .ok_or_else(|| RedditError::Api {
                endpoint: "/api/info".to_string(),
                detail: format!("submission {article_id} not found"),
            })
    }

    /// Full comment tree for a submission with every `more` placeholder
    /// expanded via `/api/morechildren`.
    pub async fn comment_tree(
        &self,
        article_id: &str,
    ) -> Result<Vec<Thing<CommentData>>, RedditError> {
        let path = format!("/comments/{article_id}");
        let (_, mut comments): (Listing<SubmissionData>, Listing<CommentData>) = self
            .get_json(&path, &[("limit", "500"), ("depth", "10")])
            .await?;

        let link_fullname = format!("t3_{article_id}");
        for _ in 0..MAX_EXPANSION_ROUNDS {
            let pending = drain_more_ids(&mut comments.data.children);
            if pending.is_empty() {
                break;
            }
            for batch in pending.chunks(MORE_CHILDREN_BATCH) {
                let things = self.more_children(&link_fullname, batch).await?;
                for thing in things {
                    attach_comment(&mut comments.data.children, &link_fullname, thing);
                }
            }
        }

        Ok(comments.data.children)
    }

    async fn more_children(
        &self,
        link_fullname: &str,
        children: &[String],
    ) -> Result<Vec<Thing<CommentData>>, RedditError> {
        let ids = children.join(",");
        let parsed: ApiResponse = self
            .get_json(
                "/api/morechildren",
                &[
                    ("api_type", "json"),
                    ("link_id", link_fullname),
                    ("children", ids.as_str()),
                ],
            )
            .await?;

        if !parsed.json.errors.is_empty() {
            return Err(RedditError::Api {
                endpoint: "/api/morechildren".to_string(),
                detail: format!("{:?}", parsed.json.errors),
            });
        }
        Ok(parsed.json.data.map(|d| d.things).unwrap_or_default())
    }

    /// Post a reply under a submission or comment fullname. Returns the new
    /// comment.
    pub async fn reply(&self, parent_fullname: &str, text: &str) -> Result<CommentData, RedditError> {
        let response = self
            .post_form(
                "/api/comment",
                &[
                    ("api_type", "json"),
                    ("thing_id", parent_fullname),
                    ("text", text),
                ],
            )
            .await?;

        let parsed: ApiResponse = response.json().await?;
        if !parsed.json.errors.is_empty() {
            return Err(RedditError::Api {
                endpoint: "/api/comment".to_string(),
                detail: format!("{:?}", parsed.json.errors),
            });
        }
        parsed
            .json
            .data
            .and_then(|d| d.things.into_iter().map(|t| t.data).next())
            .ok_or_else(|| RedditError::Api {
                endpoint: "/api/comment".to_string(),
                detail: "no comment returned".to_string(),
            })
    }

    /// Distinguish a comment as moderator, optionally stickying it.
    pub async fn distinguish(&self, comment_fullname: &str, sticky: bool) -> Result<(), RedditError> {
        self.post_form_discard(
            "/api/distinguish",
            &[
                ("api_type", "json"),
                ("id", comment_fullname),
                ("how", "yes"),
                ("sticky", if sticky { "true" } else { "false" }),
            ],
        )
        .await
    }

    pub async fn lock(&self, fullname: &str) -> Result<(), RedditError> {
        self.post_form_discard("/api/lock", &[("id", fullname)]).await
    }

    /// Delete one of the authenticated account's own things.
    pub async fn delete(&self, fullname: &str) -> Result<(), RedditError> {
        self.post_form_discard("/api/del", &[("id", fullname)]).await
    }

    /// Moderator-remove a post or comment (not marked as spam).
    pub async fn remove(&self, fullname: &str, mod_note: &str) -> Result<(), RedditError> {
        self.post_form_discard(
            "/api/remove",
            &[("id", fullname), ("spam", "false"), ("mod_note", mod_note)],
        )
        .await
    }

    pub async fn report(&self, fullname: &str, reason: &str) -> Result<(), RedditError> {
        self.post_form_discard(
            "/api/report",
            &[("api_type", "json"), ("thing_id", fullname), ("reason", reason)],
        )
        .await
    }
}

/// Remove every `more` placeholder from the tree, returning the child ids
/// they were holding.
fn drain_more_ids(children: &mut Vec<Thing<CommentData>>) -> Vec<String> {
    let mut ids = Vec::new();
    children.retain_mut(|thing| {
        if thing.kind == "more" {
            ids.extend(thing.data.children.drain(..));
            return false;
        }
        if let Some(replies) = thing.data.replies.as_mut() {
            ids.extend(drain_more_ids(&mut replies.data.children));
        }
        true
    });
    ids
}

/// Splice an expanded comment back into the tree under its parent. Comments
/// whose parent is the link itself (or is missing from the fetched window)
/// land at the top level.
fn attach_comment(
    children: &mut Vec<Thing<CommentData>>,
    link_fullname: &str,
    thing: Thing<CommentData>,
) {
    if thing.data.parent_id == link_fullname {
        children.push(thing);
        return;
    }
    if attach_under_parent(children, &thing) {
        return;
    }
    children.push(thing);
}

fn attach_under_parent(children: &mut [Thing<CommentData>], thing: &Thing<CommentData>) -> bool {
    for node in children.iter_mut() {
        if node.data.name == thing.data.parent_id {
            let replies = node.data.replies.get_or_insert_with(|| Thing {
                kind: "Listing".to_string(),
                data: models::ListingData {
                    children: Vec::new(),
                    after: None,
                },
            });
            replies.data.children.push(thing.clone());
            return true;
        }
        if let Some(replies) = node.data.replies.as_mut() {
            if attach_under_parent(&mut replies.data.children, thing) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::ListingData;

    fn comment(name: &str, parent: &str) -> Thing<CommentData> {
        Thing {
            kind: "t1".to_string(),
            data: CommentData {
                id: name.trim_start_matches("t1_").to_string(),
                name: name.to_string(),
                author: Some("someone".to_string()),
                body: String::new(),
                is_submitter: false,
                distinguished: None,
                parent_id: parent.to_string(),
                replies: None,
                children: Vec::new(),
            },
        }
    }

    fn more(parent: &str, ids: &[&str]) -> Thing<CommentData> {
        let mut data = comment("t1_more", parent).data;
        data.children = ids.iter().map(|s| s.to_string()).collect();
        Thing {
            kind: "more".to_string(),
            data,
        }
    }

    #[test]
    fn drain_more_ids_collects_nested_placeholders() {
        let mut top = comment("t1_a", "t3_link");
        top.data.replies = Some(Thing {
            kind: "Listing".to_string(),
            data: ListingData {
                children: vec![more("t1_a", &["x", "y"])],
                after: None,
            },
        });
        let mut tree = vec![top, more("t3_link", &["z"])];

        let ids = drain_more_ids(&mut tree);

        assert_eq!(ids, vec!["x", "y", "z"]);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].data.replies.as_ref().unwrap().data.children.is_empty());
    }

    #[test]
    fn attach_comment_splices_under_parent() {
        let mut tree = vec![comment("t1_a", "t3_link")];

        attach_comment(&mut tree, "t3_link", comment("t1_b", "t1_a"));
        attach_comment(&mut tree, "t3_link", comment("t1_c", "t3_link"));

        assert_eq!(tree.len(), 2);
        let nested = &tree[0].data.replies.as_ref().unwrap().data.children;
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].data.name, "t1_b");
    }

    #[test]
    fn attach_comment_falls_back_to_top_level() {
        let mut tree = vec![comment("t1_a", "t3_link")];

        attach_comment(&mut tree, "t3_link", comment("t1_orphan", "t1_missing"));

        assert_eq!(tree.len(), 2);
    }
}

use serde::{Deserialize, Deserializer};

/// OAuth token response from `/api/v1/access_token`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: u64,
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
}

/// Reddit's generic envelope: every object is `{"kind": "...", "data": {...}}`.
///
/// Kinds seen by this client: `Listing`, `t1` (comment), `t3` (submission),
/// and `more` (unexpanded comment placeholder).
#[derive(Debug, Clone, Deserialize)]
pub struct Thing<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingData<T> {
    #[serde(default = "Vec::new")]
    pub children: Vec<Thing<T>>,
    #[serde(default)]
    pub after: Option<String>,
}

pub type Listing<T> = Thing<ListingData<T>>;

/// A submission (`t3`) as returned in listings and comment pages.
///
/// `approved` and `removed` are only populated when the authenticated account
/// moderates the subreddit; they default to false otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionData {
    #[serde(default)]
    pub id: String,
    /// Fullname, e.g. `t3_abc123`.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub title: String,
    /// None when the account was deleted.
    #[serde(default)]
    pub author: Option<String>,
    /// Seconds since epoch, fractional.
    #[serde(default)]
    pub created_utc: f64,
    #[serde(default)]
    pub is_self: bool,
    /// `"moderator"` / `"admin"` when posted in official capacity.
    #[serde(default)]
    pub distinguished: Option<String>,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub removed: bool,
}

/// A comment (`t1`) or a `more` placeholder.
///
/// Every field is defaulted so one lenient struct covers both kinds; callers
/// dispatch on [`Thing::kind`]. For `more` nodes only `children` (the ids
/// still to fetch) and `parent_id` are meaningful.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentData {
    #[serde(default)]
    pub id: String,
    /// Fullname, e.g. `t1_def456`.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub is_submitter: bool,
    #[serde(default)]
    pub distinguished: Option<String>,
    #[serde(default)]
    pub parent_id: String,
    /// Reddit sends `""` instead of an empty listing here.
    #[serde(default, deserialize_with = "replies_or_empty")]
    pub replies: Option<Listing<CommentData>>,
    /// Only on `more` nodes: ids (without the `t1_` prefix) left unexpanded.
    #[serde(default)]
    pub children: Vec<String>,
}

fn replies_or_empty<'de, D>(deserializer: D) -> Result<Option<Listing<CommentData>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Object(_) => serde_json::from_value(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// Envelope for `api_type=json` write endpoints (`/api/comment`,
/// `/api/morechildren`).
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    pub json: ApiResponseBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponseBody {
    /// Each error is a `[code, message, field]` triple.
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
    #[serde(default)]
    pub data: Option<ApiResponseData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponseData {
    #[serde(default = "Vec::new")]
    pub things: Vec<Thing<CommentData>>,
}

use serde::{Serialize, Deserialize};
use std::collections::HashMap;
use std::fmt;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::error::{Error, ErrorCode, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[cfg_attr(feature = "backend", derive(sqlx::Type))]
#[cfg_attr(feature = "backend", sqlx(type_name = "vote_type", rename_all = "UPPERCASE"))]
pub enum VoteType {
    Up,
    Down,
}

impl VoteType {
    pub const fn as_str(self) -> &'static str {
        match self {
            VoteType::Up => "UP",
            VoteType::Down => "DOWN",
        }
    }

    /// Contribution of a single vote to a post's score.
    pub const fn weight(self) -> i64 {
        match self {
            VoteType::Up => 1,
            VoteType::Down => -1,
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a vote is cast on. Votes are unique per (user, target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "id")]
pub enum VoteTarget {
    Post(Uuid),
    Comment(Uuid),
}

impl VoteTarget {
    pub const fn id(self) -> Uuid {
        match self {
            VoteTarget::Post(id) | VoteTarget::Comment(id) => id,
        }
    }
}

impl fmt::Display for VoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteTarget::Post(id) => write!(f, "post:{}", id),
            VoteTarget::Comment(id) => write!(f, "comment:{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub user_id: Uuid,
    pub target: VoteTarget,
    pub vote_type: VoteType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostVote {
    pub user_id: Uuid,
    pub post_id: Uuid,
    pub vote_type: VoteType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: serde_json::Value,
    pub author_id: Uuid,
    pub author_username: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub votes: Vec<PostVote>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostVoteRequest {
    pub post_id: String,
    pub vote_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentVoteRequest {
    pub comment_id: String,
    pub vote_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub post_id: String,
    pub text: String,
    #[serde(default)]
    pub reply_to_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub post_id: Uuid,
    pub text: String,
    pub reply_to_id: Option<Uuid>,
}

/// A vote request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteCommand {
    pub target: VoteTarget,
    pub vote_type: VoteType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostTally {
    pub votes_amt: i64,
    pub current_vote: Option<VoteType>,
}

const FIELD_ID: &str = "id";
const FIELD_TITLE: &str = "title";
const FIELD_AUTHOR: &str = "authorUserName";
const FIELD_CONTENT: &str = "content";
const FIELD_CURRENT_VOTE: &str = "currentVote";
const FIELD_CREATED_AT: &str = "createdAt";
const FIELD_VOTES_AMT: &str = "votesAmt";

/// Denormalized post snapshot kept in the fast cache once a post has been
/// promoted. Stored as a flat string map under [`CachedPost::cache_key`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPost {
    pub id: Uuid,
    pub title: String,
    pub author_user_name: String,
    pub content: String,
    pub current_vote: VoteType,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub votes_amt: i64,
}

impl CachedPost {
    pub fn cache_key(post_id: Uuid) -> String {
        format!("post:{}", post_id)
    }

    pub fn from_post(post: &Post, votes_amt: i64, current_vote: VoteType) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            author_user_name: post.author_username.clone().unwrap_or_default(),
            content: post.content.to_string(),
            current_vote,
            created_at: post.created_at,
            votes_amt,
        }
    }

    pub fn to_fields(&self) -> Result<HashMap<String, String>> {
        let created_at = self.created_at.format(&Rfc3339).map_err(|e| {
            Error::with_details(ErrorCode::InvalidInput, "Unformattable post timestamp", e.to_string())
        })?;

        Ok(HashMap::from([
            (FIELD_ID.to_string(), self.id.to_string()),
            (FIELD_TITLE.to_string(), self.title.clone()),
            (FIELD_AUTHOR.to_string(), self.author_user_name.clone()),
            (FIELD_CONTENT.to_string(), self.content.clone()),
            (FIELD_CURRENT_VOTE.to_string(), self.current_vote.as_str().to_string()),
            (FIELD_CREATED_AT.to_string(), created_at),
            (FIELD_VOTES_AMT.to_string(), self.votes_amt.to_string()),
        ]))
    }

    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self> {
        let field = |name: &str| {
            fields.get(name).ok_or_else(|| {
                Error::with_details(ErrorCode::SystemError, "Incomplete cached post", format!("missing field `{}`", name))
            })
        };
        let corrupt = |name: &str, details: String| {
            Error::with_details(ErrorCode::SystemError, format!("Corrupt cached field `{}`", name), details)
        };

        let id = Uuid::parse_str(field(FIELD_ID)?).map_err(|e| corrupt(FIELD_ID, e.to_string()))?;
        let current_vote = match field(FIELD_CURRENT_VOTE)?.as_str() {
            "UP" => VoteType::Up,
            "DOWN" => VoteType::Down,
            other => return Err(corrupt(FIELD_CURRENT_VOTE, other.to_string())),
        };
        let created_at = OffsetDateTime::parse(field(FIELD_CREATED_AT)?, &Rfc3339)
            .map_err(|e| corrupt(FIELD_CREATED_AT, e.to_string()))?;
        let votes_amt = field(FIELD_VOTES_AMT)?
            .parse::<i64>()
            .map_err(|e| corrupt(FIELD_VOTES_AMT, e.to_string()))?;

        Ok(Self {
            id,
            title: field(FIELD_TITLE)?.clone(),
            author_user_name: field(FIELD_AUTHOR)?.clone(),
            content: field(FIELD_CONTENT)?.clone(),
            current_vote,
            created_at,
            votes_amt,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewSource {
    Cache,
    Store,
}

/// Read model for a single post page, served from the cache when a snapshot exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: Uuid,
    pub title: String,
    pub author_user_name: String,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub source: ViewSource,
}

impl From<CachedPost> for PostView {
    fn from(cached: CachedPost) -> Self {
        Self {
            id: cached.id,
            title: cached.title,
            author_user_name: cached.author_user_name,
            content: cached.content,
            created_at: cached.created_at,
            source: ViewSource::Cache,
        }
    }
}

impl From<&Post> for PostView {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            author_user_name: post.author_username.clone().unwrap_or_default(),
            content: post.content.to_string(),
            created_at: post.created_at,
            source: ViewSource::Store,
        }
    }
}

impl Post {
    pub fn vote_of(&self, user_id: Uuid) -> Option<VoteType> {
        self.votes
            .iter()
            .find(|vote| vote.user_id == user_id)
            .map(|vote| vote.vote_type)
    }
}

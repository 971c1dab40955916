use std::str::FromStr;
use uuid::Uuid;
use crate::models::{CommentRequest, CommentVoteRequest, NewComment, PostVoteRequest, VoteCommand, VoteTarget, VoteType};

pub const MAX_ID_LENGTH: usize = 64;
pub const MAX_COMMENT_LENGTH: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing {0}")]
    MissingField(&'static str),
    #[error("Invalid {field}: {value}")]
    InvalidId { field: &'static str, value: String },
    #[error("Invalid vote type: {0} (must be UP or DOWN)")]
    InvalidVoteType(String),
    #[error("Comment is too long ({0} characters)")]
    CommentTooLong(usize),
}

impl FromStr for VoteType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UP" => Ok(VoteType::Up),
            "DOWN" => Ok(VoteType::Down),
            other => Err(ValidationError::InvalidVoteType(other.to_string())),
        }
    }
}

pub fn parse_id(field: &'static str, raw: &str) -> Result<Uuid, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() { return Err(ValidationError::MissingField(field)); }
    if raw.len() > MAX_ID_LENGTH {
        return Err(ValidationError::InvalidId { field, value: format!("{}...", raw.chars().take(MAX_ID_LENGTH).collect::<String>()) });
    }
    Uuid::parse_str(raw).map_err(|_| ValidationError::InvalidId { field, value: raw.to_string() })
}

pub fn validate_post_vote(request: &PostVoteRequest) -> Result<VoteCommand, ValidationError> {
    let vote_type = request.vote_type.parse::<VoteType>()?;
    let post_id = parse_id("postId", &request.post_id)?;
    Ok(VoteCommand { target: VoteTarget::Post(post_id), vote_type })
}

pub fn validate_comment_vote(request: &CommentVoteRequest) -> Result<VoteCommand, ValidationError> {
    let vote_type = request.vote_type.parse::<VoteType>()?;
    let comment_id = parse_id("commentId", &request.comment_id)?;
    Ok(VoteCommand { target: VoteTarget::Comment(comment_id), vote_type })
}

pub fn validate_comment(request: &CommentRequest) -> Result<NewComment, ValidationError> {
    let post_id = parse_id("postId", &request.post_id)?;
    let text = request.text.trim();
    if text.is_empty() { return Err(ValidationError::MissingField("text")); }
    let length = text.chars().count();
    if length > MAX_COMMENT_LENGTH { return Err(ValidationError::CommentTooLong(length)); }

    let reply_to_id = request.reply_to_id
        .as_deref()
        .map(|raw| parse_id("replyToId", raw))
        .transpose()?;

    Ok(NewComment { post_id, text: text.to_string(), reply_to_id })
}

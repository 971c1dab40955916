use crate::error::ApiError;
use uuid::Uuid;

pub fn parse_post_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::InvalidId)
}

pub fn post_vote_key(voter_id: Uuid, post_id: Uuid) -> String {
    format!("post_vote:{}:{}", voter_id, post_id)
}

pub fn comment_vote_key(voter_id: Uuid, comment_id: Uuid) -> String {
    format!("comment_vote:{}:{}", voter_id, comment_id)
}

use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use shared::error::{Error as ErrorBody, ErrorCode};
use shared::validation::ValidationError;
use thiserror::Error;
use tracing::error;
use crate::processor::VoteError;

pub const VOTE_FAILED_MESSAGE: &str = "Could not register your vote, please try again.";
pub const COMMENT_FAILED_MESSAGE: &str = "Could not create comment, please try again later.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthenticated,
    #[error("Invalid request data passed: {0}")]
    Validation(#[from] ValidationError),
    #[error("Invalid id")]
    InvalidId,
    #[error("Post not found")]
    PostNotFound,
    #[error("Comment not found")]
    CommentNotFound,
    #[error("{0}")]
    RateLimited(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::Unauthenticated => Status::Unauthorized,
            ApiError::Validation(_) => Status::UnprocessableEntity,
            ApiError::InvalidId => Status::BadRequest,
            ApiError::PostNotFound | ApiError::CommentNotFound => Status::NotFound,
            ApiError::RateLimited(_) => Status::TooManyRequests,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }

    fn code(&self) -> ErrorCode {
        match self {
            ApiError::Unauthenticated => ErrorCode::Unauthenticated,
            ApiError::Validation(_) => ErrorCode::ValidationFailed,
            ApiError::InvalidId => ErrorCode::InvalidInput,
            ApiError::PostNotFound | ApiError::CommentNotFound => ErrorCode::NotFound,
            ApiError::RateLimited(_) => ErrorCode::RateLimited,
            ApiError::Internal(_) => ErrorCode::SystemError,
        }
    }

    /// Maps a processor failure, hiding store details behind `fallback`.
    pub fn from_vote_error(err: VoteError, fallback: &str) -> Self {
        match err {
            VoteError::Validation(e) => ApiError::Validation(e),
            VoteError::PostNotFound => ApiError::PostNotFound,
            VoteError::CommentNotFound => ApiError::CommentNotFound,
            VoteError::Store(e) => {
                error!("Store failure: {}", e);
                ApiError::Internal(fallback.to_string())
            }
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        let body = Json(ErrorBody::new(self.code(), self.to_string()));

        rocket::Response::build_from(body.respond_to(req)?)
            .status(status)
            .ok()
    }
}

use rocket::{Build, Rocket, State, catchers, get, patch, routes, serde::json::Json};
use std::sync::Arc;
use tracing::{debug, instrument};
use shared::models::*;
use shared::principal::Principal;
use shared::validation::{validate_comment, validate_comment_vote, validate_post_vote};
use crate::{
    cache::SnapshotCache,
    catchers::{bad_request, internal_error, not_found, too_many_requests, unprocessable_entity},
    config::VoteConfig,
    error::{ApiError, COMMENT_FAILED_MESSAGE, VOTE_FAILED_MESSAGE},
    processor::VoteProcessor,
    rate_limiter::RateLimiter,
    store::VoteStore,
    utils::{comment_vote_key, parse_post_id, post_vote_key},
};

const POST_READ_FAILED_MESSAGE: &str = "Could not load the post, please try again.";

pub struct AppState {
    pub votes: VoteProcessor,
    pub vote_limiter: RateLimiter,
}

impl AppState {
    pub fn new(store: Arc<dyn VoteStore>, cache: Arc<dyn SnapshotCache>, config: VoteConfig) -> Self {
        Self {
            vote_limiter: RateLimiter::new(config.rate_limit_attempts, config.rate_limit_window_minutes),
            votes: VoteProcessor::new(store, cache, config),
        }
    }
}

pub fn build_rocket(state: AppState) -> Rocket<Build> {
    rocket::build()
        .manage(state)
        .mount(
            "/api",
            routes![
                vote_post,
                vote_comment,
                create_comment,
                get_post_votes,
                get_post,
            ],
        )
        .register(
            "/",
            catchers![
                unprocessable_entity,
                too_many_requests,
                bad_request,
                internal_error,
                not_found
            ],
        )
}

/// The body is validated before the principal is checked, so a malformed
/// request is a 422 even when unauthenticated.
fn require_principal(principal: Option<Principal>) -> Result<Principal, ApiError> {
    principal.ok_or(ApiError::Unauthenticated)
}

#[instrument(skip(state, principal, request))]
#[patch("/subreddit/post/vote", format = "json", data = "<request>")]
pub async fn vote_post(
    state: &State<AppState>,
    principal: Option<Principal>,
    request: Json<PostVoteRequest>,
) -> Result<&'static str, ApiError> {
    let command = validate_post_vote(&request)?;
    let principal = require_principal(principal)?;
    let post_id = command.target.id();

    state.vote_limiter
        .check_rate_limit(&post_vote_key(principal.user_id, post_id))
        .map_err(|e| ApiError::RateLimited(e.to_string()))?;

    let outcome = state.votes
        .cast_post_vote(principal.user_id, post_id, command.vote_type)
        .await
        .map_err(|e| ApiError::from_vote_error(e, VOTE_FAILED_MESSAGE))?;

    debug!(?outcome, "Post vote registered");
    Ok("OK")
}

#[instrument(skip(state, principal, request))]
#[patch("/subreddit/comment/vote", format = "json", data = "<request>")]
pub async fn vote_comment(
    state: &State<AppState>,
    principal: Option<Principal>,
    request: Json<CommentVoteRequest>,
) -> Result<&'static str, ApiError> {
    let command = validate_comment_vote(&request)?;
    let principal = require_principal(principal)?;
    let comment_id = command.target.id();

    state.vote_limiter
        .check_rate_limit(&comment_vote_key(principal.user_id, comment_id))
        .map_err(|e| ApiError::RateLimited(e.to_string()))?;

    let transition = state.votes
        .cast_comment_vote(principal.user_id, comment_id, command.vote_type)
        .await
        .map_err(|e| ApiError::from_vote_error(e, VOTE_FAILED_MESSAGE))?;

    debug!(?transition, "Comment vote registered");
    Ok("OK")
}

#[instrument(skip(state, principal, request))]
#[patch("/subreddit/post/comment", format = "json", data = "<request>")]
pub async fn create_comment(
    state: &State<AppState>,
    principal: Option<Principal>,
    request: Json<CommentRequest>,
) -> Result<&'static str, ApiError> {
    let comment = validate_comment(&request)?;
    let principal = require_principal(principal)?;

    state.votes
        .post_comment(principal.user_id, &comment)
        .await
        .map_err(|e| ApiError::from_vote_error(e, COMMENT_FAILED_MESSAGE))?;
    Ok("OK")
}

#[get("/subreddit/post/<id>/votes")]
pub async fn get_post_votes(
    state: &State<AppState>,
    id: &str,
    principal: Option<Principal>,
) -> Result<Json<PostTally>, ApiError> {
    let post_id = parse_post_id(id)?;
    state.votes
        .post_tally(post_id, principal.map(|p| p.user_id))
        .await
        .map(Json)
        .map_err(|e| ApiError::from_vote_error(e, POST_READ_FAILED_MESSAGE))
}

#[get("/subreddit/post/<id>")]
pub async fn get_post(state: &State<AppState>, id: &str) -> Result<Json<PostView>, ApiError> {
    let post_id = parse_post_id(id)?;
    state.votes
        .post_view(post_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_vote_error(e, POST_READ_FAILED_MESSAGE))
}

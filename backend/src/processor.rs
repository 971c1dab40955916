use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use shared::models::*;
use shared::tally::{self, VoteTransition};
use shared::validation::{self, ValidationError};
use crate::cache::SnapshotCache;
use crate::config::VoteConfig;
use crate::store::{StoreError, VoteStore};

#[derive(Debug, thiserror::Error)]
pub enum VoteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Post not found")]
    PostNotFound,
    #[error("Comment not found")]
    CommentNotFound,
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result of applying one vote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    pub transition: VoteTransition,
    /// Recomputed score, absent when the branch skipped recomputation.
    pub score: Option<i64>,
    /// Whether a snapshot was written to the cache by this call.
    pub cached: bool,
}

impl VoteOutcome {
    fn removed() -> Self {
        Self { transition: VoteTransition::Remove, score: None, cached: false }
    }
}

pub struct VoteProcessor {
    store: Arc<dyn VoteStore>,
    cache: Arc<dyn SnapshotCache>,
    config: VoteConfig,
}

impl VoteProcessor {
    pub fn new(store: Arc<dyn VoteStore>, cache: Arc<dyn SnapshotCache>, config: VoteConfig) -> Self {
        Self { store, cache, config }
    }

    pub async fn apply_post_vote(&self, voter_id: Uuid, request: &PostVoteRequest) -> Result<VoteOutcome, VoteError> {
        let command = validation::validate_post_vote(request)?;
        self.cast_post_vote(voter_id, command.target.id(), command.vote_type).await
    }

    /// Applies the toggle state machine to (voter, post), then recomputes the
    /// score from the stored votes and promotes the post into the cache once
    /// it reaches the threshold. Removing a vote returns before recomputation.
    #[instrument(skip(self))]
    pub async fn cast_post_vote(&self, voter_id: Uuid, post_id: Uuid, vote_type: VoteType) -> Result<VoteOutcome, VoteError> {
        let target = VoteTarget::Post(post_id);
        let existing = self.store.find_vote(voter_id, target).await?;

        if !self.store.post_exists(post_id).await? {
            return Err(VoteError::PostNotFound);
        }

        let transition = tally::transition(existing.map(|vote| vote.vote_type), vote_type);
        match transition {
            VoteTransition::Remove => {
                self.store.delete_vote(voter_id, target).await?;
                debug!("Vote removed");
                if self.config.evict_on_toggle_off {
                    self.evict_snapshot(post_id).await;
                }
                return Ok(VoteOutcome::removed());
            }
            VoteTransition::Update => self.store.update_vote_direction(voter_id, target, vote_type).await?,
            VoteTransition::Create => self.store.create_vote(voter_id, target, vote_type).await?,
        }

        let post = self.store
            .get_post_with_votes(post_id)
            .await?
            .ok_or(VoteError::PostNotFound)?;
        let score = tally::score(post.votes.iter().map(|vote| vote.vote_type));

        let cached = if tally::should_promote(score, self.config.promotion_threshold) {
            self.write_snapshot(&post, score, vote_type).await
        } else {
            false
        };

        debug!(?transition, score, cached, "Vote applied");
        Ok(VoteOutcome { transition, score: Some(score), cached })
    }

    pub async fn apply_comment_vote(&self, voter_id: Uuid, request: &CommentVoteRequest) -> Result<VoteTransition, VoteError> {
        let command = validation::validate_comment_vote(request)?;
        self.cast_comment_vote(voter_id, command.target.id(), command.vote_type).await
    }

    /// Same toggle as posts, without scoring or caching.
    #[instrument(skip(self))]
    pub async fn cast_comment_vote(&self, voter_id: Uuid, comment_id: Uuid, vote_type: VoteType) -> Result<VoteTransition, VoteError> {
        let target = VoteTarget::Comment(comment_id);
        let existing = self.store.find_vote(voter_id, target).await?;
        if !self.store.comment_exists(comment_id).await? {
            return Err(VoteError::CommentNotFound);
        }

        let transition = tally::transition(existing.map(|vote| vote.vote_type), vote_type);
        match transition {
            VoteTransition::Remove => self.store.delete_vote(voter_id, target).await?,
            VoteTransition::Update => self.store.update_vote_direction(voter_id, target, vote_type).await?,
            VoteTransition::Create => self.store.create_vote(voter_id, target, vote_type).await?,
        }
        Ok(transition)
    }

    /// Adds a comment to a post, optionally as a reply to an existing comment.
    #[instrument(skip(self, comment), fields(post_id = %comment.post_id))]
    pub async fn post_comment(&self, author_id: Uuid, comment: &NewComment) -> Result<Uuid, VoteError> {
        if !self.store.post_exists(comment.post_id).await? {
            return Err(VoteError::PostNotFound);
        }
        if let Some(parent) = comment.reply_to_id {
            if !self.store.comment_exists(parent).await? {
                return Err(VoteError::CommentNotFound);
            }
        }

        let id = self.store.create_comment(author_id, comment).await?;
        info!("Comment {} added", id);
        Ok(id)
    }

    /// Score and the viewer's own vote, always derived from the store.
    pub async fn post_tally(&self, post_id: Uuid, viewer: Option<Uuid>) -> Result<PostTally, VoteError> {
        let post = self.store
            .get_post_with_votes(post_id)
            .await?
            .ok_or(VoteError::PostNotFound)?;

        Ok(PostTally {
            votes_amt: tally::score(post.votes.iter().map(|vote| vote.vote_type)),
            current_vote: viewer.and_then(|user_id| post.vote_of(user_id)),
        })
    }

    /// Serves the cached snapshot when one exists, falling back to the store.
    /// A broken cache behaves like a miss.
    pub async fn post_view(&self, post_id: Uuid) -> Result<PostView, VoteError> {
        if let Some(cached) = self.read_snapshot(post_id).await {
            return Ok(PostView::from(cached));
        }

        let post = self.store
            .get_post_with_votes(post_id)
            .await?
            .ok_or(VoteError::PostNotFound)?;
        Ok(PostView::from(&post))
    }

    async fn write_snapshot(&self, post: &Post, score: i64, current_vote: VoteType) -> bool {
        let key = CachedPost::cache_key(post.id);
        let fields = match CachedPost::from_post(post, score, current_vote).to_fields() {
            Ok(fields) => fields,
            Err(e) => {
                warn!("Skipping snapshot for {}: {}", key, e);
                return false;
            }
        };

        match self.cache.write_snapshot(&key, fields).await {
            Ok(()) => {
                info!("Cached {} at score {}", key, score);
                true
            }
            Err(e) => {
                warn!("Failed to cache {}: {}", key, e);
                false
            }
        }
    }

    async fn read_snapshot(&self, post_id: Uuid) -> Option<CachedPost> {
        let key = CachedPost::cache_key(post_id);
        match self.cache.read_snapshot(&key).await {
            Ok(Some(fields)) => match CachedPost::from_fields(&fields) {
                Ok(cached) => Some(cached),
                Err(e) => {
                    warn!("Ignoring unreadable snapshot {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn evict_snapshot(&self, post_id: Uuid) {
        let key = CachedPost::cache_key(post_id);
        if let Err(e) = self.cache.evict_snapshot(&key).await {
            warn!("Failed to evict {}: {}", key, e);
        }
    }
}

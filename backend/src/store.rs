use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;
use shared::models::*;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,
    #[error("Unique constraint violated: {0}")]
    ConstraintViolation(String),
    #[error("Store lock poisoned")]
    LockFailed,
    #[error("Database error: {0}")]
    Database(String),
}

/// Durable record of votes keyed by (user, target).
///
/// Each call is an independent round-trip; callers get no atomicity across
/// calls. The (user, target) uniqueness invariant is enforced here, not by
/// callers: a second `create_vote` for the same pair fails with
/// [`StoreError::ConstraintViolation`].
#[async_trait]
pub trait VoteStore: Send + Sync {
    async fn find_vote(&self, user_id: Uuid, target: VoteTarget) -> Result<Option<Vote>, StoreError>;
    async fn create_vote(&self, user_id: Uuid, target: VoteTarget, vote_type: VoteType) -> Result<(), StoreError>;
    async fn update_vote_direction(&self, user_id: Uuid, target: VoteTarget, vote_type: VoteType) -> Result<(), StoreError>;
    async fn delete_vote(&self, user_id: Uuid, target: VoteTarget) -> Result<(), StoreError>;
    async fn get_post_with_votes(&self, post_id: Uuid) -> Result<Option<Post>, StoreError>;
    async fn post_exists(&self, post_id: Uuid) -> Result<bool, StoreError>;
    async fn comment_exists(&self, comment_id: Uuid) -> Result<bool, StoreError>;
    /// Inserts a comment authored by `author_id` and returns its id.
    async fn create_comment(&self, author_id: Uuid, comment: &NewComment) -> Result<Uuid, StoreError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    posts: HashMap<Uuid, Post>,
    /// comment id -> post id
    comments: HashMap<Uuid, Uuid>,
    votes: HashMap<(Uuid, VoteTarget), VoteType>,
}

impl MemoryState {
    fn target_exists(&self, target: VoteTarget) -> bool {
        match target {
            VoteTarget::Post(id) => self.posts.contains_key(&id),
            VoteTarget::Comment(id) => self.comments.contains_key(&id),
        }
    }
}

/// In-process store used for local runs and tests.
#[derive(Debug, Default)]
pub struct MemoryVoteStore {
    state: Mutex<MemoryState>,
}

impl MemoryVoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_post(&self, mut post: Post) -> Result<(), StoreError> {
        let mut state = self.state.lock().map_err(|_| StoreError::LockFailed)?;
        for vote in post.votes.drain(..) {
            state.votes.insert((vote.user_id, VoteTarget::Post(vote.post_id)), vote.vote_type);
        }
        state.posts.insert(post.id, post);
        Ok(())
    }

    pub fn comment_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        let state = self.state.lock().map_err(|_| StoreError::LockFailed)?;
        Ok(state.comments.keys().copied().collect())
    }

    pub fn vote_count(&self, target: VoteTarget) -> Result<usize, StoreError> {
        let state = self.state.lock().map_err(|_| StoreError::LockFailed)?;
        Ok(state.votes.keys().filter(|(_, t)| *t == target).count())
    }
}

#[async_trait]
impl VoteStore for MemoryVoteStore {
    async fn find_vote(&self, user_id: Uuid, target: VoteTarget) -> Result<Option<Vote>, StoreError> {
        let state = self.state.lock().map_err(|_| StoreError::LockFailed)?;
        Ok(state.votes.get(&(user_id, target)).map(|&vote_type| Vote { user_id, target, vote_type }))
    }

    async fn create_vote(&self, user_id: Uuid, target: VoteTarget, vote_type: VoteType) -> Result<(), StoreError> {
        let mut state = self.state.lock().map_err(|_| StoreError::LockFailed)?;
        if !state.target_exists(target) {
            return Err(StoreError::NotFound);
        }
        if state.votes.contains_key(&(user_id, target)) {
            return Err(StoreError::ConstraintViolation(format!("vote {}:{}", user_id, target)));
        }
        state.votes.insert((user_id, target), vote_type);
        Ok(())
    }

    async fn update_vote_direction(&self, user_id: Uuid, target: VoteTarget, vote_type: VoteType) -> Result<(), StoreError> {
        let mut state = self.state.lock().map_err(|_| StoreError::LockFailed)?;
        let vote = state.votes.get_mut(&(user_id, target)).ok_or(StoreError::NotFound)?;
        *vote = vote_type;
        Ok(())
    }

    async fn delete_vote(&self, user_id: Uuid, target: VoteTarget) -> Result<(), StoreError> {
        let mut state = self.state.lock().map_err(|_| StoreError::LockFailed)?;
        state.votes.remove(&(user_id, target)).map(|_| ()).ok_or(StoreError::NotFound)
    }

    async fn get_post_with_votes(&self, post_id: Uuid) -> Result<Option<Post>, StoreError> {
        let state = self.state.lock().map_err(|_| StoreError::LockFailed)?;
        let Some(post) = state.posts.get(&post_id) else { return Ok(None) };

        let votes = state.votes.iter()
            .filter(|((_, target), _)| *target == VoteTarget::Post(post_id))
            .map(|(&(user_id, _), &vote_type)| PostVote { user_id, post_id, vote_type })
            .collect();

        Ok(Some(Post { votes, ..post.clone() }))
    }

    async fn post_exists(&self, post_id: Uuid) -> Result<bool, StoreError> {
        let state = self.state.lock().map_err(|_| StoreError::LockFailed)?;
        Ok(state.posts.contains_key(&post_id))
    }

    async fn comment_exists(&self, comment_id: Uuid) -> Result<bool, StoreError> {
        let state = self.state.lock().map_err(|_| StoreError::LockFailed)?;
        Ok(state.comments.contains_key(&comment_id))
    }

    async fn create_comment(&self, _author_id: Uuid, comment: &NewComment) -> Result<Uuid, StoreError> {
        let mut state = self.state.lock().map_err(|_| StoreError::LockFailed)?;
        if !state.posts.contains_key(&comment.post_id) {
            return Err(StoreError::NotFound);
        }
        if let Some(parent) = comment.reply_to_id {
            if !state.comments.contains_key(&parent) {
                return Err(StoreError::NotFound);
            }
        }

        let id = Uuid::new_v4();
        state.comments.insert(id, comment.post_id);
        Ok(id)
    }
}

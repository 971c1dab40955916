use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;
use shared::models::*;
use crate::store::{StoreError, VoteStore};

#[derive(sqlx::FromRow)]
struct PostRow {
    id: Uuid,
    title: String,
    content: serde_json::Value,
    author_id: Uuid,
    author_username: Option<String>,
    created_at: OffsetDateTime,
}

#[derive(sqlx::FromRow)]
struct PostVoteRow {
    user_id: Uuid,
    post_id: Uuid,
    vote_type: VoteType,
}

impl From<PostVoteRow> for PostVote {
    fn from(row: PostVoteRow) -> Self {
        Self {
            user_id: row.user_id,
            post_id: row.post_id,
            vote_type: row.vote_type,
        }
    }
}

fn map_db_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::ConstraintViolation(db.constraint().unwrap_or("unknown").to_string())
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StoreError::NotFound,
        sqlx::Error::RowNotFound => StoreError::NotFound,
        _ => StoreError::Database(e.to_string()),
    }
}

/// Postgres-backed vote store. Post votes live in `votes`, comment votes in
/// `comment_votes`; both have a primary key on (user_id, target id).
#[derive(Clone)]
pub struct PgVoteStore {
    pool: PgPool,
}

impl PgVoteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VoteStore for PgVoteStore {
    async fn find_vote(&self, user_id: Uuid, target: VoteTarget) -> Result<Option<Vote>, StoreError> {
        let vote_type = match target {
            VoteTarget::Post(post_id) => sqlx::query_scalar::<_, VoteType>(
                "SELECT vote_type FROM votes WHERE user_id = $1 AND post_id = $2"
            )
            .bind(user_id)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await,
            VoteTarget::Comment(comment_id) => sqlx::query_scalar::<_, VoteType>(
                "SELECT vote_type FROM comment_votes WHERE user_id = $1 AND comment_id = $2"
            )
            .bind(user_id)
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await,
        }
        .map_err(map_db_error)?;

        Ok(vote_type.map(|vote_type| Vote { user_id, target, vote_type }))
    }

    async fn create_vote(&self, user_id: Uuid, target: VoteTarget, vote_type: VoteType) -> Result<(), StoreError> {
        let (sql, target_id) = match target {
            VoteTarget::Post(id) => ("INSERT INTO votes (user_id, post_id, vote_type) VALUES ($1, $2, $3)", id),
            VoteTarget::Comment(id) => ("INSERT INTO comment_votes (user_id, comment_id, vote_type) VALUES ($1, $2, $3)", id),
        };

        sqlx::query(sql)
            .bind(user_id)
            .bind(target_id)
            .bind(vote_type)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        debug!("Created {} vote for {}", vote_type, target);
        Ok(())
    }

    async fn update_vote_direction(&self, user_id: Uuid, target: VoteTarget, vote_type: VoteType) -> Result<(), StoreError> {
        let (sql, target_id) = match target {
            VoteTarget::Post(id) => ("UPDATE votes SET vote_type = $3 WHERE user_id = $1 AND post_id = $2", id),
            VoteTarget::Comment(id) => ("UPDATE comment_votes SET vote_type = $3 WHERE user_id = $1 AND comment_id = $2", id),
        };

        let result = sqlx::query(sql)
            .bind(user_id)
            .bind(target_id)
            .bind(vote_type)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_vote(&self, user_id: Uuid, target: VoteTarget) -> Result<(), StoreError> {
        let (sql, target_id) = match target {
            VoteTarget::Post(id) => ("DELETE FROM votes WHERE user_id = $1 AND post_id = $2", id),
            VoteTarget::Comment(id) => ("DELETE FROM comment_votes WHERE user_id = $1 AND comment_id = $2", id),
        };

        let result = sqlx::query(sql)
            .bind(user_id)
            .bind(target_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn get_post_with_votes(&self, post_id: Uuid) -> Result<Option<Post>, StoreError> {
        let record = sqlx::query_as::<_, PostRow>(
            "SELECT p.id, p.title, p.content, p.author_id, u.username AS author_username, p.created_at
             FROM posts p JOIN users u ON u.id = p.author_id
             WHERE p.id = $1"
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        let Some(post) = record else { return Ok(None) };

        let votes = sqlx::query_as::<_, PostVoteRow>(
            "SELECT user_id, post_id, vote_type FROM votes WHERE post_id = $1"
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(Some(Post {
            id: post.id,
            title: post.title,
            content: post.content,
            author_id: post.author_id,
            author_username: post.author_username,
            created_at: post.created_at,
            votes: votes.into_iter().map(PostVote::from).collect(),
        }))
    }

    async fn post_exists(&self, post_id: Uuid) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM posts WHERE id = $1)")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn comment_exists(&self, comment_id: Uuid) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM comments WHERE id = $1)")
            .bind(comment_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn create_comment(&self, author_id: Uuid, comment: &NewComment) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO comments (id, text, post_id, author_id, reply_to_id) VALUES ($1, $2, $3, $4, $5)"
        )
        .bind(id)
        .bind(&comment.text)
        .bind(comment.post_id)
        .bind(author_id)
        .bind(comment.reply_to_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        debug!("Created comment {} on post {}", id, comment.post_id);
        Ok(id)
    }
}

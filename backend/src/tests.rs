use async_trait::async_trait;
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use time::macros::datetime;
use uuid::Uuid;
use shared::models::*;
use shared::error::{Error as ErrorBody, ErrorCode};
use shared::principal::USER_ID_HEADER;
use shared::tally::VoteTransition;
use shared::validation::ValidationError;
use crate::cache::{non_empty, CacheError, MemorySnapshotCache, SnapshotCache, SnapshotFields};
use crate::config::VoteConfig;
use crate::error::VOTE_FAILED_MESSAGE;
use crate::processor::{VoteError, VoteProcessor};
use crate::routes::{build_rocket, AppState};
use crate::store::{MemoryVoteStore, StoreError, VoteStore};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Counts writes and delegates to an in-memory cache.
#[derive(Default)]
struct CountingCache {
    inner: MemorySnapshotCache,
    writes: AtomicUsize,
}

impl CountingCache {
    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotCache for CountingCache {
    async fn write_snapshot(&self, key: &str, fields: SnapshotFields) -> Result<(), CacheError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.write_snapshot(key, fields).await
    }

    async fn read_snapshot(&self, key: &str) -> Result<Option<SnapshotFields>, CacheError> {
        self.inner.read_snapshot(key).await
    }

    async fn evict_snapshot(&self, key: &str) -> Result<(), CacheError> {
        self.inner.evict_snapshot(key).await
    }
}

struct FailingCache;

#[async_trait]
impl SnapshotCache for FailingCache {
    async fn write_snapshot(&self, _key: &str, _fields: SnapshotFields) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn read_snapshot(&self, _key: &str) -> Result<Option<SnapshotFields>, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }

    async fn evict_snapshot(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
}

/// Fails every call; proves a code path never touches the store.
struct UnreachableStore;

#[async_trait]
impl VoteStore for UnreachableStore {
    async fn find_vote(&self, _: Uuid, _: VoteTarget) -> Result<Option<Vote>, StoreError> {
        Err(StoreError::Database("store accessed".into()))
    }
    async fn create_vote(&self, _: Uuid, _: VoteTarget, _: VoteType) -> Result<(), StoreError> {
        Err(StoreError::Database("store accessed".into()))
    }
    async fn update_vote_direction(&self, _: Uuid, _: VoteTarget, _: VoteType) -> Result<(), StoreError> {
        Err(StoreError::Database("store accessed".into()))
    }
    async fn delete_vote(&self, _: Uuid, _: VoteTarget) -> Result<(), StoreError> {
        Err(StoreError::Database("store accessed".into()))
    }
    async fn get_post_with_votes(&self, _: Uuid) -> Result<Option<Post>, StoreError> {
        Err(StoreError::Database("store accessed".into()))
    }
    async fn post_exists(&self, _: Uuid) -> Result<bool, StoreError> {
        Err(StoreError::Database("store accessed".into()))
    }
    async fn comment_exists(&self, _: Uuid) -> Result<bool, StoreError> {
        Err(StoreError::Database("store accessed".into()))
    }
    async fn create_comment(&self, _: Uuid, _: &NewComment) -> Result<Uuid, StoreError> {
        Err(StoreError::Database("store accessed".into()))
    }
}

fn post(id: Uuid) -> Post {
    Post {
        id,
        title: "Show r/rust: a tiny allocator".into(),
        content: serde_json::json!({ "blocks": [{ "type": "paragraph", "data": { "text": "body" } }] }),
        author_id: Uuid::new_v4(),
        author_username: Some("ferris".into()),
        created_at: datetime!(2024-05-10 08:00:00 UTC),
        votes: Vec::new(),
    }
}

struct Fixture {
    store: Arc<MemoryVoteStore>,
    cache: Arc<CountingCache>,
    processor: VoteProcessor,
    post_id: Uuid,
}

fn fixture_with(config: VoteConfig) -> Fixture {
    init_tracing();
    let store = Arc::new(MemoryVoteStore::new());
    let cache = Arc::new(CountingCache::default());
    let post_id = Uuid::new_v4();
    store.insert_post(post(post_id)).unwrap();
    let processor = VoteProcessor::new(store.clone(), cache.clone(), config);
    Fixture { store, cache, processor, post_id }
}

fn fixture() -> Fixture {
    fixture_with(VoteConfig::default())
}

async fn snapshot(cache: &CountingCache, post_id: Uuid) -> Option<CachedPost> {
    cache.read_snapshot(&CachedPost::cache_key(post_id)).await.unwrap()
        .map(|fields| CachedPost::from_fields(&fields).unwrap())
}

#[tokio::test]
async fn test_first_upvote_creates_and_caches() {
    let f = fixture();
    let alice = Uuid::new_v4();

    let outcome = f.processor.cast_post_vote(alice, f.post_id, VoteType::Up).await.unwrap();
    assert_eq!(outcome.transition, VoteTransition::Create);
    assert_eq!(outcome.score, Some(1));
    assert!(outcome.cached);

    let cached = snapshot(&f.cache, f.post_id).await.expect("snapshot written");
    assert_eq!(cached.current_vote, VoteType::Up);
    assert_eq!(cached.votes_amt, 1);
    assert_eq!(cached.title, "Show r/rust: a tiny allocator");
    assert_eq!(cached.author_user_name, "ferris");
    assert_eq!(cached.id, f.post_id);
}

#[tokio::test]
async fn test_same_direction_twice_toggles_off_and_leaves_cache_stale() {
    let f = fixture();
    let alice = Uuid::new_v4();

    f.processor.cast_post_vote(alice, f.post_id, VoteType::Up).await.unwrap();
    let outcome = f.processor.cast_post_vote(alice, f.post_id, VoteType::Up).await.unwrap();

    assert_eq!(outcome.transition, VoteTransition::Remove);
    assert_eq!(outcome.score, None);
    assert!(!outcome.cached);
    assert!(f.store.find_vote(alice, VoteTarget::Post(f.post_id)).await.unwrap().is_none());

    let tally = f.processor.post_tally(f.post_id, Some(alice)).await.unwrap();
    assert_eq!(tally, PostTally { votes_amt: 0, current_vote: None });

    assert_eq!(f.cache.writes(), 1);
    assert_eq!(snapshot(&f.cache, f.post_id).await.unwrap().votes_amt, 1);
}

#[tokio::test]
async fn test_toggle_off_is_not_idempotent() {
    let f = fixture();
    let alice = Uuid::new_v4();

    f.processor.cast_post_vote(alice, f.post_id, VoteType::Down).await.unwrap();
    f.processor.cast_post_vote(alice, f.post_id, VoteType::Down).await.unwrap();
    let outcome = f.processor.cast_post_vote(alice, f.post_id, VoteType::Down).await.unwrap();

    assert_eq!(outcome.transition, VoteTransition::Create);
    assert_eq!(outcome.score, Some(-1));
}

#[tokio::test]
async fn test_flip_direction_updates_single_vote() {
    let f = fixture();
    let alice = Uuid::new_v4();

    f.processor.cast_post_vote(alice, f.post_id, VoteType::Up).await.unwrap();
    let outcome = f.processor.cast_post_vote(alice, f.post_id, VoteType::Down).await.unwrap();

    assert_eq!(outcome.transition, VoteTransition::Update);
    assert_eq!(outcome.score, Some(-1));
    assert!(!outcome.cached);
    assert_eq!(f.store.vote_count(VoteTarget::Post(f.post_id)).unwrap(), 1);
    let vote = f.store.find_vote(alice, VoteTarget::Post(f.post_id)).await.unwrap().unwrap();
    assert_eq!(vote.vote_type, VoteType::Down);
}

#[tokio::test]
async fn test_flip_reaching_threshold_rewrites_snapshot() {
    let f = fixture();
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    f.processor.cast_post_vote(bob, f.post_id, VoteType::Down).await.unwrap();
    f.processor.cast_post_vote(alice, f.post_id, VoteType::Up).await.unwrap();
    assert_eq!(f.cache.writes(), 0);

    let outcome = f.processor.cast_post_vote(bob, f.post_id, VoteType::Up).await.unwrap();
    assert_eq!(outcome.transition, VoteTransition::Update);
    assert_eq!(outcome.score, Some(2));
    assert!(outcome.cached);

    let cached = snapshot(&f.cache, f.post_id).await.unwrap();
    assert_eq!(cached.current_vote, VoteType::Up);
    assert_eq!(cached.votes_amt, 2);
}

#[tokio::test]
async fn test_score_below_threshold_skips_cache() {
    let f = fixture();
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    f.processor.cast_post_vote(alice, f.post_id, VoteType::Up).await.unwrap();
    assert_eq!(f.cache.writes(), 1);

    let outcome = f.processor.cast_post_vote(bob, f.post_id, VoteType::Down).await.unwrap();
    assert_eq!(outcome.score, Some(0));
    assert!(!outcome.cached);
    assert_eq!(f.cache.writes(), 1);
}

#[tokio::test]
async fn test_score_counts_current_votes_only() {
    let f = fixture();
    let voters: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();

    for voter in &voters {
        f.processor.cast_post_vote(*voter, f.post_id, VoteType::Up).await.unwrap();
    }
    f.processor.cast_post_vote(voters[0], f.post_id, VoteType::Down).await.unwrap();
    f.processor.cast_post_vote(voters[1], f.post_id, VoteType::Up).await.unwrap();

    let outcome = f.processor.cast_post_vote(voters[2], f.post_id, VoteType::Down).await.unwrap();
    assert_eq!(outcome.score, Some(-1));

    let tally = f.processor.post_tally(f.post_id, Some(voters[3])).await.unwrap();
    assert_eq!(tally.votes_amt, -1);
    assert_eq!(tally.current_vote, Some(VoteType::Up));
}

#[tokio::test]
async fn test_missing_post_is_not_found_without_mutation() {
    let f = fixture();
    let carol = Uuid::new_v4();
    let missing = Uuid::new_v4();

    let err = f.processor.cast_post_vote(carol, missing, VoteType::Up).await.unwrap_err();
    assert!(matches!(err, VoteError::PostNotFound));
    assert_eq!(f.store.vote_count(VoteTarget::Post(missing)).unwrap(), 0);
    assert_eq!(f.cache.writes(), 0);
}

#[tokio::test]
async fn test_malformed_direction_fails_before_store_access() {
    let processor = VoteProcessor::new(
        Arc::new(UnreachableStore),
        Arc::new(MemorySnapshotCache::new()),
        VoteConfig::default(),
    );
    let request = PostVoteRequest { post_id: Uuid::new_v4().to_string(), vote_type: "SIDEWAYS".into() };

    let err = processor.apply_post_vote(Uuid::new_v4(), &request).await.unwrap_err();
    assert!(matches!(err, VoteError::Validation(ValidationError::InvalidVoteType(_))));
}

#[tokio::test]
async fn test_cache_failure_is_swallowed() {
    init_tracing();
    let store = Arc::new(MemoryVoteStore::new());
    let post_id = Uuid::new_v4();
    store.insert_post(post(post_id)).unwrap();
    let processor = VoteProcessor::new(store.clone(), Arc::new(FailingCache), VoteConfig::default());
    let alice = Uuid::new_v4();

    let outcome = processor.cast_post_vote(alice, post_id, VoteType::Up).await.unwrap();
    assert_eq!(outcome.score, Some(1));
    assert!(!outcome.cached);
    assert!(store.find_vote(alice, VoteTarget::Post(post_id)).await.unwrap().is_some());

    let view = processor.post_view(post_id).await.unwrap();
    assert_eq!(view.source, ViewSource::Store);
}

#[tokio::test]
async fn test_custom_threshold() {
    let f = fixture_with(VoteConfig { promotion_threshold: 2, ..VoteConfig::default() });
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

    assert!(!f.processor.cast_post_vote(alice, f.post_id, VoteType::Up).await.unwrap().cached);
    let outcome = f.processor.cast_post_vote(bob, f.post_id, VoteType::Up).await.unwrap();
    assert!(outcome.cached);

    let cached = snapshot(&f.cache, f.post_id).await.unwrap();
    assert_eq!(cached.votes_amt, 2);
}

#[tokio::test]
async fn test_evict_on_toggle_off() {
    let f = fixture_with(VoteConfig { evict_on_toggle_off: true, ..VoteConfig::default() });
    let alice = Uuid::new_v4();

    f.processor.cast_post_vote(alice, f.post_id, VoteType::Up).await.unwrap();
    assert!(snapshot(&f.cache, f.post_id).await.is_some());

    f.processor.cast_post_vote(alice, f.post_id, VoteType::Up).await.unwrap();
    assert!(snapshot(&f.cache, f.post_id).await.is_none());
}

#[tokio::test]
async fn test_duplicate_create_is_rejected_by_store() {
    let f = fixture();
    let alice = Uuid::new_v4();
    let target = VoteTarget::Post(f.post_id);

    f.store.create_vote(alice, target, VoteType::Up).await.unwrap();
    let err = f.store.create_vote(alice, target, VoteType::Down).await.unwrap_err();
    assert!(matches!(err, StoreError::ConstraintViolation(_)));
    assert_eq!(f.store.vote_count(target).unwrap(), 1);
}

#[tokio::test]
async fn test_comment_votes_toggle() {
    let f = fixture();
    let alice = Uuid::new_v4();
    let comment_id = f.processor.post_comment(alice, &new_comment(f.post_id, None)).await.unwrap();
    let request = |vote_type: &str| CommentVoteRequest {
        comment_id: comment_id.to_string(),
        vote_type: vote_type.into(),
    };

    assert_eq!(f.processor.apply_comment_vote(alice, &request("UP")).await.unwrap(), VoteTransition::Create);
    assert_eq!(f.processor.apply_comment_vote(alice, &request("DOWN")).await.unwrap(), VoteTransition::Update);
    assert_eq!(f.processor.apply_comment_vote(alice, &request("DOWN")).await.unwrap(), VoteTransition::Remove);
    assert_eq!(f.store.vote_count(VoteTarget::Comment(comment_id)).unwrap(), 0);
    assert_eq!(f.cache.writes(), 0);
}

#[tokio::test]
async fn test_comment_vote_on_missing_comment() {
    let f = fixture();
    let request = CommentVoteRequest { comment_id: Uuid::new_v4().to_string(), vote_type: "UP".into() };
    let err = f.processor.apply_comment_vote(Uuid::new_v4(), &request).await.unwrap_err();
    assert!(matches!(err, VoteError::CommentNotFound));
}

#[tokio::test]
async fn test_post_view_prefers_cache() {
    let f = fixture();

    let view = f.processor.post_view(f.post_id).await.unwrap();
    assert_eq!(view.source, ViewSource::Store);
    assert_eq!(view.author_user_name, "ferris");

    f.processor.cast_post_vote(Uuid::new_v4(), f.post_id, VoteType::Up).await.unwrap();
    let view = f.processor.post_view(f.post_id).await.unwrap();
    assert_eq!(view.source, ViewSource::Cache);
    assert_eq!(view.id, f.post_id);

    assert!(matches!(f.processor.post_view(Uuid::new_v4()).await, Err(VoteError::PostNotFound)));
}

#[tokio::test]
async fn test_snapshot_visible_to_every_instance_sharing_the_cache() {
    init_tracing();
    let store = Arc::new(MemoryVoteStore::new());
    let cache = Arc::new(MemorySnapshotCache::new());
    let post_id = Uuid::new_v4();
    store.insert_post(post(post_id)).unwrap();
    let first = VoteProcessor::new(store.clone(), cache.clone(), VoteConfig::default());
    let second = VoteProcessor::new(store.clone(), cache.clone(), VoteConfig::default());

    assert!(first.cast_post_vote(Uuid::new_v4(), post_id, VoteType::Up).await.unwrap().cached);
    let view = second.post_view(post_id).await.unwrap();
    assert_eq!(view.source, ViewSource::Cache);
}

#[test]
fn test_empty_hash_reads_as_missing_snapshot() {
    assert_eq!(non_empty(SnapshotFields::new()), None);
    let fields = SnapshotFields::from([("title".to_string(), "t".to_string())]);
    assert_eq!(non_empty(fields.clone()), Some(fields));
}

fn new_comment(post_id: Uuid, reply_to_id: Option<Uuid>) -> NewComment {
    NewComment { post_id, text: "Nice write-up".into(), reply_to_id }
}

#[tokio::test]
async fn test_post_comment_and_reply() {
    let f = fixture();
    let alice = Uuid::new_v4();

    let parent = f.processor.post_comment(alice, &new_comment(f.post_id, None)).await.unwrap();
    let reply = f.processor.post_comment(alice, &new_comment(f.post_id, Some(parent))).await.unwrap();
    assert_ne!(parent, reply);
    assert!(f.store.comment_exists(reply).await.unwrap());

    let err = f.processor.post_comment(alice, &new_comment(Uuid::new_v4(), None)).await.unwrap_err();
    assert!(matches!(err, VoteError::PostNotFound));
    let err = f.processor
        .post_comment(alice, &new_comment(f.post_id, Some(Uuid::new_v4())))
        .await
        .unwrap_err();
    assert!(matches!(err, VoteError::CommentNotFound));
}

#[tokio::test]
async fn test_unreadable_snapshot_falls_back_to_store() {
    let f = fixture();
    let key = CachedPost::cache_key(f.post_id);
    f.cache.write_snapshot(&key, HashMap::from([("title".to_string(), "partial".to_string())])).await.unwrap();

    let view = f.processor.post_view(f.post_id).await.unwrap();
    assert_eq!(view.source, ViewSource::Store);
}

#[test]
fn test_config_from_lookup() {
    let secrets: HashMap<&str, &str> = HashMap::from([
        ("PROMOTION_THRESHOLD", "5"),
        ("EVICT_ON_TOGGLE_OFF", "true"),
        ("VOTE_RATE_LIMIT_ATTEMPTS", "not-a-number"),
    ]);
    let config = VoteConfig::from_lookup(|key| secrets.get(key).map(|v| v.to_string()));

    assert_eq!(config.promotion_threshold, 5);
    assert!(config.evict_on_toggle_off);
    assert_eq!(config.rate_limit_attempts, VoteConfig::default().rate_limit_attempts);
    assert_eq!(VoteConfig::from_lookup(|_| None), VoteConfig::default());
}

struct HttpFixture {
    client: Client,
    store: Arc<MemoryVoteStore>,
    post_id: Uuid,
}

async fn http_fixture(config: VoteConfig) -> HttpFixture {
    init_tracing();
    let store = Arc::new(MemoryVoteStore::new());
    let post_id = Uuid::new_v4();
    store.insert_post(post(post_id)).unwrap();
    let state = AppState::new(store.clone(), Arc::new(MemorySnapshotCache::new()), config);
    let client = Client::tracked(build_rocket(state)).await.expect("valid rocket instance");
    HttpFixture { client, store, post_id }
}

impl HttpFixture {
    async fn patch(&self, uri: &'static str, user: Option<Uuid>, body: String) -> rocket::local::asynchronous::LocalResponse<'_> {
        let mut request = self.client.patch(uri).header(ContentType::JSON).body(body);
        if let Some(user) = user {
            request = request.header(Header::new(USER_ID_HEADER, user.to_string()));
        }
        request.dispatch().await
    }
}

fn vote_body(post_id: &str, vote_type: &str) -> String {
    serde_json::json!({ "postId": post_id, "voteType": vote_type }).to_string()
}

#[tokio::test]
async fn test_http_vote_requires_principal() {
    let h = http_fixture(VoteConfig::default()).await;
    let response = h.client
        .patch("/api/subreddit/post/vote")
        .header(ContentType::JSON)
        .body(vote_body(&h.post_id.to_string(), "UP"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
    let error: ErrorBody = response.into_json().await.unwrap();
    assert_eq!(error.code, ErrorCode::Unauthenticated);
}

#[tokio::test]
async fn test_http_malformed_body_is_rejected_before_auth() {
    let h = http_fixture(VoteConfig::default()).await;

    let response = h.patch("/api/subreddit/post/vote", None, vote_body(&h.post_id.to_string(), "SIDEWAYS")).await;
    assert_eq!(response.status(), Status::UnprocessableEntity);

    let response = h.patch("/api/subreddit/post/vote", None, "{\"postId\": 42".to_string()).await;
    assert_eq!(response.status(), Status::UnprocessableEntity);
    let error: ErrorBody = response.into_json().await.unwrap();
    assert_eq!(error.code, ErrorCode::ValidationFailed);
    assert_eq!(error.message, "Invalid vote request data passed.");
}

#[tokio::test]
async fn test_http_vote_round_trip() {
    let h = http_fixture(VoteConfig::default()).await;
    let alice = Uuid::new_v4();

    let response = h.client
        .patch("/api/subreddit/post/vote")
        .header(ContentType::JSON)
        .header(Header::new(USER_ID_HEADER, alice.to_string()))
        .body(vote_body(&h.post_id.to_string(), "UP"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.into_string().await.as_deref(), Some("OK"));
    assert!(h.store.find_vote(alice, VoteTarget::Post(h.post_id)).await.unwrap().is_some());

    let response = h.client
        .get(format!("/api/subreddit/post/{}/votes", h.post_id))
        .header(Header::new(USER_ID_HEADER, alice.to_string()))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let tally: PostTally = response.into_json().await.unwrap();
    assert_eq!(tally, PostTally { votes_amt: 1, current_vote: Some(VoteType::Up) });

    let response = h.client.get(format!("/api/subreddit/post/{}", h.post_id)).dispatch().await;
    let view: PostView = response.into_json().await.unwrap();
    assert_eq!(view.source, ViewSource::Cache);
}

#[tokio::test]
async fn test_http_error_statuses() {
    let h = http_fixture(VoteConfig::default()).await;
    let alice = Header::new(USER_ID_HEADER, Uuid::new_v4().to_string());

    let response = h.client
        .patch("/api/subreddit/post/vote")
        .header(ContentType::JSON)
        .header(alice.clone())
        .body(vote_body(&h.post_id.to_string(), "SIDEWAYS"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::UnprocessableEntity);
    let error: shared::error::Error = response.into_json().await.unwrap();
    assert_eq!(error.code, shared::error::ErrorCode::ValidationFailed);

    let response = h.client
        .patch("/api/subreddit/post/vote")
        .header(ContentType::JSON)
        .header(alice.clone())
        .body(vote_body(&Uuid::new_v4().to_string(), "UP"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    let response = h.client.get("/api/subreddit/post/not-a-uuid/votes").dispatch().await;
    assert_eq!(response.status(), Status::BadRequest);
}

#[tokio::test]
async fn test_http_rate_limit() {
    let h = http_fixture(VoteConfig { rate_limit_attempts: 1, ..VoteConfig::default() }).await;
    let alice = Header::new(USER_ID_HEADER, Uuid::new_v4().to_string());

    for expected in [Status::Ok, Status::TooManyRequests] {
        let response = h.client
            .patch("/api/subreddit/post/vote")
            .header(ContentType::JSON)
            .header(alice.clone())
            .body(vote_body(&h.post_id.to_string(), "UP"))
            .dispatch()
            .await;
        assert_eq!(response.status(), expected);
    }
}

#[tokio::test]
async fn test_http_rate_limit_ignores_id_padding() {
    let h = http_fixture(VoteConfig { rate_limit_attempts: 1, ..VoteConfig::default() }).await;
    let alice = Uuid::new_v4();

    let mut statuses = Vec::new();
    for padding in ["", " ", "  ", "   "] {
        let post_id = format!("{}{}{}", padding, h.post_id, padding);
        let response = h.patch("/api/subreddit/post/vote", Some(alice), vote_body(&post_id, "UP")).await;
        statuses.push(response.status());
    }
    assert_eq!(statuses, [Status::Ok, Status::TooManyRequests, Status::TooManyRequests, Status::TooManyRequests]);
}

#[tokio::test]
async fn test_http_store_failure_is_500_with_generic_message() {
    init_tracing();
    let state = AppState::new(Arc::new(UnreachableStore), Arc::new(MemorySnapshotCache::new()), VoteConfig::default());
    let client = Client::tracked(build_rocket(state)).await.expect("valid rocket instance");

    let response = client
        .patch("/api/subreddit/post/vote")
        .header(ContentType::JSON)
        .header(Header::new(USER_ID_HEADER, Uuid::new_v4().to_string()))
        .body(vote_body(&Uuid::new_v4().to_string(), "UP"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::InternalServerError);
    let error: ErrorBody = response.into_json().await.unwrap();
    assert_eq!(error.code, ErrorCode::SystemError);
    assert_eq!(error.message, VOTE_FAILED_MESSAGE);
}

fn comment_body(post_id: Uuid, text: &str, reply_to_id: Option<Uuid>) -> String {
    serde_json::json!({ "postId": post_id, "text": text, "replyToId": reply_to_id }).to_string()
}

#[tokio::test]
async fn test_http_create_comment_then_vote_on_it() {
    let h = http_fixture(VoteConfig::default()).await;
    let alice = Uuid::new_v4();

    let response = h.patch("/api/subreddit/post/comment", None, comment_body(h.post_id, "first!", None)).await;
    assert_eq!(response.status(), Status::Unauthorized);

    let response = h.patch("/api/subreddit/post/comment", None, comment_body(h.post_id, "   ", None)).await;
    assert_eq!(response.status(), Status::UnprocessableEntity);

    let response = h.patch("/api/subreddit/post/comment", Some(alice), comment_body(h.post_id, "first!", None)).await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.into_string().await.as_deref(), Some("OK"));

    let response = h.patch("/api/subreddit/post/comment", Some(alice), comment_body(Uuid::new_v4(), "lost", None)).await;
    assert_eq!(response.status(), Status::NotFound);

    let comment_id = h.store.comment_ids().unwrap().pop().expect("comment stored");
    let body = serde_json::json!({ "commentId": comment_id, "voteType": "DOWN" }).to_string();
    let response = h.patch("/api/subreddit/comment/vote", Some(alice), body).await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(h.store.vote_count(VoteTarget::Comment(comment_id)).unwrap(), 1);
}

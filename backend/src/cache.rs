use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::collections::HashMap;
use std::sync::Mutex;

pub type SnapshotFields = HashMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache lock poisoned")]
    LockFailed,
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// Fast-read cache of post snapshots. Never a source of truth: entries may be
/// stale, and callers treat every failure as non-fatal.
#[async_trait]
pub trait SnapshotCache: Send + Sync {
    /// Merges `fields` into the hash stored under `key`, field by field.
    async fn write_snapshot(&self, key: &str, fields: SnapshotFields) -> Result<(), CacheError>;
    async fn read_snapshot(&self, key: &str) -> Result<Option<SnapshotFields>, CacheError>;
    async fn evict_snapshot(&self, key: &str) -> Result<(), CacheError>;
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::Unavailable(e.to_string())
    }
}

/// Redis-backed cache shared by every instance of the service. Snapshots are
/// hashes: HSET merges fields, HGETALL reads them back, DEL evicts.
#[derive(Clone)]
pub struct RedisSnapshotCache {
    connection: ConnectionManager,
}

impl RedisSnapshotCache {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = Client::open(redis_url)?;
        let connection = client.get_connection_manager().await?;
        Ok(Self { connection })
    }
}

/// HGETALL answers an empty hash for a missing key.
pub(crate) fn non_empty(fields: SnapshotFields) -> Option<SnapshotFields> {
    (!fields.is_empty()).then_some(fields)
}

#[async_trait]
impl SnapshotCache for RedisSnapshotCache {
    async fn write_snapshot(&self, key: &str, fields: SnapshotFields) -> Result<(), CacheError> {
        if fields.is_empty() {
            return Ok(());
        }
        let items: Vec<(String, String)> = fields.into_iter().collect();
        let mut connection = self.connection.clone();
        let () = connection.hset_multiple(key, items.as_slice()).await?;
        Ok(())
    }

    async fn read_snapshot(&self, key: &str) -> Result<Option<SnapshotFields>, CacheError> {
        let mut connection = self.connection.clone();
        let fields: SnapshotFields = connection.hgetall(key).await?;
        Ok(non_empty(fields))
    }

    async fn evict_snapshot(&self, key: &str) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        let () = connection.del(key).await?;
        Ok(())
    }
}

pub type SnapshotStore = Mutex<HashMap<String, SnapshotFields>>;

/// Process-local cache for tests; nothing is shared between instances.
#[derive(Debug, Default)]
pub struct MemorySnapshotCache {
    entries: SnapshotStore,
}

impl MemorySnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotCache for MemorySnapshotCache {
    async fn write_snapshot(&self, key: &str, fields: SnapshotFields) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::LockFailed)?;
        entries.entry(key.to_string()).or_default().extend(fields);
        Ok(())
    }

    async fn read_snapshot(&self, key: &str) -> Result<Option<SnapshotFields>, CacheError> {
        let entries = self.entries.lock().map_err(|_| CacheError::LockFailed)?;
        Ok(entries.get(key).cloned())
    }

    async fn evict_snapshot(&self, key: &str) -> Result<(), CacheError> {
        self.entries.lock().map_err(|_| CacheError::LockFailed)?.remove(key);
        Ok(())
    }
}

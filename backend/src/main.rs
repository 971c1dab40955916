use backend::{
    cache::RedisSnapshotCache,
    config::VoteConfig,
    queries::PgVoteStore,
    routes::{build_rocket, AppState},
};
use shuttle_runtime::CustomError;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

const REDIS_URL_KEY: &str = "REDIS_URL";

#[shuttle_runtime::main]
async fn rocket(
    #[shuttle_shared_db::Postgres] pool: PgPool,
    #[shuttle_runtime::Secrets] secret_store: shuttle_runtime::SecretStore,
) -> shuttle_rocket::ShuttleRocket {
    info!("🚀 Starting vote server");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(CustomError::new)?;

    info!("📋 Migrations complete");

    let config = VoteConfig::from_lookup(|key| secret_store.get(key));
    info!(
        "⚙️ Promotion threshold {}, evict on toggle-off: {}",
        config.promotion_threshold, config.evict_on_toggle_off
    );

    let redis_url = secret_store
        .get(REDIS_URL_KEY)
        .ok_or_else(|| CustomError::msg(format!("{} secret is not set", REDIS_URL_KEY)))?;
    let cache = RedisSnapshotCache::connect(&redis_url)
        .await
        .map_err(CustomError::new)?;

    info!("🗄️ Snapshot cache connected");

    let app_state = AppState::new(
        Arc::new(PgVoteStore::new(pool)),
        Arc::new(cache),
        config,
    );

    Ok(build_rocket(app_state).into())
}

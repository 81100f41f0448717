use std::sync::Arc;

use media_review::{
    config::Config,
    db::{create_pool, create_redis_client, run_migrations, Cache, PgStore, RedisCache},
    routes::{create_router, AppState},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(&config).await?;
    run_migrations(&pool).await?;
    let store = Arc::new(PgStore::new(pool));

    let cache = if config.cache_enabled {
        let client = create_redis_client(&config.redis_url)?;
        Cache::new(Arc::new(RedisCache::new(client)), config.cache_ttl_secs)
    } else {
        tracing::info!("Listing cache disabled");
        Cache::disabled()
    };

    let state = Arc::new(AppState::new(store, cache, &config));
    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

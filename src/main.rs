use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use marquee::{
    config::{Config, StorageBackend},
    db::{
        create_pool, create_redis_client, run_migrations, Cache, CacheWriterHandle,
        FavoritesStore, InMemoryFavoritesStore, PgFavoritesStore,
    },
    routes::{cors_layer, create_router, AppState},
    services::OmdbSearcher,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("marquee=debug,tower_http=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let favorites = build_favorites_store(&config).await?;
    let (cache, cache_writer) = build_search_cache(&config).await?;
    let searcher = OmdbSearcher::new(
        config.omdb_api_key.clone(),
        config.omdb_api_url.clone(),
        cache,
    )?;

    let state = AppState::new(favorites, Arc::new(searcher));
    let app = create_router(state).layer(cors_layer(&config.frontend_url)?);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %listener.local_addr()?, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn build_favorites_store(config: &Config) -> anyhow::Result<Arc<dyn FavoritesStore>> {
    match (config.storage_backend, config.database_url.as_deref()) {
        (StorageBackend::Postgres, Some(database_url)) => {
            let pool = create_pool(database_url).await?;
            run_migrations(&pool).await?;
            tracing::info!("Using Postgres favorites store");
            Ok(Arc::new(PgFavoritesStore::new(pool)))
        }
        (StorageBackend::Postgres, None) => {
            anyhow::bail!("DATABASE_URL is required when STORAGE_BACKEND=postgres")
        }
        (StorageBackend::Memory, _) => {
            tracing::warn!("Using in-memory favorites store; favorites are lost on restart");
            Ok(Arc::new(InMemoryFavoritesStore::new()))
        }
    }
}

async fn build_search_cache(
    config: &Config,
) -> anyhow::Result<(Option<Cache>, Option<CacheWriterHandle>)> {
    let Some(redis_url) = config.redis_url.as_deref() else {
        tracing::info!("REDIS_URL not set, search results will not be cached");
        return Ok((None, None));
    };

    let client = create_redis_client(redis_url)?;
    let (cache, writer) = Cache::new(client).await?;
    Ok((Some(cache), Some(writer)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

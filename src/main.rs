mod cache;
mod config;
mod db;
mod entities;
mod error;
mod models;
mod repository;
mod routes;
mod services;

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    cache::{Cache, MemoryCache, RedisCache},
    config::Config,
    repository::{SeaDirectorRepository, SeaMovieRepository},
    services::{DirectorService, MovieService},
};

pub struct AppState {
    pub movies: MovieService,
    pub directors: DirectorService,
}

impl AppState {
    pub fn new(db: DatabaseConnection, cache: Arc<dyn Cache>, cache_ttl_seconds: u64) -> Self {
        let movie_repo = Arc::new(SeaMovieRepository::new(db.clone()));
        let director_repo = Arc::new(SeaDirectorRepository::new(db));

        Self {
            movies: MovieService::new(
                movie_repo.clone(),
                director_repo.clone(),
                cache.clone(),
                cache_ttl_seconds,
            ),
            directors: DirectorService::new(director_repo, movie_repo, cache, cache_ttl_seconds),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,reelbase=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let db = db::connect_and_migrate(&config.database_url).await?;

    let cache: Arc<dyn Cache> = match config.redis_url.as_deref() {
        Some(url) => Arc::new(RedisCache::connect(url).await?),
        None => {
            tracing::warn!("REDIS_URL not set, using in-process cache");
            Arc::new(MemoryCache::new())
        },
    };

    let state = Arc::new(AppState::new(db.clone(), cache, config.cache_ttl_seconds));

    let app = routes::router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("shutting down, closing database pool");
    db.close().await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

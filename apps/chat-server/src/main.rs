use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{routing::get, Router};
use prometheus::Registry;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

use chat_core::repositories::{ConversationCache, ConversationRepository};
use chat_core::services::{CachePolicy, ConversationService, ServiceMetrics};
use chat_infrastructure::{
    create_pool, create_redis_pool, run_migrations, MemoryConversationCache, PgConversationRepository,
    RedisConversationCache,
};
use chat_shared::config::AppConfig;

mod handlers;
mod state;

use handlers::health;
use state::AppState;

const PURGE_INTERVAL: Duration = Duration::from_secs(600);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (.env is read inside)
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize telemetry; the guard flushes file logs on exit
    let _log_guard = chat_shared::telemetry::init_telemetry(&config.log)?;

    info!("{} starting ({})...", config.app.name, config.app.env);

    // Connect to Database
    let pool = create_pool(&config.database).await?;
    run_migrations(&pool).await?;
    let repository: Arc<dyn ConversationRepository> = Arc::new(PgConversationRepository::new(pool.clone()));

    // Cache: Redis when configured, in-process otherwise
    let mut redis_pool = None;
    let cache: Arc<dyn ConversationCache> = if config.redis.url.trim().is_empty() {
        warn!("No Redis URL configured, using the in-process cache");
        let memory = MemoryConversationCache::new();
        spawn_purge_task(memory.clone());
        Arc::new(memory)
    } else {
        let pool = create_redis_pool(&config.redis.url, config.redis.max_connections)?;
        redis_pool = Some(pool.clone());
        Arc::new(RedisConversationCache::new(pool))
    };

    // Metrics
    let registry = Registry::new();
    let metrics = ServiceMetrics::new(&registry)?;

    let service = ConversationService::new(repository, cache, CachePolicy::from(&config.cache), metrics);
    let state = AppState {
        service: Arc::new(service),
        registry,
    };

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(10))),
        );

    // Bind address
    let host: std::net::IpAddr = config.app.host.parse()?;
    let addr = SocketAddr::from((host, config.app.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Closing connection pools...");
    pool.close().await;
    if let Some(redis_pool) = redis_pool {
        redis_pool.close();
    }
    info!("Shutdown complete");

    Ok(())
}

fn spawn_purge_task(cache: MemoryConversationCache) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            cache.purge_expired();
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

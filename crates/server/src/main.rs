//! Yatube server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{Router, extract::DefaultBodyLimit};
use fred::prelude::*;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yatube_api::AppState;
use yatube_common::{
    Config, LocalStorage, MemoryPageCache, PageCache, RedisPageCache, StorageBackend,
};
use yatube_core::{
    CommentService, FollowService, GroupService, Paginator, PostService, UserService,
};
use yatube_db::repositories::{
    CommentRepository, FollowRepository, GroupRepository, PostRepository, UserProfileRepository,
    UserRepository,
};

/// Key prefix of cached home feed pages.
const INDEX_CACHE_PREFIX: &str = "index_page";

/// Largest accepted request body; post images are the biggest uploads.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Home feed cache: shared through Redis when configured, else in memory.
async fn build_index_cache(config: &Config) -> anyhow::Result<PageCache> {
    let ttl = Duration::from_secs(config.cache.index_ttl_secs);

    let Some(redis) = &config.redis else {
        let max_entries = config.cache.max_entries;
        info!(ttl_secs = ttl.as_secs(), max_entries, "Using in-memory page cache");
        let backend = MemoryPageCache::with_max_entries(max_entries);
        return Ok(PageCache::new(Arc::new(backend), INDEX_CACHE_PREFIX, ttl));
    };

    info!("Connecting to Redis...");
    let fred_config =
        fred::types::config::Config::from_url(&redis.url).context("Invalid Redis URL")?;
    let client = fred::clients::Client::new(fred_config, None, None, None);
    client.connect();
    client
        .wait_for_connect()
        .await
        .context("Failed to connect to Redis")?;
    info!(ttl_secs = ttl.as_secs(), "Using Redis page cache");

    let backend = RedisPageCache::new(Arc::new(client), &redis.prefix);
    Ok(PageCache::new(Arc::new(backend), INDEX_CACHE_PREFIX, ttl))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yatube=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting yatube server...");

    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Connect to database
    let db = Arc::new(yatube_db::init(&config).await?);
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    yatube_db::migrate(&db).await?;
    info!("Migrations completed");

    // Uploaded images
    tokio::fs::create_dir_all(&config.media.root)
        .await
        .with_context(|| format!("Failed to create {}", config.media.root.display()))?;
    let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::new(
        config.media.root.clone(),
        config.media.url.clone(),
    ));

    let index_cache = build_index_cache(&config).await?;

    // Initialize repositories
    let user_repo = UserRepository::new(Arc::clone(&db));
    let profile_repo = UserProfileRepository::new(Arc::clone(&db));
    let group_repo = GroupRepository::new(Arc::clone(&db));
    let post_repo = PostRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let follow_repo = FollowRepository::new(Arc::clone(&db));

    // Initialize services
    let user_service = UserService::new(user_repo.clone(), profile_repo, &config);
    let group_service = GroupService::new(group_repo.clone());
    let comment_service =
        CommentService::new(comment_repo, post_repo.clone(), user_repo.clone());
    let post_service = PostService::new(
        post_repo,
        user_repo.clone(),
        group_repo,
        follow_repo.clone(),
        comment_service.clone(),
        storage,
        Paginator::new(config.site.posts_on_page),
    );
    let follow_service = FollowService::new(follow_repo, user_repo, post_service.clone());

    let state = AppState {
        user_service,
        post_service,
        comment_service,
        follow_service,
        group_service,
        index_cache,
    };

    // Build router
    let media_path = format!("/{}", config.media.url.trim_matches('/'));
    let app = Router::new()
        .nest_service(&media_path, ServeDir::new(&config.media.root))
        .merge(yatube_api::app(state))
        .layer(DefaultBodyLimit::disable())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        );

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

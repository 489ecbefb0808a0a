//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; request errors are rendered by each
//! crate's error type.

mod config;

use std::sync::Arc;

use auth::{AuthGateway, TracingAuditSink, auth_router_generic};
use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
};
use directory::store::{FallbackStore, FileStore, InMemoryStore, LocalStore, RemoteKvStore};
use directory::{DirectoryConfig, KvDirectory, location_router_generic, presence_router_generic};
use platform::rate_limit::InMemoryRateLimiter;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{AppConfig, LogFormat};

type Store = FallbackStore<RemoteKvStore, LocalStore>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    init_tracing(LogFormat::from_env());

    let config = AppConfig::from_env()?;

    // Record store: remote primary, local fallback
    let store = Arc::new(build_store(&config).await?);
    let directory = Arc::new(KvDirectory::new(store, DirectoryConfig::default()));

    // Auth gateway
    let limiter = Arc::new(InMemoryRateLimiter::new(config.auth.rate_limit.clone()));
    let gateway = Arc::new(AuthGateway::new(
        Arc::clone(&directory),
        Arc::clone(&limiter),
        &config.auth,
        Arc::new(TracingAuditSink),
    ));

    // Dummy hash for unknown-email logins; failure only costs the first such login
    if let Err(e) = gateway.passwords().warm_up().await {
        tracing::warn!(error = %e, "Password hasher warm-up failed, continuing anyway");
    }

    spawn_rate_limit_purge(Arc::clone(&limiter), config.auth.rate_limit.window);

    // Build router
    let presence = presence_router_generic(Arc::clone(&directory)).route_layer(
        middleware::from_fn_with_state(gateway.tokens().clone(), auth::middleware::require_session),
    );
    let locations = location_router_generic(directory).merge(presence);

    let app = Router::new()
        .nest("/api/auth", auth_router_generic(gateway))
        .nest("/api/locations", locations)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.frontend_origins));

    // Start server
    tracing::info!("Listening on {}", config.bind_addr);

    let listener = TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// `RUST_LOG` wins over the default filter
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "api=info,auth=info,directory=info,platform=info,audit=info,tower_http=info".into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn build_store(config: &AppConfig) -> anyhow::Result<Store> {
    let primary = match &config.remote_kv {
        Some(remote) => {
            tracing::info!(base_url = %remote.base_url, "Using remote record store");
            Some(RemoteKvStore::new(remote.clone())?)
        }
        None => {
            tracing::info!("No remote record store configured, using local store only");
            None
        }
    };

    let fallback = match &config.local_dir {
        Some(dir) => {
            let store = FileStore::open(dir).await?;
            tracing::info!(dir = %dir.display(), "Local record store on disk");
            LocalStore::File(store)
        }
        None => {
            tracing::info!("Local record store in memory; data is lost on restart");
            LocalStore::Memory(InMemoryStore::new())
        }
    };

    Ok(FallbackStore::new(
        primary,
        Some(fallback),
        config.fallback_on_error,
    ))
}

fn spawn_rate_limit_purge(limiter: Arc<InMemoryRateLimiter>, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every.max(std::time::Duration::from_secs(1)));
        loop {
            interval.tick().await;
            let purged = limiter.purge_expired();
            if purged > 0 {
                tracing::debug!(
                    purged,
                    remaining = limiter.tracked_clients(),
                    "Purged rate limit windows"
                );
            }
        }
    });
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .expose_headers([
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderName::from_static("x-ratelimit-remaining"),
            HeaderName::from_static("x-ratelimit-reset"),
            header::RETRY_AFTER,
        ])
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

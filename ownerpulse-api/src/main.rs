//! # OwnerPulse API Server
//!
//! REST backend for the OwnerPulse rental management app: users,
//! properties, bookings and work orders, authenticated with Auth0 access
//! tokens and scoped to the calling owner.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/ownerpulse \
//! AUTH0_DOMAIN=ownerpulse.us.auth0.com \
//! AUTH0_AUDIENCE=https://api.ownerpulse.com \
//! cargo run -p ownerpulse-api
//! ```

use anyhow::Context;
use ownerpulse_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat},
};
use ownerpulse_shared::{
    auth::{
        jwks::{HttpKeySource, JwksCache},
        jwt::TokenVerifier,
    },
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool},
    },
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "ownerpulse_api=debug,ownerpulse_shared=debug,tower_http=debug".into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Resolves on SIGTERM or Ctrl+C
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    init_tracing(config.logging.format);

    tracing::info!(
        "OwnerPulse API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(config.pool_config())
        .await
        .context("Failed to connect to database")?;

    if config.database.run_migrations {
        run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;
    }

    let key_source = HttpKeySource::for_domain(&config.auth.domain, config.jwks_fetch_timeout())?;
    let keys = JwksCache::new(
        Arc::new(key_source),
        config.jwks_cache_ttl(),
        config.jwks_min_refresh_interval(),
    );
    let verifier = TokenVerifier::new(keys, config.verifier_config());

    tracing::info!(
        issuer = %verifier.config().issuer,
        audience = %verifier.config().audience,
        "Token verification configured"
    );

    let bind_address = config.bind_address();
    let state = AppState::new(pool.clone(), config, verifier);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    close_pool(pool).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

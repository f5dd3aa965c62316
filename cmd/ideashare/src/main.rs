//! # IdeaShare Binary
//!
//! Assembles the HTTP server from configuration: picks the store, wires the
//! services and serves until SIGINT or SIGTERM.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use api_adapters::{build_router, AppState, ServiceSettings};
use auth_adapters::jwt::JwtAuthProvider;
use configs::{LogFormat, LoggingSettings, Settings, StorageBackend};
use domains::SystemClock;
use secrecy::ExposeSecret;
use services::{Ports, RetryPolicy};
use storage_adapters::MemoryStore;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings.logging);

    // 1. Storage
    let ports = build_ports(&settings).await?;

    // 2. Identity
    let auth = JwtAuthProvider::new(
        settings.auth.jwt_secret.expose_secret().as_bytes(),
        settings.auth.audience.clone(),
        settings.auth.admin_ids.iter().copied().collect::<HashSet<_>>(),
    );

    // 3. Services
    let state = AppState::new(
        ports,
        Arc::new(auth),
        Arc::new(SystemClock),
        ServiceSettings {
            retry: RetryPolicy {
                max_attempts: settings.retry.max_attempts,
                base_delay: settings.retry.base_delay(),
                max_delay: settings.retry.max_delay(),
            },
            page_size: settings.listing.page_size,
            reference_ttl: settings.listing.reference_cache_ttl(),
        },
    );

    // 4. Serve
    let addr = settings.server.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, backend = ?settings.storage.backend, "IdeaShare listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("server stopped");
    Ok(())
}

fn init_tracing(logging: &LoggingSettings) {
    let filter = logging
        .filter
        .as_deref()
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info,sqlx=warn,tower_http=info"));

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).init(),
    }
}

async fn build_ports(settings: &Settings) -> anyhow::Result<Ports> {
    match settings.storage.backend {
        StorageBackend::Memory => {
            warn!("using the in-memory store; data is lost on restart");
            Ok(Ports::from_store(Arc::new(MemoryStore::new())))
        }
        #[cfg(feature = "db-postgres")]
        StorageBackend::Postgres => {
            let store = storage_adapters::PgStore::connect(
                settings.database.url.expose_secret(),
                settings.database.max_connections,
            )
            .await
            .context("connecting to postgres")?;
            if settings.database.run_migrations {
                store.migrate().await.context("running migrations")?;
            }
            Ok(Ports::from_store(Arc::new(store)))
        }
        #[cfg(not(feature = "db-postgres"))]
        StorageBackend::Postgres => {
            anyhow::bail!("this build has no postgres support; rebuild with --features db-postgres")
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("received SIGTERM, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
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
}

//! # Seed
//!
//! Fills a Postgres store with demo data and prints a bearer token for the
//! demo profile.

mod catalog;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{bail, Context};
use auth_adapters::jwt::JwtAuthProvider;
use configs::{Settings, StorageBackend};
use domains::SystemClock;
use secrecy::ExposeSecret;
use services::{Ports, RetryPolicy};
use storage_adapters::PgStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load().context("loading settings")?;
    if settings.storage.backend != StorageBackend::Postgres {
        bail!("seeding needs storage.backend = postgres; the in-memory store does not outlive this process");
    }

    let store = PgStore::connect(
        settings.database.url.expose_secret(),
        settings.database.max_connections,
    )
    .await
    .context("connecting to postgres")?;
    store.migrate().await.context("running migrations")?;

    let retry = RetryPolicy {
        max_attempts: settings.retry.max_attempts,
        base_delay: settings.retry.base_delay(),
        max_delay: settings.retry.max_delay(),
    };
    let summary = catalog::seed(Ports::from_store(Arc::new(store)), Arc::new(SystemClock), retry)
        .await
        .context("seeding")?;

    let auth = JwtAuthProvider::new(
        settings.auth.jwt_secret.expose_secret().as_bytes(),
        settings.auth.audience.clone(),
        HashSet::new(),
    );
    let token = auth
        .issue_token(catalog::DEMO_USER_ID, chrono::Duration::days(7))
        .context("signing demo token")?;

    println!(
        "seeded {} tags and {} ideas; repaired {} counters",
        summary.tags_created,
        summary.ideas_created,
        summary.reconcile.repaired.len()
    );
    println!("demo user {}: Bearer {token}", catalog::DEMO_USER_ID);
    Ok(())
}

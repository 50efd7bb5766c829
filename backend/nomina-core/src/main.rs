// src/main.rs
use anyhow::Context;
use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod aggregation;
mod areas;
mod attendance;
mod attendance_tests;
mod clock;
mod config;
mod employees;
mod error;
mod exceptions;
mod exceptions_tests;
mod handlers;
mod payroll;
mod shaping;
mod shaping_tests;
mod sqlite_store;
mod store;
mod tardiness;

use crate::clock::SystemClock;
use crate::config::{Args, Config};
use crate::handlers::{build_router, AppState};
use crate::sqlite_store::SqliteStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- Setup ---
    let config = Config::from_env()
        .context("Failed to read configuration from environment")?
        .with_args(Args::parse());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Database ---
    let store = SqliteStore::connect(&config.database_url, config.db_max_connections)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_url))?;
    store.migrate().await.context("Failed to create schema")?;

    // --- Router ---
    let addr = config
        .socket_addr()
        .context("Invalid SERVER_HOST/SERVER_PORT")?;
    let tls_paths = config
        .tls_paths()
        .map(|(cert, key)| (cert.clone(), key.clone()));
    if config.api_token().is_none() {
        info!("API_TOKEN not set, /api routes are open");
    }

    let state = AppState {
        store: Arc::new(store),
        config: Arc::new(config),
        clock: Arc::new(SystemClock),
    };
    let app = build_router(state);

    // --- Run Web Server ---
    match tls_paths {
        Some((cert_path, key_path)) => {
            let tls_config = RustlsConfig::from_pem_file(&cert_path, &key_path)
                .await
                .with_context(|| {
                    format!(
                        "Failed to load TLS cert/key from {} and {}",
                        cert_path.display(),
                        key_path.display()
                    )
                })?;
            info!("Starting server on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            info!("Starting server on http://{}", addr);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

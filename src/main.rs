use actix::prelude::*;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{anyhow, Context};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tedarik_portal::actors::{CoordinatorActor, GetHandles, Shutdown};
use tedarik_portal::api::{self, AppState};
use tedarik_portal::config::{Config, StorageBackend};
use tedarik_portal::metrics::Metrics;
use tedarik_portal::services::Services;
use tedarik_portal::store::{postgres, Stores};
use tedarik_portal::utils::{retry_transient, Backoff};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tedarik_portal=debug"))
        )
        .init();

    tracing::info!("🚀 Starting Tedarik Portal");

    let config = Config::load()?;

    // === 1. Storage ===
    let stores = match config.storage {
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store, data is lost on restart");
            Stores::memory()
        }
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .clone()
                .ok_or_else(|| anyhow!("DATABASE_URL is not set"))?;
            let url = url.as_str();
            let max_connections = config.db_max_connections;

            tracing::info!("Connecting to Postgres...");
            let pool = retry_transient(&Backoff::startup(), "postgres_connect", move |_| {
                postgres::connect(url, max_connections)
            })
            .await
            .context("Could not connect to Postgres")?;
            postgres::apply_schema(&pool).await.context("Could not apply the database schema")?;
            Stores::postgres(pool)
        }
    };

    // === 2. Metrics and services ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    let services = Services::new(stores, metrics.clone());

    if let Some(ref email) = config.bootstrap_admin_email {
        services
            .users
            .ensure_bootstrap_admin(email)
            .await
            .map_err(|e| anyhow!("Bootstrap admin could not be created: {}", e))?;
    }

    // === 3. Background actors ===
    tracing::info!("Starting coordinator actor");
    let coordinator = CoordinatorActor::new(services.clone(), config.relay()).start();
    let handles = coordinator
        .send(GetHandles)
        .await?
        .ok_or_else(|| anyhow!("Coordinator did not start its child actors"))?;

    // === 4. HTTP server ===
    let state = web::Data::new(AppState { services, handles });
    let metrics = web::Data::new(metrics);
    let (host, port) = config.bind_address();
    tracing::info!("🌐 HTTP server listening on {}:{}", host, port);

    let served = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .app_data(metrics.clone())
            .configure(api::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await;

    tracing::info!("HTTP server stopped, shutting down actors");
    coordinator.send(Shutdown).await?;

    served?;
    Ok(())
}

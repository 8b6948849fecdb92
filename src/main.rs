mod config;
mod db;
mod domain;
mod error;
mod middleware;
mod services;
mod state;
mod web;

use crate::config::AppConfig;
use crate::db::seed;
use crate::state::{AppState, SharedState};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!("Loaded configuration: {:?}", config);

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to run database migrations: {}", e);
            e
        })?;
    tracing::info!("Database migrations completed");

    seed::seed_admin(&pool, &config.admin_email, &config.admin_password).await?;

    let bind_addr = config.bind_addr.clone();
    let shared: SharedState = Arc::new(AppState::new(pool, config));

    // Catch-up pass so cycles that expired while the service was down close now
    let today = chrono::Utc::now().date_naive();
    if let Err(e) = services::cycles::close_expired(&shared.pool, today).await {
        tracing::error!("Initial cycle auto-close failed: {}", e);
    }

    let scheduler = JobScheduler::new().await?;

    let shared_for_cycles = shared.clone();
    scheduler
        .add(Job::new_async("0 0 * * * *", move |_uuid, _l| {
            let state = shared_for_cycles.clone();
            Box::pin(async move {
                let today = chrono::Utc::now().date_naive();
                if let Err(e) = services::cycles::close_expired(&state.pool, today).await {
                    tracing::error!("Failed to auto-close expired cycles: {}", e);
                }
            })
        })?)
        .await?;

    let shared_for_throttle = shared.clone();
    scheduler
        .add(Job::new_async("0 */10 * * * *", move |_uuid, _l| {
            let state = shared_for_throttle.clone();
            Box::pin(async move {
                state.login_throttle.cleanup().await;
            })
        })?)
        .await?;

    scheduler.start().await?;
    tracing::info!("Scheduler started:");
    tracing::info!("  - Cycle auto-close: hourly");
    tracing::info!("  - Login throttle cleanup: every 10 min");

    let app = Router::new()
        .merge(web::routes(shared))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {bind_addr}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

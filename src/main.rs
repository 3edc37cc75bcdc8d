use anyhow::{Context, Result};
use dotenvy::dotenv;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod controllers;
mod crypto;
mod db_ops;
mod errors;
mod extractors;
mod middleware;
mod models;
mod notes;
mod pw;
mod reminders;
mod routes;
mod session;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weekly_reminder=info,tower_http=info".into()),
        )
        .init();

    let config = Arc::new(config::Config::from_env()?);
    let db = create_pg_pool(&config).await?;
    sqlx::migrate!()
        .run(&db)
        .await
        .context("cannot apply database migrations")?;

    let store = Arc::new(db_ops::pg::PgStore::new(db));
    let state = models::AppState {
        notes: store.clone(),
        users: store,
        config: config.clone(),
    };

    tokio::spawn(reminders::run(
        Arc::new(reminders::StoreReminders::new(
            state.notes.clone(),
            config.reminder_lookahead,
        )),
        config.reminder_poll_interval,
    ));

    let app = routes::app(state);

    info!(
        "listening on {} ({})",
        config.listen_addr,
        config.environment.as_str()
    );
    axum::Server::bind(&config.listen_addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn create_pg_pool(config: &config::Config) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("pool to be able to connect")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("cannot listen for ctrl-c: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("cannot listen for SIGTERM: {e}");
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

    info!("shutting down");
}

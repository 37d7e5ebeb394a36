mod config;

use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use pigeon_api::storage::UploadStore;
use pigeon_api::{AppState, AppStateInner};
use pigeon_db::Database;
use pigeon_log::MessageLog;

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pigeon_server=debug,pigeon_api=debug,pigeon_db=info,pigeon_log=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let config = ServerConfig::from_env()?;
    if config.has_placeholder_secret() {
        warn!("PIGEON_JWT_SECRET is unset or a placeholder; tokens are forgeable");
    }

    // Init stores
    let db = Database::open(&config.db_path)?;
    let messages = MessageLog::new(&config.messages_path, config.retention)?;
    let uploads = UploadStore::new(config.upload_dir.clone(), "static/uploads/").await?;
    let avatars = UploadStore::new(config.avatar_dir.clone(), "/static/avatars/").await?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        messages,
        uploads,
        avatars,
        jwt_secret: config.jwt_secret.clone(),
    });

    let app = Router::new()
        .merge(pigeon_api::router(state))
        .route("/health", get(|| async { "ok" }))
        .nest_service("/static/uploads", ServeDir::new(&config.upload_dir))
        .nest_service("/static/avatars", ServeDir::new(&config.avatar_dir))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("Pigeon server listening on {}", addr);
    info!(
        "Messages: {} (retention {} hours)",
        config.messages_path.display(),
        config.retention.num_hours()
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}

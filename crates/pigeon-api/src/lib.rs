pub mod auth;
pub mod error;
pub mod files;
pub mod friends;
pub mod messages;
pub mod middleware;
pub mod profile;
pub mod storage;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tracing::error;

use pigeon_db::Database;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;

/// All JSON routes. Static file serving and outer layers are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/profile", get(profile::get_profile).post(profile::update_avatar))
        .route("/friends", get(friends::list_friends).post(friends::add_friend))
        .route("/messages", post(messages::send_message))
        .route("/messages/{friend_id}", get(messages::get_messages))
        .route("/upload", post(files::upload))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

/// Run a blocking SQLite call off the async runtime.
pub(crate) async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("background task failed"))
        })?
        .map_err(ApiError::from)
}

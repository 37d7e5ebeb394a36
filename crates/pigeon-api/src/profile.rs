use axum::{
    Extension, Json,
    extract::{Multipart, State},
    response::IntoResponse,
};
use tracing::info;

use pigeon_types::api::Claims;
use pigeon_types::models::User;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::files::read_file_field;
use crate::storage::sanitize_file_name;
use crate::with_db;

/// GET /profile — the authenticated account.
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(load_profile(&state, claims.sub).await?))
}

/// POST /profile — multipart with an optional `avatar` file. Without one the
/// profile is returned unchanged.
pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(upload) = read_file_field(multipart, "avatar").await? {
        let name = format!("av_{}_{}", claims.sub, sanitize_file_name(&upload.file_name));
        let avatar = state.avatars.save(&name, &upload.data).await?;

        let user_id = claims.sub;
        let path = avatar.clone();
        let updated = with_db(&state, move |db| db.set_avatar(user_id, &path)).await?;
        if !updated {
            return Err(ApiError::NotFound("Account no longer exists".into()));
        }

        info!("User {} changed avatar to {}", claims.sub, avatar);
    }

    Ok(Json(load_profile(&state, claims.sub).await?))
}

async fn load_profile(state: &AppState, user_id: i64) -> Result<User, ApiError> {
    with_db(state, move |db| db.get_user_by_id(user_id))
        .await?
        .map(User::from)
        .ok_or_else(|| ApiError::NotFound("Account no longer exists".into()))
}

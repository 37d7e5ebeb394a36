use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use tracing::{debug, info};

use pigeon_db::FriendOutcome;
use pigeon_types::api::{AddFriendRequest, AddFriendResponse, Claims};
use pigeon_types::models::User;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::with_db;

/// GET /friends — accounts the caller has added, oldest first.
pub async fn list_friends(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let friends: Vec<User> = with_db(&state, move |db| db.list_friends(user_id))
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(Json(friends))
}

/// POST /friends — add a friend by exact nickname. Unknown names and the
/// caller's own name are accepted silently.
pub async fn add_friend(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddFriendRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let nickname = req.nickname.trim().to_string();
    let user_id = claims.sub;

    let lookup = nickname.clone();
    let outcome = with_db(&state, move |db| db.add_friend_by_username(user_id, &lookup)).await?;

    match outcome {
        FriendOutcome::Added => info!("User {} added {} as friend", claims.username, nickname),
        other => debug!("User {} add friend '{}': {:?}", claims.username, nickname, other),
    }

    Ok(Json(AddFriendResponse {
        added: outcome.added(),
    }))
}

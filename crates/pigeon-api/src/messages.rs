use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::debug;

use pigeon_types::api::{Claims, SendMessageRequest, SendMessageResponse};
use pigeon_types::models::NewMessage;

use crate::auth::AppState;
use crate::error::ApiError;

/// POST /messages — append to the log as the authenticated account.
/// The recipient id is taken as given.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let stored = state
        .messages
        .append(NewMessage {
            sender_id: claims.sub,
            recipient_id: req.recipient_id,
            text: req.message,
            file_path: req.file_path,
        })
        .await?;

    debug!(
        "Message {} -> {} at {}",
        stored.sender_id, stored.recipient_id, stored.timestamp
    );

    Ok(Json(SendMessageResponse {
        status: "ok".into(),
    }))
}

/// GET /messages/{friend_id} — the whole conversation with `friend_id`,
/// oldest first.
pub async fn get_messages(
    State(state): State<AppState>,
    Path(friend_id): Path<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state.messages.conversation(claims.sub, friend_id).await;
    Ok(Json(messages))
}

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Multipart, State},
    response::IntoResponse,
};
use uuid::Uuid;

use pigeon_types::api::{Claims, UploadResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::storage::sanitize_file_name;

pub(crate) struct FileUpload {
    pub(crate) file_name: String,
    pub(crate) data: Bytes,
}

/// POST /upload — multipart `photo` field. The stored path goes into a
/// subsequent message's `file_path`.
pub async fn upload(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let upload = read_file_field(multipart, "photo")
        .await?
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".into()))?;

    let name = format!("{}_{}", Uuid::new_v4(), sanitize_file_name(&upload.file_name));
    let file_path = state.uploads.save(&name, &upload.data).await?;

    Ok(Json(UploadResponse { file_path }))
}

/// First non-empty file in the multipart field `name`, if any.
pub(crate) async fn read_file_field(
    mut multipart: Multipart,
    name: &str,
) -> Result<Option<FileUpload>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(name) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        if !data.is_empty() {
            return Ok(Some(FileUpload { file_name, data }));
        }
    }

    Ok(None)
}

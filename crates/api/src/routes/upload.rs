use axum::{
    Json,
    extract::{Multipart, State},
};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::{error::ApiError, extractors::auth::RequireAuth, state::AppState};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub id: String,
    pub name: String,
}

/// Accepts a multipart body and forwards its first file part to Drive.
/// Extra parts are tolerated and ignored.
pub async fn upload(
    State(state): State<AppState>,
    _auth: RequireAuth,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file: Option<(Option<String>, Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {e}")))?
    {
        // A part counts as the file when it carries a filename or a
        // declared content type; plain text fields have neither.
        if field.file_name().is_none() && field.content_type().is_none() {
            continue;
        }
        let filename = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|s| s.to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {e}")))?;
        file = Some((filename, content_type, bytes.to_vec()));
        break;
    }

    let (filename, content_type, bytes) = file.ok_or_else(no_file)?;
    if bytes.is_empty() {
        return Err(no_file());
    }

    let name = filename.unwrap_or_else(generated_name);
    let mime_type = content_type.unwrap_or_else(|| "image/jpeg".to_string());

    let created = state.drive.upload(&name, &mime_type, bytes).await?;
    info!(id = %created.id, name = %created.name, "photo uploaded");

    Ok(Json(UploadResponse {
        ok: true,
        id: created.id,
        name: created.name,
    }))
}

fn no_file() -> ApiError {
    ApiError::BadRequest("No file".to_string())
}

/// Mirrors the browser default for camera captures without a filename.
fn generated_name() -> String {
    format!("photo-{}.jpg", Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ"))
}

use axum::{Json, extract::State};
use serde::Serialize;
use snapdrive_services::drive::DriveFile;

use crate::{error::ApiError, extractors::auth::RequireAuth, state::AppState};

#[derive(Debug, Serialize)]
pub struct GalleryResponse {
    pub files: Vec<DriveFile>,
}

/// Recent images in the destination folder, newest first. An empty folder
/// is an empty list, not an error.
pub async fn list(
    State(state): State<AppState>,
    _auth: RequireAuth,
) -> Result<Json<GalleryResponse>, ApiError> {
    let files = state.drive.list_images().await?;
    Ok(Json(GalleryResponse { files }))
}

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::Response,
};

use crate::{error::ApiError, extractors::auth::RequireAuth, state::AppState};

/// Proxies one image's bytes back to the client so the browser never sees
/// Drive URLs or credentials. Content type comes from the metadata lookup.
pub async fn get(
    State(state): State<AppState>,
    _auth: RequireAuth,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let meta = state.drive.get_metadata(&id).await?;
    let bytes = state.drive.download(&id).await?;

    Ok(Response::builder()
        .header(
            header::CONTENT_TYPE,
            meta.mime_type.as_deref().unwrap_or("image/jpeg"),
        )
        .header(header::CACHE_CONTROL, "public, max-age=60")
        .body(Body::from(bytes))
        .unwrap())
}

use axum::{
    Json,
    extract::{Query, State},
    response::Redirect,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{error::ApiError, state::AppState};
use snapdrive_services::drive::DriveError;

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
}

/// Kicks off the consent flow. Pure URL construction, always succeeds.
pub async fn begin(State(state): State<AppState>) -> Redirect {
    Redirect::temporary(&state.auth.authorize_url())
}

pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect, ApiError> {
    let code = params
        .code
        .ok_or_else(|| ApiError::BadRequest("Missing 'code' query parameter".to_string()))?;

    state.auth.exchange_code(&code).await?;
    info!("OAuth grant persisted");

    // Folder verification can wait for the next authorized request if the
    // lookup hiccups, but a non-folder id is a configuration error.
    match state.drive.resolve_folder().await {
        Ok(_) => {}
        Err(err @ DriveError::NotAFolder { .. }) => return Err(err.into()),
        Err(err) => warn!("folder check failed, will retry on next request: {err}"),
    }

    Ok(Redirect::to("/"))
}

pub async fn logout(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    state.auth.logout().await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    /// Fresh refresh token superseding the one presented
    pub refresh_token: String,
}

/// Token rotation handler
///
/// POST /api/token/refresh
///
/// Pure token work; never touches the credential store.
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    if request.refresh_token.is_empty() {
        return Err(AppError::Validation("refresh_token is required".to_string()));
    }

    let pair = state.auth.refresh(&request.refresh_token).await?;

    Ok(Json(RefreshResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

use axum::{Json, extract::State, http::HeaderMap};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

use super::bearer_token;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_key: String,
    pub email: String,
}

/// Protected-route probe
///
/// GET /api/me
///
/// Verifies the bearer token as an access token and echoes its subject.
/// A refresh token presented here is rejected with a type mismatch.
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, AppError> {
    let claims = state.auth.verify_access_token(bearer_token(&headers)?)?;

    Ok(Json(MeResponse {
        user_key: claims.sub,
        email: claims.email,
    }))
}

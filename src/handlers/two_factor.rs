use axum::{Json, extract::State, http::HeaderMap};
use serde::Serialize;
use time::OffsetDateTime;

use crate::error::AppError;
use crate::state::AppState;

use super::bearer_token;

#[derive(Debug, Serialize)]
pub struct EnableResponse {
    /// Base32 seed for manual entry, shown once
    pub seed: String,
    /// otpauth:// URI for authenticator apps; QR rendering is up to the
    /// client
    pub enrollment_uri: String,
}

/// 2FA enrollment handler
///
/// POST /api/2fa/enable
///
/// # Security
/// - Requires a valid access token; enrollment applies to its subject
/// - The seed is returned once here and only ever stored sealed
pub async fn enable_two_factor(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<EnableResponse>, AppError> {
    let claims = state.auth.verify_access_token(bearer_token(&headers)?)?;

    let enrollment = state.auth.enable_two_factor(&claims.email).await?;

    Ok(Json(EnableResponse {
        seed: enrollment.seed,
        enrollment_uri: enrollment.enrollment_uri,
    }))
}

#[derive(Debug, Serialize)]
pub struct DisableResponse {
    pub disabled: bool,
}

/// 2FA removal handler
///
/// POST /api/2fa/disable
pub async fn disable_two_factor(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DisableResponse>, AppError> {
    let claims = state.auth.verify_access_token(bearer_token(&headers)?)?;

    state.auth.disable_two_factor(&claims.email).await?;

    Ok(Json(DisableResponse { disabled: true }))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub enabled: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_used: Option<OffsetDateTime>,
}

/// 2FA status handler
///
/// GET /api/2fa/status
///
/// Reports the caller's own enrollment state; timestamps only, never the
/// seed.
pub async fn two_factor_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, AppError> {
    let claims = state.auth.verify_access_token(bearer_token(&headers)?)?;

    let status = state.auth.two_factor_status(&claims.email).await?;

    Ok(Json(StatusResponse {
        enabled: status.enabled,
        created_at: status.created_at,
        last_used: status.last_used,
    }))
}

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::LoginOutcome;
use crate::state::AppState;

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// 2FA code (only required for users with 2FA enabled)
    pub code: Option<String>,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Set when the password was accepted but a second factor is pending
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_two_factor: Option<bool>,
    /// Identity key to carry into the 2FA step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_key: Option<String>,
}

/// Login handler
///
/// POST /api/login
///
/// Flow:
/// 1. Request validation
/// 2. Password check against the store
/// 3. 2FA branch: without a code, respond `requires_two_factor`; with a
///    code, complete the second factor in the same call
/// 4. Token pair in the response on success
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_login_request(&request)?;

    let outcome = state.auth.login(&request.email, &request.password).await?;

    match outcome {
        LoginOutcome::TokensIssued(pair) => Ok(Json(LoginResponse {
            access_token: Some(pair.access_token),
            refresh_token: Some(pair.refresh_token),
            requires_two_factor: None,
            pending_key: None,
        })),
        LoginOutcome::TwoFactorRequired { pending_key } => match &request.code {
            Some(code) => {
                validate_totp_code(code)?;
                let pair = state
                    .auth
                    .complete_two_factor_login(&request.email, code)
                    .await?;
                Ok(Json(LoginResponse {
                    access_token: Some(pair.access_token),
                    refresh_token: Some(pair.refresh_token),
                    requires_two_factor: None,
                    pending_key: None,
                }))
            }
            None => Ok(Json(LoginResponse {
                access_token: None,
                refresh_token: None,
                requires_two_factor: Some(true),
                pending_key: Some(pending_key),
            })),
        },
    }
}

#[derive(Debug, Deserialize)]
pub struct TwoFactorLoginRequest {
    pub email: String,
    pub code: String,
}

/// Second step of a 2FA login, as its own endpoint
///
/// POST /api/login/2fa
pub async fn complete_two_factor_login(
    State(state): State<AppState>,
    Json(request): Json<TwoFactorLoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    validate_totp_code(&request.code)?;

    let pair = state
        .auth
        .complete_two_factor_login(&request.email, &request.code)
        .await?;

    Ok(Json(LoginResponse {
        access_token: Some(pair.access_token),
        refresh_token: Some(pair.refresh_token),
        requires_two_factor: None,
        pending_key: None,
    }))
}

fn validate_totp_code(code: &str) -> Result<(), AppError> {
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "the code must be 6 digits".to_string(),
        ));
    }
    Ok(())
}

fn validate_login_request(request: &LoginRequest) -> Result<(), AppError> {
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("email is required".to_string()));
    }
    if !request.email.contains('@') {
        return Err(AppError::Validation(
            "a valid email address is required".to_string(),
        ));
    }
    if request.password.is_empty() {
        return Err(AppError::Validation("password is required".to_string()));
    }
    Ok(())
}

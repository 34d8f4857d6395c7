use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad password or unknown user. Always reported identically so the
    /// response never reveals which of the two it was.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Bad TOTP code, missing 2FA record or undecryptable seed. All three
    /// fold into this one variant at the orchestrator boundary.
    #[error("invalid two-factor code")]
    InvalidTwoFactorCode,

    #[error("two-factor authentication is already enabled")]
    TwoFactorAlreadyEnabled,

    #[error("two-factor authentication is not enabled")]
    TwoFactorNotEnabled,

    #[error("token has expired")]
    TokenExpired,

    #[error("token signature is invalid")]
    TokenInvalidSignature,

    #[error("token type mismatch")]
    TokenTypeMismatch,

    /// Envelope authentication-tag mismatch: the stored secret is unreadable
    /// or was tampered with. Never carries cipher detail.
    #[error("decryption failed")]
    Decryption,

    #[error("email is already registered")]
    EmailAlreadyExists,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error")]
    Storage(#[from] StoreError),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "email or password is incorrect".to_string(),
            ),
            Self::InvalidTwoFactorCode => (
                StatusCode::UNAUTHORIZED,
                "two-factor code is incorrect".to_string(),
            ),
            Self::TwoFactorAlreadyEnabled => (
                StatusCode::CONFLICT,
                "two-factor authentication is already enabled".to_string(),
            ),
            Self::TwoFactorNotEnabled => (
                StatusCode::BAD_REQUEST,
                "two-factor authentication is not enabled".to_string(),
            ),
            Self::TokenExpired => (StatusCode::UNAUTHORIZED, "token has expired".to_string()),
            Self::TokenInvalidSignature | Self::TokenTypeMismatch => {
                (StatusCode::UNAUTHORIZED, "token is invalid".to_string())
            }
            Self::Decryption => {
                tracing::error!("envelope decryption failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "an internal error occurred".to_string(),
                )
            }
            Self::EmailAlreadyExists => (
                StatusCode::CONFLICT,
                "email is already registered".to_string(),
            ),
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Storage(e) => {
                tracing::error!(error = ?e, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "an internal error occurred".to_string(),
                )
            }
            Self::Internal(e) => {
                tracing::error!(error = ?e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "an internal error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

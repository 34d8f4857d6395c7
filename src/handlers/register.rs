use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub display_name: String,
    pub email: String,
    pub password: String, // hashed immediately after deserialization
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_key: String,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Registration handler
///
/// POST /api/register
///
/// # Security
/// - The password never appears in logs
/// - The response carries the derived user key, never the hash
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    validate_register_request(&request)?;

    let user = state
        .auth
        .register(&request.display_name, &request.email, &request.password)
        .await?;

    Ok(Json(RegisterResponse {
        user_key: user.user_key,
        email: user.email,
        created_at: user.created_at,
    }))
}

fn validate_register_request(request: &RegisterRequest) -> Result<(), AppError> {
    if request.display_name.trim().is_empty() {
        return Err(AppError::Validation("display name is required".to_string()));
    }
    if request.email.trim().is_empty() {
        return Err(AppError::Validation("email is required".to_string()));
    }
    if !request.email.contains('@') {
        return Err(AppError::Validation(
            "a valid email address is required".to_string(),
        ));
    }
    if request.password.len() < 8 {
        return Err(AppError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(display_name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            display_name: display_name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_validate_empty_display_name() {
        let result = validate_register_request(&request("", "test@example.com", "password123"));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_empty_email() {
        let result = validate_register_request(&request("Test", "", "password123"));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_invalid_email() {
        let result = validate_register_request(&request("Test", "invalid-email", "password123"));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_short_password() {
        let result = validate_register_request(&request("Test", "test@example.com", "short"));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_valid_request() {
        let result =
            validate_register_request(&request("Test", "test@example.com", "password123"));
        assert!(result.is_ok());
    }
}

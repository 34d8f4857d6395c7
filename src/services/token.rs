use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims carried by every issued token. The `token_type` claim is checked
/// on every verification, never inferred from context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (derived identity key)
    pub sub: String,
    /// Email the token was issued for
    pub email: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
    /// Access or refresh
    pub token_type: TokenType,
}

/// An access/refresh pair minted on successful login or rotation.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signs and verifies bearer tokens (HS256). One process-wide signing key,
/// constructed from configuration at startup.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, access_ttl_mins: i64, refresh_ttl_days: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::minutes(access_ttl_mins),
            refresh_ttl: Duration::days(refresh_ttl_days),
        }
    }

    /// Short-lived token authorizing API calls.
    pub fn issue_access_token(&self, sub: &str, email: &str) -> Result<String, AppError> {
        self.issue(sub, email, TokenType::Access, self.access_ttl)
    }

    /// Longer-lived token used solely to mint new access tokens.
    pub fn issue_refresh_token(&self, sub: &str, email: &str) -> Result<String, AppError> {
        self.issue(sub, email, TokenType::Refresh, self.refresh_ttl)
    }

    pub fn issue_pair(&self, sub: &str, email: &str) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(sub, email)?,
            refresh_token: self.issue_refresh_token(sub, email)?,
        })
    }

    /// Verify signature, expiry and type, in that order of visibility:
    /// `TokenExpired`, `TokenInvalidSignature` and `TokenTypeMismatch` are
    /// distinct failures.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact; drift tolerance belongs to the TOTP layer, not here.
        validation.leeway = 0;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::TokenInvalidSignature,
            })?;

        if claims.token_type != expected {
            return Err(AppError::TokenTypeMismatch);
        }

        Ok(claims)
    }

    /// Rotate a refresh token: verify it, then mint a fresh pair for the
    /// same subject. The presented refresh token is superseded rather than
    /// echoed back; no revocation list is kept, so it stays valid until its
    /// natural expiry.
    pub fn rotate(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let claims = self.verify(refresh_token, TokenType::Refresh)?;
        self.issue_pair(&claims.sub, &claims.email)
    }

    fn issue(
        &self,
        sub: &str,
        email: &str,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, AppError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: sub.to_string(),
            email: email.to_string(),
            iat: now.unix_timestamp(),
            exp: (now + ttl).unix_timestamp(),
            token_type,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("token encoding failed: {e}")))
    }
}

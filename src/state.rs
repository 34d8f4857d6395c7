use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::PgPool;

use crate::config::Config;
use crate::error::AppError;
use crate::services::{AuthService, SecretEnvelope, TokenIssuer, TotpEngine};
use crate::store::PgCredentialStore;

/// Shared application state.
///
/// Cloned by axum into every handler. All keys are read once from config
/// here and held by the services for the process lifetime; nothing does
/// ambient key lookup later.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: AuthService<PgCredentialStore>,
}

impl AppState {
    pub fn new(db_pool: PgPool, config: Config) -> Result<Self, AppError> {
        let config = Arc::new(config);

        let store = PgCredentialStore::new(db_pool);
        let envelope = SecretEnvelope::new(config.encryption_key.expose_secret())?;
        let totp = TotpEngine::new(config.totp_issuer.clone());
        let tokens = TokenIssuer::new(
            config.token_secret.expose_secret(),
            config.access_token_ttl_mins,
            config.refresh_token_ttl_days,
        );

        Ok(Self {
            config,
            auth: AuthService::new(store, envelope, totp, tokens),
        })
    }
}

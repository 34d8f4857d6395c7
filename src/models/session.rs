use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use super::SealedSecret;

/// One successful login. Every login appends a new record (multiple
/// devices are expected); nothing is overwritten or deleted here.
/// Both tokens are sealed before storage.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SessionRecord {
    pub session_key: String,
    pub user_key: String,
    #[serde(skip)]
    pub access_token: SealedSecret,
    #[serde(skip)]
    pub refresh_token: SealedSecret,
    pub created_at: OffsetDateTime,
    pub active: bool,
}

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_status", rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Suspended,
}

/// A registered account.
///
/// Keyed by the identity resolver's derived user key, not by email. The
/// password hash is its own protection and is stored as-is; it is never
/// envelope-encrypted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserRecord {
    pub user_key: String,
    pub display_name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub two_factor_enabled: bool,
    pub status: UserStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub last_login: Option<OffsetDateTime>,
}

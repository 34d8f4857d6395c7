use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use super::SealedSecret;

/// A user's TOTP enrollment, 1:1 with the user record (same derived key).
///
/// Exists if and only if the user record's `two_factor_enabled` flag is
/// true; the two are written inside one store transaction.
/// The seed is sealed with AES-256-GCM before it ever reaches storage.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TwoFactorRecord {
    pub user_key: String,
    #[serde(skip)]
    pub seed: SealedSecret,
    pub enabled: bool,
    pub created_at: OffsetDateTime,
    pub last_used: Option<OffsetDateTime>,
}

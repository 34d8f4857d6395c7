use std::future::Future;

use time::OffsetDateTime;

use crate::models::{SessionRecord, TwoFactorRecord, UserRecord};

pub mod memory;
pub mod postgres;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// A create hit an already-present key (unique violation).
    #[error("duplicate key")]
    Duplicate,
}

/// Keyed record store over the three credential collections
/// (`users`, `sessions`, `two_factor`).
///
/// Keys are the identity resolver's derived keys, never raw emails.
/// `user_exists` is distinct from `get_user` returning `None` so callers
/// can check for duplicates without pulling the whole record.
///
/// # Note
/// `enable_two_factor` / `disable_two_factor` bundle the record write and
/// the user-flag flip: implementations must apply both or neither, so the
/// "record exists iff flag is set" invariant survives a crash between them.
pub trait CredentialStore: Clone + Send + Sync {
    fn get_user(
        &self,
        user_key: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, StoreError>> + Send;

    fn user_exists(&self, user_key: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Insert a new user. Fails with `Duplicate` when the key is already
    /// taken; the insert, not a prior existence check, arbitrates races.
    fn create_user(&self, user: &UserRecord)
    -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Stamp `last_login` (and `updated_at`) on a successful login.
    fn record_login(
        &self,
        user_key: &str,
        at: OffsetDateTime,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get_two_factor(
        &self,
        user_key: &str,
    ) -> impl Future<Output = Result<Option<TwoFactorRecord>, StoreError>> + Send;

    /// Insert the 2FA record and set the user's flag as one logical unit.
    fn enable_two_factor(
        &self,
        record: &TwoFactorRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete the 2FA record and clear the user's flag as one logical unit.
    fn disable_two_factor(
        &self,
        user_key: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Stamp `last_used` on the 2FA record after a code is accepted.
    fn touch_two_factor(
        &self,
        user_key: &str,
        at: OffsetDateTime,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Append a session record. Sessions are never overwritten; each login
    /// creates a new one.
    fn create_session(
        &self,
        session: &SessionRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

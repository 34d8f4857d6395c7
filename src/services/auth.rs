use time::OffsetDateTime;

use crate::error::AppError;
use crate::models::{SessionRecord, TwoFactorRecord, UserRecord, UserStatus};
use crate::services::envelope::SecretEnvelope;
use crate::services::identity::IdentityResolver;
use crate::services::password::{burn_verification, hash_password, verify_password};
use crate::services::token::{Claims, TokenIssuer, TokenPair, TokenType};
use crate::services::totp::{DEFAULT_WINDOW, TotpEngine};
use crate::store::{CredentialStore, StoreError};

/// Result of a password login: either a full token pair, or a branch into
/// the second factor carrying only the pending identity key — no
/// credential material is issued until the code checks out.
#[derive(Debug)]
pub enum LoginOutcome {
    TokensIssued(TokenPair),
    TwoFactorRequired { pending_key: String },
}

/// Returned by 2FA enrollment: the plaintext seed for manual entry plus
/// the otpauth:// URI for authenticator apps. Shown to the user once,
/// never stored unsealed.
#[derive(Debug)]
pub struct Enrollment {
    pub seed: String,
    pub enrollment_uri: String,
}

/// A user's current 2FA enrollment state, for the status endpoint.
#[derive(Debug)]
pub struct TwoFactorStatus {
    pub enabled: bool,
    pub created_at: Option<OffsetDateTime>,
    pub last_used: Option<OffsetDateTime>,
}

/// Sequences password check, 2FA branch and token issuance over the
/// credential store.
///
/// # Security
/// - Raw cryptographic and storage failures never cross this boundary;
///   they are translated into the coarse error taxonomy
/// - Rejections never reveal whether the email or the password was wrong,
///   nor whether a 2FA failure was a bad code or an unreadable seed
#[derive(Clone)]
pub struct AuthService<S: CredentialStore> {
    store: S,
    envelope: SecretEnvelope,
    totp: TotpEngine,
    tokens: TokenIssuer,
}

impl<S: CredentialStore> AuthService<S> {
    pub fn new(store: S, envelope: SecretEnvelope, totp: TotpEngine, tokens: TokenIssuer) -> Self {
        Self {
            store,
            envelope,
            totp,
            tokens,
        }
    }

    /// Register a new account.
    ///
    /// The store's unique key constraint is the duplicate arbiter: a
    /// check-then-insert would let two concurrent registrations race past
    /// the check, so the insert itself decides and a key collision maps to
    /// `EmailAlreadyExists`.
    pub async fn register(
        &self,
        display_name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserRecord, AppError> {
        let user_key = IdentityResolver::user_key(email);
        let password_hash = hash_password(password)?;
        let now = OffsetDateTime::now_utc();

        let user = UserRecord {
            user_key,
            display_name: display_name.to_string(),
            email: email.trim().to_lowercase(),
            password_hash,
            two_factor_enabled: false,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
            last_login: None,
        };
        self.store.create_user(&user).await.map_err(|e| match e {
            StoreError::Duplicate => AppError::EmailAlreadyExists,
            other => AppError::Storage(other),
        })?;

        tracing::info!(user_key = %user.user_key, "user registered");

        Ok(user)
    }

    /// First step of the login state machine.
    ///
    /// Unknown user, wrong password and suspended account all collapse to
    /// `InvalidCredentials`. The unknown-user path burns one argon2
    /// verification so it is not measurably faster than a real mismatch.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let user_key = IdentityResolver::user_key(email);

        let Some(user) = self.store.get_user(&user_key).await? else {
            burn_verification(password);
            tracing::warn!("login rejected: unknown user");
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash) {
            tracing::warn!(user_key = %user.user_key, "login rejected: password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        if user.status != UserStatus::Active {
            tracing::warn!(user_key = %user.user_key, "login rejected: account suspended");
            return Err(AppError::InvalidCredentials);
        }

        if user.two_factor_enabled {
            tracing::info!(user_key = %user.user_key, "password accepted, second factor required");
            return Ok(LoginOutcome::TwoFactorRequired {
                pending_key: user.user_key,
            });
        }

        let pair = self.issue_session(&user).await?;
        tracing::info!(user_key = %user.user_key, "login succeeded");

        Ok(LoginOutcome::TokensIssued(pair))
    }

    /// Second step of the login state machine, entered after
    /// `TwoFactorRequired`.
    ///
    /// Missing 2FA record, unreadable seed, wrong code and a suspended
    /// account all collapse to `InvalidTwoFactorCode`. The status check is
    /// repeated here: this endpoint is reachable without going through
    /// `login` first, so it cannot rely on the first step having screened.
    pub async fn complete_two_factor_login(
        &self,
        email: &str,
        code: &str,
    ) -> Result<TokenPair, AppError> {
        let user_key = IdentityResolver::user_key(email);
        let two_factor_key = IdentityResolver::two_factor_key(&user_key);

        let Some(user) = self.store.get_user(&user_key).await? else {
            tracing::warn!("2fa login rejected: unknown user");
            return Err(AppError::InvalidTwoFactorCode);
        };

        if user.status != UserStatus::Active {
            tracing::warn!(user_key = %user_key, "2fa login rejected: account suspended");
            return Err(AppError::InvalidTwoFactorCode);
        }

        let Some(record) = self.store.get_two_factor(&two_factor_key).await? else {
            tracing::warn!(user_key = %user_key, "2fa login rejected: no enrollment record");
            return Err(AppError::InvalidTwoFactorCode);
        };

        let seed = self.envelope.open(&record.seed).map_err(|_| {
            tracing::error!(user_key = %user_key, "2fa login rejected: seed unreadable");
            AppError::InvalidTwoFactorCode
        })?;

        if !self.totp.verify(&seed, code, DEFAULT_WINDOW) {
            tracing::warn!(user_key = %user_key, "2fa login rejected: code mismatch");
            return Err(AppError::InvalidTwoFactorCode);
        }

        let pair = self.issue_session(&user).await?;

        // last_used only after the session write succeeds, so it never
        // records a login that failed to persist.
        let now = OffsetDateTime::now_utc();
        self.store.touch_two_factor(&two_factor_key, now).await?;

        tracing::info!(user_key = %user_key, "login succeeded with second factor");

        Ok(pair)
    }

    /// Enroll a user in 2FA. The caller is expected to be authenticated
    /// already (the HTTP layer verifies the bearer token before calling
    /// in).
    ///
    /// The seed is sealed before it reaches storage; the record write and
    /// the user-flag flip happen as one store transaction.
    pub async fn enable_two_factor(&self, email: &str) -> Result<Enrollment, AppError> {
        let user_key = IdentityResolver::user_key(email);

        let Some(user) = self.store.get_user(&user_key).await? else {
            return Err(AppError::InvalidCredentials);
        };

        if user.two_factor_enabled {
            return Err(AppError::TwoFactorAlreadyEnabled);
        }

        let seed = TotpEngine::generate_seed();
        let sealed = self.envelope.seal(&seed)?;

        let record = TwoFactorRecord {
            user_key: IdentityResolver::two_factor_key(&user_key),
            seed: sealed,
            enabled: true,
            created_at: OffsetDateTime::now_utc(),
            last_used: None,
        };
        self.store.enable_two_factor(&record).await?;

        let enrollment_uri = self.totp.enrollment_uri(&seed, &user.email)?;

        tracing::info!(user_key = %user_key, "two-factor authentication enabled");

        Ok(Enrollment {
            seed,
            enrollment_uri,
        })
    }

    /// Report a user's 2FA enrollment state. Timestamps come from the
    /// enrollment record; flag and record agree by the lock-step invariant.
    pub async fn two_factor_status(&self, email: &str) -> Result<TwoFactorStatus, AppError> {
        let user_key = IdentityResolver::user_key(email);

        let Some(user) = self.store.get_user(&user_key).await? else {
            return Err(AppError::InvalidCredentials);
        };

        let record = self
            .store
            .get_two_factor(&IdentityResolver::two_factor_key(&user_key))
            .await?;

        Ok(match record {
            Some(record) if user.two_factor_enabled => TwoFactorStatus {
                enabled: true,
                created_at: Some(record.created_at),
                last_used: record.last_used,
            },
            _ => TwoFactorStatus {
                enabled: false,
                created_at: None,
                last_used: None,
            },
        })
    }

    /// Remove a user's 2FA enrollment: record delete and flag clear as one
    /// store transaction.
    pub async fn disable_two_factor(&self, email: &str) -> Result<(), AppError> {
        let user_key = IdentityResolver::user_key(email);

        let Some(user) = self.store.get_user(&user_key).await? else {
            return Err(AppError::InvalidCredentials);
        };

        if !user.two_factor_enabled {
            return Err(AppError::TwoFactorNotEnabled);
        }

        self.store.disable_two_factor(&user_key).await?;

        tracing::info!(user_key = %user_key, "two-factor authentication disabled");

        Ok(())
    }

    /// Rotate a refresh token into a fresh pair. Pure token work; the
    /// credential store is not touched.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        self.tokens.rotate(refresh_token)
    }

    /// Verify a bearer token as an access token, for protected routes.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AppError> {
        self.tokens.verify(token, TokenType::Access)
    }

    /// Mint a pair, seal both tokens, append the session record and stamp
    /// last_login.
    async fn issue_session(&self, user: &UserRecord) -> Result<TokenPair, AppError> {
        let pair = self.tokens.issue_pair(&user.user_key, &user.email)?;
        let now = OffsetDateTime::now_utc();

        let session = SessionRecord {
            session_key: IdentityResolver::session_key(&user.user_key, now),
            user_key: user.user_key.clone(),
            access_token: self.envelope.seal(&pair.access_token)?,
            refresh_token: self.envelope.seal(&pair.refresh_token)?,
            created_at: now,
            active: true,
        };
        self.store.create_session(&session).await?;
        self.store.record_login(&user.user_key, now).await?;

        Ok(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    const EMAIL: &str = "user@example.com";
    const PASSWORD: &str = "correct horse battery staple";

    fn service() -> (AuthService<MemoryCredentialStore>, MemoryCredentialStore) {
        let store = MemoryCredentialStore::new();
        let envelope = SecretEnvelope::new(&STANDARD.encode([7u8; 32])).unwrap();
        let totp = TotpEngine::new("AuthGuard".to_string());
        let tokens = TokenIssuer::new("test-secret-key-at-least-32-chars!", 15, 7);
        (
            AuthService::new(store.clone(), envelope, totp, tokens),
            store,
        )
    }

    async fn service_with_user() -> (AuthService<MemoryCredentialStore>, MemoryCredentialStore) {
        let (auth, store) = service();
        auth.register("Test User", EMAIL, PASSWORD).await.unwrap();
        (auth, store)
    }

    #[tokio::test]
    async fn test_unknown_email_rejected() {
        let (auth, _) = service();

        let result = auth.login("nobody@example.com", "whatever123").await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let (auth, _) = service_with_user().await;

        let result = auth.login(EMAIL, "not the password").await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_without_two_factor_issues_valid_pair() {
        let (auth, store) = service_with_user().await;

        let LoginOutcome::TokensIssued(pair) = auth.login(EMAIL, PASSWORD).await.unwrap() else {
            panic!("expected tokens to be issued");
        };

        let claims = auth.verify_access_token(&pair.access_token).unwrap();
        assert_eq!(claims.sub, IdentityResolver::user_key(EMAIL));
        assert_eq!(claims.email, EMAIL);

        assert_eq!(store.session_count().await, 1);
        let user = store
            .get_user(&IdentityResolver::user_key(EMAIL))
            .await
            .unwrap()
            .unwrap();
        assert!(user.last_login.is_some());
    }

    #[tokio::test]
    async fn test_login_accepts_differently_cased_email() {
        let (auth, _) = service_with_user().await;

        let outcome = auth.login("  USER@Example.COM ", PASSWORD).await.unwrap();
        assert!(matches!(outcome, LoginOutcome::TokensIssued(_)));
    }

    #[tokio::test]
    async fn test_login_with_two_factor_enabled_withholds_tokens() {
        let (auth, _) = service_with_user().await;
        auth.enable_two_factor(EMAIL).await.unwrap();

        let LoginOutcome::TwoFactorRequired { pending_key } =
            auth.login(EMAIL, PASSWORD).await.unwrap()
        else {
            panic!("expected the two-factor branch");
        };
        assert_eq!(pending_key, IdentityResolver::user_key(EMAIL));
    }

    #[tokio::test]
    async fn test_two_factor_login_with_valid_code() {
        let (auth, store) = service_with_user().await;
        let enrollment = auth.enable_two_factor(EMAIL).await.unwrap();

        let outcome = auth.login(EMAIL, PASSWORD).await.unwrap();
        assert!(matches!(outcome, LoginOutcome::TwoFactorRequired { .. }));

        let engine = TotpEngine::new("AuthGuard".to_string());
        let code = engine.current_code(&enrollment.seed).unwrap();

        let pair = auth.complete_two_factor_login(EMAIL, &code).await.unwrap();
        let claims = auth.verify_access_token(&pair.access_token).unwrap();
        assert_eq!(claims.sub, IdentityResolver::user_key(EMAIL));

        // last_used is stamped only once the session is persisted.
        assert_eq!(store.session_count().await, 1);
        let record = store
            .get_two_factor(&IdentityResolver::user_key(EMAIL))
            .await
            .unwrap()
            .unwrap();
        assert!(record.last_used.is_some());
    }

    #[tokio::test]
    async fn test_two_factor_status_lifecycle() {
        let (auth, _) = service_with_user().await;

        let status = auth.two_factor_status(EMAIL).await.unwrap();
        assert!(!status.enabled);
        assert!(status.created_at.is_none());
        assert!(status.last_used.is_none());

        let enrollment = auth.enable_two_factor(EMAIL).await.unwrap();
        let status = auth.two_factor_status(EMAIL).await.unwrap();
        assert!(status.enabled);
        assert!(status.created_at.is_some());
        assert!(status.last_used.is_none());

        let engine = TotpEngine::new("AuthGuard".to_string());
        let code = engine.current_code(&enrollment.seed).unwrap();
        auth.complete_two_factor_login(EMAIL, &code).await.unwrap();
        let status = auth.two_factor_status(EMAIL).await.unwrap();
        assert!(status.last_used.is_some());

        auth.disable_two_factor(EMAIL).await.unwrap();
        let status = auth.two_factor_status(EMAIL).await.unwrap();
        assert!(!status.enabled);
        assert!(status.created_at.is_none());
    }

    #[tokio::test]
    async fn test_two_factor_login_with_wrong_code() {
        let (auth, _) = service_with_user().await;
        auth.enable_two_factor(EMAIL).await.unwrap();

        // "000000" is almost certainly not the current code; if the clock
        // ever lands on it this would flake, which is why the engine tests
        // pin explicit timestamps instead.
        let result = auth.complete_two_factor_login(EMAIL, "000000").await;
        assert!(matches!(result, Err(AppError::InvalidTwoFactorCode)));
    }

    #[tokio::test]
    async fn test_two_factor_login_without_enrollment() {
        let (auth, _) = service_with_user().await;

        let result = auth.complete_two_factor_login(EMAIL, "123456").await;
        assert!(matches!(result, Err(AppError::InvalidTwoFactorCode)));
    }

    #[tokio::test]
    async fn test_enable_twice_fails() {
        let (auth, _) = service_with_user().await;

        auth.enable_two_factor(EMAIL).await.unwrap();
        let result = auth.enable_two_factor(EMAIL).await;
        assert!(matches!(result, Err(AppError::TwoFactorAlreadyEnabled)));
    }

    #[tokio::test]
    async fn test_enrollment_keeps_flag_and_record_in_lock_step() {
        let (auth, store) = service_with_user().await;
        let user_key = IdentityResolver::user_key(EMAIL);

        let enrollment = auth.enable_two_factor(EMAIL).await.unwrap();
        assert!(enrollment.enrollment_uri.starts_with("otpauth://totp/"));

        let user = store.get_user(&user_key).await.unwrap().unwrap();
        let record = store.get_two_factor(&user_key).await.unwrap().unwrap();
        assert!(user.two_factor_enabled);
        assert!(record.enabled);
        // Seed is sealed at rest, never the Base32 plaintext.
        assert_ne!(record.seed.as_str(), enrollment.seed);

        auth.disable_two_factor(EMAIL).await.unwrap();
        let user = store.get_user(&user_key).await.unwrap().unwrap();
        assert!(!user.two_factor_enabled);
        assert!(store.get_two_factor(&user_key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disable_when_not_enabled_fails() {
        let (auth, _) = service_with_user().await;

        let result = auth.disable_two_factor(EMAIL).await;
        assert!(matches!(result, Err(AppError::TwoFactorNotEnabled)));
    }

    #[tokio::test]
    async fn test_suspended_account_cannot_login() {
        let (auth, store) = service_with_user().await;
        let user_key = IdentityResolver::user_key(EMAIL);

        let mut user = store.get_user(&user_key).await.unwrap().unwrap();
        user.status = UserStatus::Suspended;
        store.put_user(user).await;

        let result = auth.login(EMAIL, PASSWORD).await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_suspended_account_cannot_complete_two_factor_login() {
        // The second step stands alone as an endpoint, so suspension must
        // hold there too, not only at the password step.
        let (auth, store) = service_with_user().await;
        let enrollment = auth.enable_two_factor(EMAIL).await.unwrap();
        let user_key = IdentityResolver::user_key(EMAIL);

        let mut user = store.get_user(&user_key).await.unwrap().unwrap();
        user.status = UserStatus::Suspended;
        store.put_user(user).await;

        let engine = TotpEngine::new("AuthGuard".to_string());
        let code = engine.current_code(&enrollment.seed).unwrap();

        let result = auth.complete_two_factor_login(EMAIL, &code).await;
        assert!(matches!(result, Err(AppError::InvalidTwoFactorCode)));
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_each_login_appends_a_session() {
        // Two simultaneous devices are expected; sessions accumulate.
        let (auth, store) = service_with_user().await;

        auth.login(EMAIL, PASSWORD).await.unwrap();
        auth.login(EMAIL, PASSWORD).await.unwrap();

        assert_eq!(store.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_session_tokens_are_sealed_at_rest() {
        let (auth, store) = service_with_user().await;

        let LoginOutcome::TokensIssued(pair) = auth.login(EMAIL, PASSWORD).await.unwrap() else {
            panic!("expected tokens");
        };

        let sessions = store
            .sessions_for(&IdentityResolver::user_key(EMAIL))
            .await;
        assert_eq!(sessions.len(), 1);
        assert_ne!(sessions[0].access_token.as_str(), pair.access_token);
        assert_ne!(sessions[0].refresh_token.as_str(), pair.refresh_token);

        let envelope = SecretEnvelope::new(&STANDARD.encode([7u8; 32])).unwrap();
        assert_eq!(
            envelope.open(&sessions[0].access_token).unwrap(),
            pair.access_token
        );
    }

    #[tokio::test]
    async fn test_refresh_rotates_pair() {
        let (auth, _) = service_with_user().await;

        let LoginOutcome::TokensIssued(pair) = auth.login(EMAIL, PASSWORD).await.unwrap() else {
            panic!("expected tokens");
        };

        let rotated = auth.refresh(&pair.refresh_token).await.unwrap();
        let claims = auth.verify_access_token(&rotated.access_token).unwrap();
        assert_eq!(claims.sub, IdentityResolver::user_key(EMAIL));
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let (auth, _) = service_with_user().await;

        let LoginOutcome::TokensIssued(pair) = auth.login(EMAIL, PASSWORD).await.unwrap() else {
            panic!("expected tokens");
        };

        let result = auth.refresh(&pair.access_token).await;
        assert!(matches!(result, Err(AppError::TokenTypeMismatch)));
    }

    #[tokio::test]
    async fn test_register_duplicate_email_fails() {
        let (auth, _) = service_with_user().await;

        let result = auth.register("Other Name", "USER@example.com", "hunter222").await;
        assert!(matches!(result, Err(AppError::EmailAlreadyExists)));
    }
}

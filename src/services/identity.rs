use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// Deterministic derivation of storage keys from stable user attributes.
///
/// Keys are content-addressed SHA-256 hex digests. This is not a security
/// boundary (emails are not secret); the hash only buys deterministic,
/// collision-resistant-enough addressing across the three collections.
pub struct IdentityResolver;

impl IdentityResolver {
    /// Derive the user key from an email address.
    ///
    /// The email is trimmed and lower-cased first, so inputs differing only
    /// by case or surrounding whitespace resolve to the same key.
    pub fn user_key(email: &str) -> String {
        let normalized = email.trim().to_lowercase();
        hex_sha256(normalized.as_bytes())
    }

    /// Derive a session key from the user key and the login timestamp.
    pub fn session_key(user_key: &str, at: OffsetDateTime) -> String {
        let combined = format!("{}:{}", user_key, at.unix_timestamp_nanos());
        hex_sha256(combined.as_bytes())
    }

    /// The 2FA record shares its key with the user record (1:1).
    pub fn two_factor_key(user_key: &str) -> String {
        user_key.to_string()
    }

    /// Check that an email resolves to an expected key.
    pub fn verify(email: &str, expected_key: &str) -> bool {
        Self::user_key(email) == expected_key
    }
}

fn hex_sha256(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

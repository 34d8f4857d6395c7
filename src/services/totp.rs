use data_encoding::BASE32;
use rand::RngCore;
use totp_rs::{Algorithm, TOTP};

use crate::error::AppError;

/// Accept the current 30-second step plus this many adjacent steps on
/// either side (±30 seconds of client/server clock drift).
pub const DEFAULT_WINDOW: u8 = 1;

const DIGITS: usize = 6;
const STEP_SECONDS: u64 = 30;

/// Time-based one-time password engine (RFC 6238: SHA-1, 6 digits,
/// 30-second step).
///
/// # Security
/// - Seeds are generated here but sealed by the envelope before storage
/// - Neither seeds nor submitted codes may be logged
/// - Verification fails closed: malformed input resolves to `false`
#[derive(Clone)]
pub struct TotpEngine {
    issuer: String,
}

impl TotpEngine {
    /// # Arguments
    /// * `issuer` - name shown in authenticator apps
    pub fn new(issuer: String) -> Self {
        Self { issuer }
    }

    /// Generate a 20-byte random seed, Base32-encoded for manual entry.
    pub fn generate_seed() -> String {
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut bytes);
        BASE32.encode(&bytes)
    }

    /// Build the otpauth:// provisioning URI consumed by authenticator
    /// apps. QR rendering is the caller's concern; the core only produces
    /// the URI.
    pub fn enrollment_uri(&self, seed: &str, account: &str) -> Result<String, AppError> {
        let totp = self.build(seed, DEFAULT_WINDOW, account)?;
        Ok(totp.get_url())
    }

    /// The code for the current time step. Test and debug use only; the
    /// login path never generates codes, it only verifies them.
    pub fn current_code(&self, seed: &str) -> Result<String, AppError> {
        let totp = self.build(seed, DEFAULT_WINDOW, "")?;
        totp.generate_current()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("system time error: {e}")))
    }

    /// Verify a submitted code against the current step ± `window` steps.
    ///
    /// Codes are fixed-width six-digit strings; leading zeros are
    /// significant. Any failure along the way (malformed seed, malformed
    /// code, clock error) resolves to `false`, never an error.
    pub fn verify(&self, seed: &str, code: &str, window: u8) -> bool {
        if code.len() != DIGITS || !code.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }

        let Ok(totp) = self.build(seed, window, "") else {
            return false;
        };

        let Ok(now) = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
        else {
            return false;
        };

        totp.check(code, now)
    }

    /// Seconds left in the current 30-second step. UX display only, not a
    /// security control.
    pub fn seconds_remaining() -> u64 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        STEP_SECONDS - (now % STEP_SECONDS)
    }

    fn build(&self, seed: &str, skew: u8, account: &str) -> Result<TOTP, AppError> {
        let seed_bytes = BASE32
            .decode(seed.as_bytes())
            .map_err(|_| AppError::Internal(anyhow::anyhow!("invalid base32 seed")))?;

        TOTP::new(
            Algorithm::SHA1,
            DIGITS,
            skew,
            STEP_SECONDS,
            seed_bytes,
            Some(self.issuer.clone()),
            account.to_string(),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("totp construction error: {e}")))
    }

    /// Verification against an explicit clock, for the window tests.
    #[cfg(test)]
    fn verify_at(&self, seed: &str, code: &str, window: u8, at: u64) -> bool {
        if code.len() != DIGITS || !code.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        let Ok(totp) = self.build(seed, window, "") else {
            return false;
        };
        totp.check(code, at)
    }

    #[cfg(test)]
    fn code_at(&self, seed: &str, at: u64) -> String {
        self.build(seed, DEFAULT_WINDOW, "").unwrap().generate(at)
    }
}

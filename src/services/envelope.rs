use aes_gcm::{
    Aes256Gcm, KeyInit, Nonce,
    aead::{Aead, OsRng},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::RngCore;

use crate::error::AppError;
use crate::models::SealedSecret;

/// Symmetric envelope for secrets stored at rest (TOTP seeds, session
/// tokens). AES-256-GCM with a fresh 96-bit nonce per seal; the ciphertext
/// string is Base64 of nonce || ciphertext || tag.
///
/// # Security
/// - One process-wide key, loaded at startup, never rotated at runtime
/// - Plaintext secrets must not appear in logs
#[derive(Clone)]
pub struct SecretEnvelope {
    key: [u8; 32],
}

impl SecretEnvelope {
    /// # Arguments
    /// * `key_base64` - Base64-encoded 32-byte key
    pub fn new(key_base64: &str) -> Result<Self, AppError> {
        let key_bytes = STANDARD.decode(key_base64).map_err(|e| {
            tracing::error!(error = ?e, "envelope key is not valid Base64");
            AppError::Internal(anyhow::anyhow!("invalid encryption key format"))
        })?;

        if key_bytes.len() != 32 {
            tracing::error!(
                expected = 32,
                actual = key_bytes.len(),
                "envelope key has wrong length"
            );
            return Err(AppError::Internal(anyhow::anyhow!(
                "encryption key must be 32 bytes"
            )));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&key_bytes);

        Ok(Self { key })
    }

    /// Encrypt a plaintext secret for storage.
    ///
    /// Empty input bypasses the cipher entirely: `seal("")` is the empty
    /// sealed value, so absent secrets never hit a cryptographic path.
    pub fn seal(&self, plaintext: &str) -> Result<SealedSecret, AppError> {
        if plaintext.is_empty() {
            return Ok(SealedSecret::new(String::new()));
        }

        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|e| {
            tracing::error!(error = ?e, "failed to initialize AES-GCM cipher");
            AppError::Internal(anyhow::anyhow!("cipher initialization error"))
        })?;

        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher.encrypt(nonce, plaintext.as_bytes()).map_err(|e| {
            tracing::error!(error = ?e, "secret encryption failed");
            AppError::Internal(anyhow::anyhow!("encryption error"))
        })?;

        let mut sealed = Vec::with_capacity(12 + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);

        Ok(SealedSecret::new(STANDARD.encode(sealed)))
    }

    /// Decrypt a sealed secret.
    ///
    /// `open` of the empty sealed value is the empty string. Anything that
    /// was not produced by `seal` under the same key fails with
    /// `AppError::Decryption` (tag mismatch); garbage is never returned.
    pub fn open(&self, sealed: &SealedSecret) -> Result<String, AppError> {
        if sealed.is_empty() {
            return Ok(String::new());
        }

        let raw = STANDARD
            .decode(sealed.as_str())
            .map_err(|_| AppError::Decryption)?;

        if raw.len() < 12 {
            return Err(AppError::Decryption);
        }

        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|e| {
            tracing::error!(error = ?e, "failed to initialize AES-GCM cipher");
            AppError::Internal(anyhow::anyhow!("cipher initialization error"))
        })?;

        let (nonce_bytes, ciphertext) = raw.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| AppError::Decryption)?;

        String::from_utf8(plaintext).map_err(|_| AppError::Decryption)
    }
}

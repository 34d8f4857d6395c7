use serde::{Deserialize, Serialize};

/// Ciphertext produced by the secret envelope.
///
/// The "is this field encrypted" marker is the type itself: a plaintext
/// `String` cannot be stored where a `SealedSecret` belongs, and a sealed
/// value cannot be used without going back through the envelope.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct SealedSecret(String);

impl SealedSecret {
    /// Wrap ciphertext coming out of the envelope or out of storage.
    pub fn new(ciphertext: String) -> Self {
        Self(ciphertext)
    }

    /// The ciphertext as stored at rest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Ciphertext stays out of debug output.
impl std::fmt::Debug for SealedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SealedSecret(..)")
    }
}

//! Secret encryption for change requests
//!
//! Secret-typed values are encrypted before they are recorded in a change
//! request. [`AesGcmEncryptor`] uses AES-256-GCM with a random 12-byte
//! nonce and encodes `hex(nonce || ciphertext)`.

use aes_gcm::{
    aead::{Aead, AeadCore, OsRng},
    Aes256Gcm, KeyInit, Nonce,
};

/// Nonce length for AES-GCM (12 bytes standard)
pub const NONCE_LENGTH: usize = 12;

/// Key length for AES-256 (32 bytes)
pub const KEY_LENGTH: usize = 32;

/// Opaque encryption of secret values
pub trait SecretEncryptor: Send + Sync {
    /// # Errors
    /// Returns error if encryption fails
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError>;
}

/// AES-256-GCM encryptor
#[derive(Clone)]
pub struct AesGcmEncryptor {
    key: [u8; KEY_LENGTH],
}

impl std::fmt::Debug for AesGcmEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmEncryptor").finish_non_exhaustive()
    }
}

impl AesGcmEncryptor {
    /// # Errors
    /// Returns [`CryptoError::InvalidKeyLength`] unless the key is 32 bytes
    pub fn new(key: impl AsRef<[u8]>) -> Result<Self, CryptoError> {
        let key = key.as_ref();
        let key: [u8; KEY_LENGTH] = key
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: KEY_LENGTH,
                actual: key.len(),
            })?;
        Ok(Self { key })
    }

    /// Key given as 64 hex characters
    ///
    /// # Errors
    /// Returns error if the text is not hex or has the wrong length
    pub fn from_hex(key: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(key.trim()).map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Self::new(bytes)
    }

    /// Fresh random key
    #[must_use]
    pub fn generate() -> Self {
        let generated = Aes256Gcm::generate_key(&mut OsRng);
        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(&generated);
        Self { key }
    }

    fn cipher(&self) -> Result<Aes256Gcm, CryptoError> {
        Aes256Gcm::new_from_slice(&self.key).map_err(|e| CryptoError::EncryptionFailed {
            reason: format!("failed to create cipher: {e}"),
        })
    }

    /// Reverse of [`SecretEncryptor::encrypt`]
    ///
    /// # Errors
    /// Returns error if the input is malformed or authentication fails
    pub fn decrypt(&self, encoded: &str) -> Result<String, CryptoError> {
        let bytes = hex::decode(encoded).map_err(|e| CryptoError::DecryptionFailed {
            reason: format!("not hex: {e}"),
        })?;
        if bytes.len() < NONCE_LENGTH {
            return Err(CryptoError::DecryptionFailed {
                reason: format!("ciphertext shorter than {NONCE_LENGTH} byte nonce"),
            });
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LENGTH);
        let plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| CryptoError::DecryptionFailed {
                reason: format!("decryption failed: {e}"),
            })?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::DecryptionFailed {
            reason: "plaintext is not UTF-8".to_string(),
        })
    }
}

impl SecretEncryptor for AesGcmEncryptor {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher()?
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed {
                reason: format!("encryption failed: {e}"),
            })?;
        let mut out = nonce.to_vec();
        out.extend_from_slice(&ciphertext);
        Ok(hex::encode(out))
    }
}

/// Errors raised by secret encryption
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    #[error("decryption failed: {reason}")]
    DecryptionFailed { reason: String },
}

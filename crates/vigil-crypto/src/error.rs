//! Cryptography error types.

use thiserror::Error;
use vigil_core::VigilError;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("at least one encryption key is required")]
    NoKeys,

    #[error("failed to decode key for version {version}: {source}")]
    KeyDecode {
        version: u32,
        source: base64::DecodeError,
    },

    #[error("key for version {version} must be 32 bytes for AES-256, got {len}")]
    KeyLength { version: u32, len: usize },

    #[error("current version {0} not found in key registry")]
    CurrentVersionMissing(u32),

    #[error("key version {0} not found")]
    UnknownVersion(u32),

    #[error("key version {0} is already installed")]
    VersionInUse(u32),

    #[error("failed to decode HMAC secret: {0}")]
    SecretDecode(base64::DecodeError),

    #[error("failed to decode ciphertext: {0}")]
    CiphertextDecode(base64::DecodeError),

    #[error("ciphertext too short")]
    CiphertextTooShort,

    #[error("AES-GCM {op} failed")]
    Aead { op: &'static str },

    #[error("decrypted payload is not valid UTF-8")]
    Utf8,
}

impl From<CryptoError> for VigilError {
    fn from(err: CryptoError) -> Self {
        VigilError::Crypto(err.to_string())
    }
}

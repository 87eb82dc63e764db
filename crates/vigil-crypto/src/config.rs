//! Encryption configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the cryptographic primitive service.
///
/// Keys are positional: entry `i` of `keys_base64` becomes registry
/// version `i + 1`. Every key must decode to exactly 32 bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Base64-encoded 256-bit AES keys, oldest first.
    pub keys_base64: Vec<String>,
    /// Registry version used for new encryptions and signature stamping.
    pub current_key_version: u32,
    /// Base64-encoded secret for the record-signature HMAC.
    pub hmac_secret_base64: String,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            keys_base64: Vec::new(),
            current_key_version: 1,
            hmac_secret_base64: String::new(),
        }
    }
}

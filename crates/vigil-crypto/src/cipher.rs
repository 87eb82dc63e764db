//! Versioned key registry and AES-256-GCM field encryption.
//!
//! Ciphertext framing is `base64(nonce || ciphertext || tag)` with a
//! random 12-byte nonce, so a single string column can carry the whole
//! sealed value.

use std::collections::HashMap;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parking_lot::RwLock;

use crate::config::EncryptionConfig;
use crate::error::CryptoError;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Versioned key state behind the registry lock. Rotation takes the write
/// lock; everything else reads.
struct KeyRegistry {
    keys: HashMap<u32, [u8; KEY_LEN]>,
    current: u32,
}

/// Cryptographic primitive service: key registry, AES-256-GCM field
/// encryption, record signatures, and hash-chain links.
///
/// Signing lives in the [`signer`](crate::signer) module as a second impl
/// block; the HMAC secret is fixed for the registry's lifetime and is not
/// part of the versioned key set.
pub struct FieldCipher {
    registry: RwLock<KeyRegistry>,
    pub(crate) hmac_secret: Vec<u8>,
}

impl FieldCipher {
    /// Build the registry from configuration.
    ///
    /// Fails if no keys are configured, any key is not a base64-encoded
    /// 32-byte value, or the configured current version is absent.
    pub fn new(config: &EncryptionConfig) -> Result<Self, CryptoError> {
        if config.keys_base64.is_empty() {
            return Err(CryptoError::NoKeys);
        }

        let mut keys = HashMap::with_capacity(config.keys_base64.len());
        for (i, key_b64) in config.keys_base64.iter().enumerate() {
            let version = i as u32 + 1;
            let decoded = STANDARD
                .decode(key_b64)
                .map_err(|source| CryptoError::KeyDecode { version, source })?;
            let key: [u8; KEY_LEN] = decoded
                .try_into()
                .map_err(|bad: Vec<u8>| CryptoError::KeyLength {
                    version,
                    len: bad.len(),
                })?;
            keys.insert(version, key);
        }

        if !keys.contains_key(&config.current_key_version) {
            return Err(CryptoError::CurrentVersionMissing(
                config.current_key_version,
            ));
        }

        let hmac_secret = STANDARD
            .decode(&config.hmac_secret_base64)
            .map_err(CryptoError::SecretDecode)?;

        Ok(Self {
            registry: RwLock::new(KeyRegistry {
                keys,
                current: config.current_key_version,
            }),
            hmac_secret,
        })
    }

    /// The registry version used for new encryptions and signatures.
    pub fn current_version(&self) -> u32 {
        self.registry.read().current
    }

    /// Install a new key and make it current. Installed versions are
    /// never removed and never replaced.
    pub fn rotate(&self, new_version: u32, key_base64: &str) -> Result<(), CryptoError> {
        let decoded = STANDARD
            .decode(key_base64)
            .map_err(|source| CryptoError::KeyDecode {
                version: new_version,
                source,
            })?;
        let key: [u8; KEY_LEN] = decoded
            .try_into()
            .map_err(|bad: Vec<u8>| CryptoError::KeyLength {
                version: new_version,
                len: bad.len(),
            })?;

        let mut registry = self.registry.write();
        if registry.keys.contains_key(&new_version) {
            return Err(CryptoError::VersionInUse(new_version));
        }
        registry.keys.insert(new_version, key);
        registry.current = new_version;
        Ok(())
    }

    /// Encrypt with the current key. Returns the framed ciphertext and
    /// the key version that sealed it.
    pub fn encrypt(&self, plaintext: &str) -> Result<(String, u32), CryptoError> {
        let (key, version) = {
            let registry = self.registry.read();
            (registry.keys[&registry.current], registry.current)
        };

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Aead { op: "encrypt" })?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok((STANDARD.encode(combined), version))
    }

    /// Decrypt a framed ciphertext sealed under `version`.
    pub fn decrypt(&self, ciphertext_b64: &str, version: u32) -> Result<String, CryptoError> {
        let key = {
            let registry = self.registry.read();
            *registry
                .keys
                .get(&version)
                .ok_or(CryptoError::UnknownVersion(version))?
        };

        let combined = STANDARD
            .decode(ciphertext_b64)
            .map_err(CryptoError::CiphertextDecode)?;
        if combined.len() <= NONCE_LEN {
            return Err(CryptoError::CiphertextTooShort);
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CryptoError::Aead { op: "decrypt" })?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::Utf8)
    }

    /// Decrypt under `old_version` and re-seal under the current key.
    /// Used by key-rotation passes over stored payloads.
    pub fn re_encrypt(
        &self,
        ciphertext_b64: &str,
        old_version: u32,
    ) -> Result<(String, u32), CryptoError> {
        let plaintext = self.decrypt(ciphertext_b64, old_version)?;
        self.encrypt(&plaintext)
    }
}

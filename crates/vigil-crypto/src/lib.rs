//! VIGIL Crypto — versioned symmetric-key registry, per-record digital
//! signatures (HMAC-SHA-256), hash-chain linking, and AES-256-GCM payload
//! encryption.
//!
//! Pure and synchronous: this crate performs no I/O and never suspends.

pub mod cipher;
pub mod config;
pub mod error;
pub mod signer;

pub use cipher::FieldCipher;
pub use config::EncryptionConfig;
pub use error::CryptoError;

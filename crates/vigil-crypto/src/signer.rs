//! Record signatures and hash-chain links.
//!
//! The digital signature is an HMAC-SHA-256 over the event's canonical
//! binding string, hex-encoded. Verification recomputes and compares in
//! constant time. A verification failure on a read path is never a local
//! recovery condition — it means tampering or corruption.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use vigil_core::AuditEvent;

use crate::cipher::FieldCipher;

type HmacSha256 = Hmac<Sha256>;

impl FieldCipher {
    /// HMAC-SHA-256 over `data`, hex-encoded.
    pub fn hmac_hex(&self, data: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.hmac_secret)
            .expect("HMAC can take key of any size");
        mac.update(data.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time HMAC verification.
    pub fn verify_hmac(&self, data: &str, signature_hex: &str) -> bool {
        let expected = self.hmac_hex(data);
        constant_time_eq(expected.as_bytes(), signature_hex.as_bytes())
    }

    /// Sign an audit event's binding string.
    pub fn sign(&self, event: &AuditEvent) -> String {
        self.hmac_hex(&event.binding_string())
    }

    /// Verify an audit event against its stored signature.
    pub fn verify(&self, event: &AuditEvent) -> bool {
        self.verify_hmac(&event.binding_string(), &event.digital_signature)
    }

    /// Hash linking a record to its predecessor:
    /// `SHA-256(prev_hash || current_bytes)`, hex-encoded.
    pub fn hash_chain(&self, prev_hash: &str, current_bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(prev_hash.as_bytes());
        hasher.update(current_bytes);
        hex::encode(hasher.finalize())
    }

    /// Verify that a record belongs to the chain.
    pub fn verify_chain(&self, prev_hash: &str, current_bytes: &[u8], expected: &str) -> bool {
        self.hash_chain(prev_hash, current_bytes) == expected
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

//! Attestation record sealing.
//!
//! At startup the three record fields are sealed separately under the AP's
//! attestation public key, and a digest over the plaintext concatenation
//! (Location, then Date, then Customer) is retained. The sealed set is
//! write-once per boot; the plaintexts are never used again.

use busguard_common::crypto::{sha256_concat, SealKey, HASH_SIZE};
use busguard_common::Result;

/// The plaintext record, as injected at build time.
#[derive(Debug, Clone)]
pub struct AttestationRecord {
    pub location: String,
    pub date: String,
    pub customer: String,
}

impl AttestationRecord {
    pub fn new(location: &str, date: &str, customer: &str) -> Self {
        Self {
            location: location.to_string(),
            date: date.to_string(),
            customer: customer.to_string(),
        }
    }
}

/// The sealed record: three constant-length ciphertexts plus the digest that
/// binds them.
pub struct SealedAttestation {
    pub customer: Vec<u8>,
    pub location: Vec<u8>,
    pub date: Vec<u8>,
    pub digest: [u8; HASH_SIZE],
}

impl SealedAttestation {
    /// Seal each field under the AP attestation key. Fails when a field
    /// exceeds the envelope, which is init-fatal for the image.
    pub fn seal(key: &SealKey, record: &AttestationRecord) -> Result<Self> {
        let digest = sha256_concat(&[
            record.location.as_bytes(),
            record.date.as_bytes(),
            record.customer.as_bytes(),
        ]);
        Ok(Self {
            customer: key.seal(record.customer.as_bytes())?,
            location: key.seal(record.location.as_bytes())?,
            date: key.seal(record.date.as_bytes())?,
            digest,
        })
    }
}

//! Cryptographic primitives: SHA-256, the AES-128 block cipher, and the
//! RSA-OAEP envelope keys used by the secure channel and the attestation
//! record.
//!
//! Key material arrives as PKCS#1 DER blobs compiled into each firmware
//! image. A `SealKey` is the peer's public half (encrypt only); an `OpenKey`
//! is the local private half (decrypt only). Ciphertext length always equals
//! the modulus length, so frames stay constant-sized regardless of payload.

use crate::{Error, Result};
use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

/// SHA-256 digest length.
pub const HASH_SIZE: usize = 32;

/// AES-128 block and key lengths.
pub const BLOCK_SIZE: usize = 16;
pub const KEY_SIZE: usize = 16;

/// Bytes of a modulus consumed by OAEP-SHA256 padding.
pub const OAEP_OVERHEAD: usize = 2 * HASH_SIZE + 2;

/// Hash arbitrary data.
pub fn sha256(data: &[u8]) -> [u8; HASH_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash a sequence of segments as if concatenated.
pub fn sha256_concat(parts: &[&[u8]]) -> [u8; HASH_SIZE] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Hash data and hex-encode the digest (64 lowercase characters).
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Encrypt a single AES-128 block in place. Primitive only; the handshake
/// does not invoke it.
pub fn encrypt_block(key: &[u8; KEY_SIZE], block: &mut [u8; BLOCK_SIZE]) {
    let cipher = Aes128::new(GenericArray::from_slice(key));
    cipher.encrypt_block(GenericArray::from_mut_slice(block));
}

/// Decrypt a single AES-128 block in place.
pub fn decrypt_block(key: &[u8; KEY_SIZE], block: &mut [u8; BLOCK_SIZE]) {
    let cipher = Aes128::new(GenericArray::from_slice(key));
    cipher.decrypt_block(GenericArray::from_mut_slice(block));
}

/// Fill a buffer from the OS entropy source.
pub fn rng_fill(out: &mut [u8]) {
    OsRng.fill_bytes(out);
}

/// The peer's RSA public key: encrypt-only envelope half.
#[derive(Clone)]
pub struct SealKey {
    key: RsaPublicKey,
}

impl SealKey {
    /// Parse a PKCS#1 DER public key blob.
    pub fn from_pkcs1_der(der: &[u8]) -> Result<Self> {
        let key = RsaPublicKey::from_pkcs1_der(der)
            .map_err(|e| Error::Crypto(format!("failed to parse RSA public key: {e}")))?;
        Ok(Self { key })
    }

    pub fn from_public(key: RsaPublicKey) -> Self {
        Self { key }
    }

    /// Modulus length in bytes; every ciphertext is exactly this long.
    pub fn modulus_len(&self) -> usize {
        self.key.size()
    }

    /// Largest plaintext the envelope accepts.
    pub fn max_plaintext_len(&self) -> usize {
        self.modulus_len().saturating_sub(OAEP_OVERHEAD)
    }

    /// OAEP-SHA256 encrypt. Fails on oversized plaintext.
    pub fn seal(&self, plain: &[u8]) -> Result<Vec<u8>> {
        if plain.len() > self.max_plaintext_len() {
            return Err(Error::Crypto(format!(
                "plaintext of {} bytes exceeds envelope capacity of {}",
                plain.len(),
                self.max_plaintext_len()
            )));
        }
        self.key
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plain)
            .map_err(|e| Error::Crypto(format!("RSA encryption failed: {e}")))
    }
}

/// The local RSA private key: decrypt-only envelope half.
#[derive(Clone)]
pub struct OpenKey {
    key: RsaPrivateKey,
}

impl OpenKey {
    /// Parse a PKCS#1 DER private key blob.
    pub fn from_pkcs1_der(der: &[u8]) -> Result<Self> {
        let key = RsaPrivateKey::from_pkcs1_der(der)
            .map_err(|e| Error::Crypto(format!("failed to parse RSA private key: {e}")))?;
        Ok(Self { key })
    }

    pub fn from_private(key: RsaPrivateKey) -> Self {
        Self { key }
    }

    /// Modulus length in bytes.
    pub fn modulus_len(&self) -> usize {
        self.key.size()
    }

    /// The matching public half. Deployed images carry the peer's public key
    /// as an independent blob; this exists for key tooling and tests.
    pub fn seal_key(&self) -> SealKey {
        SealKey::from_public(RsaPublicKey::from(&self.key))
    }

    /// OAEP-SHA256 decrypt.
    pub fn open(&self, cipher: &[u8]) -> Result<Vec<u8>> {
        self.key
            .decrypt(Oaep::new::<Sha256>(), cipher)
            .map_err(|e| Error::Crypto(format!("RSA decryption failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_open_key() -> OpenKey {
        // 1024-bit keeps test key generation fast; deployments provision
        // their own blobs.
        OpenKey::from_private(RsaPrivateKey::new(&mut OsRng, 1024).unwrap())
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha256_concat_matches_flat() {
        let flat = sha256(b"McLean08/08/08Fritz");
        let parts = sha256_concat(&[b"McLean", b"08/08/08", b"Fritz"]);
        assert_eq!(flat, parts);
    }

    #[test]
    fn test_aes_block_roundtrip() {
        let key = [0x42u8; KEY_SIZE];
        let plain = *b"sixteen byte msg";
        let mut block = plain;
        encrypt_block(&key, &mut block);
        assert_ne!(block, plain);
        decrypt_block(&key, &mut block);
        assert_eq!(block, plain);
    }

    #[test]
    fn test_rsa_roundtrip_all_lengths() {
        let open = test_open_key();
        let seal = open.seal_key();
        assert_eq!(seal.modulus_len(), 128);

        for len in [0, 1, 20, seal.max_plaintext_len()] {
            let msg: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let cipher = seal.seal(&msg).unwrap();
            assert_eq!(cipher.len(), seal.modulus_len());
            assert_eq!(open.open(&cipher).unwrap(), msg);
        }
    }

    #[test]
    fn test_rsa_rejects_oversized_plaintext() {
        let open = test_open_key();
        let seal = open.seal_key();
        let msg = vec![0u8; seal.max_plaintext_len() + 1];
        assert!(matches!(seal.seal(&msg), Err(Error::Crypto(_))));
    }

    #[test]
    fn test_rsa_rejects_tampered_ciphertext() {
        let open = test_open_key();
        let seal = open.seal_key();
        let mut cipher = seal.seal(b"attestation record").unwrap();
        cipher[40] ^= 0x01;
        assert!(open.open(&cipher).is_err());
    }

    #[test]
    fn test_rng_fill_varies() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        rng_fill(&mut a);
        rng_fill(&mut b);
        assert_ne!(a, b);
    }
}

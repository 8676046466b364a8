//! Build-time deployment parameters.
//!
//! Provisioning tooling rewrites this module (and the DER blobs under
//! `keys/`) for each deployment; the values below are the reference test
//! deployment.

use busguard_common::ComponentId;

/// SHA-256 of the operator PIN, hex-encoded.
pub const AP_PIN_HASH: &str = "8d969eef6ecad3c29a3a629280e686cf0c3f5d5a86aff3ca12020c923adc6c92";

/// SHA-256 of the replacement token, hex-encoded.
pub const AP_TOKEN_HASH: &str =
    "9f9f5111f7b27a781f1f1ddde5ebc2dd2b796bfc7365c9c28b548e564176929f";

/// Component IDs seeded into flash on first boot.
pub const COMPONENT_IDS: &[ComponentId] = &[0x11111124, 0x11111125];

/// Banner printed once every Component has booted.
pub const AP_BOOT_MSG: &str = "Test boot message";

/// Seed for the nonce PRNG.
pub const AP_SEED: u64 = 0x8f3a_11c2_9d40_77e5;

/// AP attestation private key (PKCS#1 DER). Decrypts attestation records and
/// opens Component-to-AP channel traffic.
pub static AP_ATTEST_PRIV_DER: &[u8] = include_bytes!("../keys/ap_attest_priv.der");

/// Component channel public key (PKCS#1 DER). Seals AP-to-Component channel
/// traffic.
pub static COMP_CHAN_PUB_DER: &[u8] = include_bytes!("../keys/comp_chan_pub.der");

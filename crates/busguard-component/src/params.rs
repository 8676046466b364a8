//! Build-time deployment parameters for this Component image.
//!
//! Provisioning tooling rewrites this module (and the DER blobs under
//! `keys/`) per Component; the values below are the reference test
//! deployment.

use busguard_common::ComponentId;

pub const COMPONENT_ID: ComponentId = 0x11111124;

/// Banner returned when the AP commits the boot.
pub const COMPONENT_BOOT_MSG: &str = "Component boot";

/// The confidential attestation record.
pub const ATTESTATION_LOC: &str = "McLean";
pub const ATTESTATION_DATE: &str = "08/08/08";
pub const ATTESTATION_CUSTOMER: &str = "Fritz";

/// Seed for the nonce PRNG.
pub const COMP_SEED: u64 = 0x51c0_ffee_0b0e_4a21;

/// AP attestation public key (PKCS#1 DER). Seals the attestation record and
/// Component-to-AP channel traffic.
pub static AP_ATTEST_PUB_DER: &[u8] = include_bytes!("../keys/ap_attest_pub.der");

/// Component channel private key (PKCS#1 DER). Opens AP-to-Component channel
/// traffic.
pub static COMP_CHAN_PRIV_DER: &[u8] = include_bytes!("../keys/comp_chan_priv.der");

//! Protocol error taxonomy shared by both firmware images.

use thiserror::Error;

/// Everything that can go wrong between the operator prompt and a Component.
///
/// All variants are non-fatal at the command loop: the AP logs them and
/// returns to the prompt. Only init-time failures (key decode, flash read,
/// RNG) abort startup.
#[derive(Debug, Error)]
pub enum Error {
    /// Bus timeout, missing device, or oversized frame.
    #[error("bus transport failure: {0}")]
    Transport(String),

    /// RSA encrypt/decrypt rejected the operation, or a payload exceeds the
    /// envelope capacity.
    #[error("crypto operation rejected: {0}")]
    Crypto(String),

    /// An echoed `nonce1` or a required `nonce2` differs from what was sent.
    #[error("nonce mismatch")]
    NonceMismatch,

    /// The responding Component reported an ID other than the provisioned one.
    #[error("responder identity mismatch")]
    IdentityMismatch,

    /// The per-message plaintext digest did not match the recovered plaintext.
    #[error("message digest mismatch")]
    ChannelIntegrity,

    /// The attestation record failed its integrity check.
    #[error("attestation data failed integrity check")]
    AttestationIntegrity,

    /// A `replace` target that is not in the provisioning record.
    #[error("component 0x{0:08x} is not provisioned for the system")]
    UnknownComponent(u32),

    /// A `replace` that would provision the same ID twice.
    #[error("component 0x{0:08x} is already provisioned")]
    DuplicateComponent(u32),

    /// PIN or token digest mismatch.
    #[error("invalid credential")]
    BadCredential,

    /// Flash page read/erase/write failure.
    #[error("flash access failure: {0}")]
    Flash(String),
}

/// Common result type for BusGuard operations.
pub type Result<T> = std::result::Result<T, Error>;

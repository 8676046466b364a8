//! BusGuard Common Library
//!
//! Shared functionality for the BusGuard AP/Component firmware pair:
//! - Wire message formats (commands, validate replies)
//! - Cryptography (RSA envelopes, SHA-256, AES primitive)
//! - Nonce service
//! - Bus transport seam (loopback bus, TCP bridge)
//! - Per-message secure channel

pub mod channel;
pub mod crypto;
pub mod error;
pub mod nonce;
pub mod transport;
pub mod wire;

pub use channel::SecureChannel;
pub use error::{Error, Result};
pub use wire::{BusAddr, ComponentId, Nonce};

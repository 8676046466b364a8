//! Operator credential gates.
//!
//! The PIN gates `attest`; the replacement token gates `replace`. Neither
//! secret is stored: the firmware carries only hex-encoded SHA-256 digests,
//! and entered lines are hashed and compared digest-to-digest in constant
//! time.

use crate::console;
use busguard_common::crypto::sha256_hex;
use busguard_common::{Error, Result};
use subtle::ConstantTimeEq;

/// Check an entered secret against a compiled-in hex digest.
pub fn digest_matches(input: &str, reference_hex: &str) -> bool {
    let digest_hex = sha256_hex(input.as_bytes());
    digest_hex.as_bytes().ct_eq(reference_hex.as_bytes()).into()
}

pub struct CredentialGate {
    pin_hash: &'static str,
    token_hash: &'static str,
}

impl CredentialGate {
    pub fn new(pin_hash: &'static str, token_hash: &'static str) -> Self {
        Self { pin_hash, token_hash }
    }

    /// Gate for `attest`. Prompts, hashes, compares.
    pub fn check_pin(&self) -> Result<()> {
        let input = console::recv_input("Enter pin: ")
            .map_err(|e| Error::Transport(e.to_string()))?;
        if digest_matches(&input, self.pin_hash) {
            console::print_debug("Pin Accepted!");
            Ok(())
        } else {
            console::print_error("Invalid PIN!");
            Err(Error::BadCredential)
        }
    }

    /// Gate for `replace`.
    pub fn check_token(&self) -> Result<()> {
        let input = console::recv_input("Enter token: ")
            .map_err(|e| Error::Transport(e.to_string()))?;
        if digest_matches(&input, self.token_hash) {
            console::print_debug("Token Accepted!");
            Ok(())
        } else {
            console::print_error("Invalid Token!");
            Err(Error::BadCredential)
        }
    }
}

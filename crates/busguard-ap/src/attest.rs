//! Attestation release, AP side.
//!
//! The record travels as exactly four frames: sealed Customer, sealed
//! Location, sealed Date, then the plaintext digest. The blobs are already
//! ciphertext under the AP attestation key, so they ride the channel's
//! sealed pass-through; the trailing digest is what binds them together.

use crate::console;
use crate::context::ApContext;
use crate::flash::FlashPage;
use busguard_common::crypto::{sha256_concat, HASH_SIZE};
use busguard_common::transport::{BusController, MAX_FRAME_LEN};
use busguard_common::wire::{id_to_addr, Command};
use busguard_common::{ComponentId, Error, Result};
use tracing::debug;

/// A decrypted, integrity-checked attestation record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationReport {
    pub customer: String,
    pub location: String,
    pub date: String,
}

impl<B: BusController, F: FlashPage> ApContext<B, F> {
    /// `attest`: fetch, open, and verify one Component's record.
    ///
    /// The caller has already passed the PIN gate.
    pub fn attest_component(&mut self, id: ComponentId) -> Result<AttestationReport> {
        let addr = id_to_addr(id);
        let mut link = self.bus.link(addr);
        self.channel.send(&mut link, &Command::Attest.to_bytes())?;

        // Exactly four frames: three sealed fields, then the digest
        let mut frames: Vec<Vec<u8>> = Vec::with_capacity(4);
        for _ in 0..4 {
            let mut buf = [0u8; MAX_FRAME_LEN];
            let n = self.channel.receive_sealed(&mut link, &mut buf)?;
            frames.push(buf[..n].to_vec());
        }

        let digest = frames.pop().unwrap_or_default();
        if digest.len() != HASH_SIZE {
            return Err(Error::AttestationIntegrity);
        }

        // A blob that fails to open is a tampered blob
        let mut fields = frames.into_iter();
        let mut open_field = |name: &str| -> Result<Vec<u8>> {
            let sealed = fields.next().unwrap_or_default();
            self.attest_key.open(&sealed).map_err(|e| {
                debug!(%e, field = name, "attestation blob failed to open");
                Error::AttestationIntegrity
            })
        };
        let customer = open_field("customer")?;
        let location = open_field("location")?;
        let date = open_field("date")?;

        let recomputed = sha256_concat(&[&location, &date, &customer]);
        if recomputed[..] != digest[..] {
            return Err(Error::AttestationIntegrity);
        }

        let report = AttestationReport {
            customer: String::from_utf8_lossy(&customer).into_owned(),
            location: String::from_utf8_lossy(&location).into_owned(),
            date: String::from_utf8_lossy(&date).into_owned(),
        };

        console::print_info(&format!("C>0x{id:08x}"));
        console::print_info(&format!("CUST>{}", report.customer));
        console::print_info(&format!("LOC>{}", report.location));
        console::print_info(&format!("DATE>{}", report.date));
        Ok(report)
    }
}

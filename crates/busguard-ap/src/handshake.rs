//! The SCAN / VALIDATE / BOOT handshake engine.
//!
//! Every transaction is one command out, one reply back, both through the
//! secure channel. The freshness contract: the AP's `nonce1` must come back
//! in the very reply it provoked, and a Component's `nonce2` must come back
//! to it in the BOOT that commits the handshake it was issued in.

use crate::console;
use crate::context::ApContext;
use crate::flash::FlashPage;
use busguard_common::transport::{BusController, MAX_FRAME_LEN};
use busguard_common::wire::{id_to_addr, BusAddr, Command, ValidateReply};
use busguard_common::{ComponentId, Error, Nonce, Result};
use tracing::{debug, warn};

/// What a scan saw on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub provisioned: Vec<ComponentId>,
    pub found: Vec<ComponentId>,
}

impl ScanReport {
    /// True when every provisioned Component answered as itself.
    pub fn all_present(&self) -> bool {
        self.provisioned.iter().all(|id| self.found.contains(id))
    }
}

impl<B: BusController, F: FlashPage> ApContext<B, F> {
    /// Send one command and read back the validate reply.
    pub(crate) fn transact(&mut self, addr: BusAddr, command: Command) -> Result<ValidateReply> {
        let mut link = self.bus.link(addr);
        self.channel.send(&mut link, &command.to_bytes())?;
        let mut buf = [0u8; MAX_FRAME_LEN];
        let n = self.channel.receive(&mut link, &mut buf)?;
        ValidateReply::from_bytes(&buf[..n])
    }

    /// `list`: probe every provisioned Component with a fresh challenge.
    ///
    /// Per-Component failures are reported and skipped; the command as a
    /// whole succeeds only if everything answered.
    pub fn scan_components(&mut self) -> ScanReport {
        let provisioned = self.store.list().to_vec();
        let mut found = Vec::new();

        for &id in &provisioned {
            console::print_info(&format!("P>0x{id:08x}"));

            let addr = id_to_addr(id);
            if self.reserved_addrs.contains(&addr) {
                warn!(
                    id = format_args!("0x{id:08x}"),
                    addr = format_args!("0x{addr:02x}"),
                    "provisioned component maps to a reserved address"
                );
                continue;
            }

            let nonce1 = self.nonces.fresh();
            let reply = match self.transact(addr, Command::Scan { challenge: nonce1 }) {
                Ok(reply) => reply,
                Err(e) => {
                    console::print_error("command failed");
                    debug!(%e, id = format_args!("0x{id:08x}"), "scan transaction failed");
                    continue;
                }
            };

            if reply.nonce1 != nonce1 {
                console::print_error(&format!("nonce1 value: {} invalid", reply.nonce1));
                continue;
            }

            console::print_info(&format!("F>0x{:08x}", reply.component_id));
            if reply.component_id == id {
                found.push(reply.component_id);
            }
        }

        let report = ScanReport { provisioned, found };
        if report.all_present() {
            console::print_success("List");
        } else {
            console::print_error("List failed");
        }
        report
    }

    /// Pre-boot proof: challenge every provisioned Component and collect the
    /// `nonce2` each one stakes on its own boot. Any mismatch aborts the
    /// whole flow before anything is told to BOOT.
    pub fn validate_components(&mut self) -> Result<Vec<(ComponentId, Nonce)>> {
        let ids = self.store.list().to_vec();
        let mut proofs = Vec::with_capacity(ids.len());

        for &id in &ids {
            let addr = id_to_addr(id);
            let nonce1 = self.nonces.fresh();

            let reply = self
                .transact(addr, Command::Validate { challenge: nonce1 })
                .map_err(|e| {
                    console::print_error("Could not validate component");
                    debug!(%e, id = format_args!("0x{id:08x}"), "validate transaction failed");
                    e
                })?;

            if reply.nonce1 != nonce1 {
                console::print_error(&format!("nonce1 value: {} invalid", reply.nonce1));
                return Err(Error::NonceMismatch);
            }
            if reply.component_id != id {
                console::print_error(&format!("Component ID: 0x{id:08x} invalid"));
                return Err(Error::IdentityMismatch);
            }

            proofs.push((id, reply.nonce2));
        }
        Ok(proofs)
    }

    /// Commit: hand every Component its own `nonce2` back and print the boot
    /// banner each returns.
    pub fn boot_components(&mut self, proofs: &[(ComponentId, Nonce)]) -> Result<Vec<String>> {
        let mut banners = Vec::with_capacity(proofs.len());

        for &(id, nonce2) in proofs {
            let addr = id_to_addr(id);
            let mut link = self.bus.link(addr);
            self.channel
                .send(&mut link, &Command::Boot { proof: nonce2 }.to_bytes())?;

            let mut buf = [0u8; MAX_FRAME_LEN];
            let n = self.channel.receive(&mut link, &mut buf).map_err(|e| {
                console::print_error("Could not boot component");
                debug!(%e, id = format_args!("0x{id:08x}"), "boot transaction failed");
                e
            })?;

            let banner = String::from_utf8_lossy(&buf[..n]).into_owned();
            console::print_info(&format!("0x{id:08x}>{banner}"));
            banners.push(banner);
        }
        Ok(banners)
    }

    /// `boot`: validate everything, then boot everything, then claim success.
    pub fn attempt_boot(&mut self) -> Result<Vec<String>> {
        let proofs = self.validate_components().map_err(|e| {
            console::print_error("Components could not be validated");
            e
        })?;
        debug!("all components validated");

        let banners = self.boot_components(&proofs).map_err(|e| {
            console::print_error("Failed to boot all components");
            e
        })?;

        console::print_info(&format!("AP>{}", crate::params::AP_BOOT_MSG));
        console::print_success("Boot");
        Ok(banners)
    }
}

//! Command dispatcher and handshake state.
//!
//! One command is serviced fully before the next is read. The handshake
//! state is a single slot, not a map: at most one boot handshake is in
//! flight, a re-issued VALIDATE overwrites the pending `nonce2`, and a BOOT
//! that cannot present the pending nonce is refused without a reply (the AP
//! sees the silence as a transport timeout).

use crate::attest::{AttestationRecord, SealedAttestation};
use crate::params;
use busguard_common::crypto::{OpenKey, SealKey};
use busguard_common::nonce::NonceSource;
use busguard_common::transport::{FrameLink, MAX_FRAME_LEN};
use busguard_common::wire::{Command, ValidateReply};
use busguard_common::{ComponentId, Error, Nonce, Result, SecureChannel};
use tracing::{debug, info, warn};

/// Handshake progress. BOOT is honored only from `NonceIssued` with the
/// matching proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    NonceIssued(Nonce),
    Booted,
}

/// The Component's owned root state; no globals.
pub struct ComponentContext {
    id: ComponentId,
    boot_msg: String,
    channel: SecureChannel,
    nonces: NonceSource,
    sealed: SealedAttestation,
    phase: Phase,
}

impl ComponentContext {
    /// Assemble a context from explicit parts (tests provision their own).
    pub fn new(
        id: ComponentId,
        boot_msg: &str,
        record: &AttestationRecord,
        nonce_seed: u64,
        ap_pub: SealKey,
        chan_priv: OpenKey,
    ) -> Result<Self> {
        let sealed = SealedAttestation::seal(&ap_pub, record)?;
        let channel = SecureChannel::new(ap_pub, chan_priv)?;
        if boot_msg.len() > channel.max_plaintext_len() {
            return Err(Error::Crypto(format!(
                "boot banner of {} bytes exceeds the envelope",
                boot_msg.len()
            )));
        }
        info!(id = format_args!("0x{id:08x}"), "attestation record sealed");
        Ok(Self {
            id,
            boot_msg: boot_msg.to_string(),
            channel,
            nonces: NonceSource::seeded(nonce_seed),
            sealed,
            phase: Phase::Idle,
        })
    }

    /// Assemble a context from the compiled-in deployment parameters.
    pub fn from_params() -> Result<Self> {
        let ap_pub = SealKey::from_pkcs1_der(params::AP_ATTEST_PUB_DER)?;
        let chan_priv = OpenKey::from_pkcs1_der(params::COMP_CHAN_PRIV_DER)?;
        let record = AttestationRecord::new(
            params::ATTESTATION_LOC,
            params::ATTESTATION_DATE,
            params::ATTESTATION_CUSTOMER,
        );
        Self::new(
            params::COMPONENT_ID,
            params::COMPONENT_BOOT_MSG,
            &record,
            params::COMP_SEED,
            ap_pub,
            chan_priv,
        )
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_booted(&self) -> bool {
        self.phase == Phase::Booted
    }

    /// Receive and service one command from the AP.
    pub fn service<L: FrameLink>(&mut self, link: &mut L) -> Result<()> {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let n = self.channel.receive(link, &mut buf)?;
        let command = Command::from_bytes(&buf[..n])?;
        debug!(opcode = ?command.opcode(), "command received");

        match command {
            Command::Scan { challenge } => self.reply_validate(link, challenge, 0),
            Command::Validate { challenge } => {
                let nonce2 = self.nonces.fresh();
                self.phase = Phase::NonceIssued(nonce2);
                self.reply_validate(link, challenge, nonce2)
            }
            Command::Boot { proof } => self.process_boot(link, proof),
            Command::Attest => self.process_attest(link),
        }
    }

    /// Echo the AP's challenge with our identity (and pending nonce, if the
    /// opcode issued one).
    fn reply_validate<L: FrameLink>(
        &mut self,
        link: &mut L,
        nonce1: Nonce,
        nonce2: Nonce,
    ) -> Result<()> {
        let reply = ValidateReply { component_id: self.id, nonce1, nonce2 };
        self.channel.send(link, &reply.to_bytes())?;
        Ok(())
    }

    fn process_boot<L: FrameLink>(&mut self, link: &mut L, proof: Nonce) -> Result<()> {
        match self.phase {
            Phase::NonceIssued(expected) if expected == proof => {
                self.channel.send(link, self.boot_msg.as_bytes())?;
                self.phase = Phase::Booted;
                info!("boot committed");
                Ok(())
            }
            Phase::NonceIssued(_) => {
                warn!("boot proof does not match the issued nonce, refusing");
                Ok(())
            }
            Phase::Idle => {
                warn!("boot without a prior validate, refusing");
                Ok(())
            }
            Phase::Booted => {
                warn!("boot after boot, refusing");
                Ok(())
            }
        }
    }

    /// Release the sealed record: exactly four frames, Customer, Location,
    /// Date, digest.
    fn process_attest<L: FrameLink>(&mut self, link: &mut L) -> Result<()> {
        self.channel.send_sealed(link, &self.sealed.customer)?;
        self.channel.send_sealed(link, &self.sealed.location)?;
        self.channel.send_sealed(link, &self.sealed.date)?;
        self.channel.send_sealed(link, &self.sealed.digest)?;
        Ok(())
    }
}

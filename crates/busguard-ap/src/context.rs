//! The AP's owned root state.
//!
//! Everything mutable (provisioning store, channel keys, nonce source, bus
//! handle) lives here, created once in `init` and passed explicitly. There
//! are no globals.

use crate::flash::FlashPage;
use crate::params;
use crate::provision::ProvisionStore;
use busguard_common::crypto::{OpenKey, SealKey};
use busguard_common::nonce::NonceSource;
use busguard_common::transport::BusController;
use busguard_common::wire::{BusAddr, DEFAULT_RESERVED_ADDRS};
use busguard_common::{Result, SecureChannel};
use tracing::debug;

pub struct ApContext<B: BusController, F: FlashPage> {
    pub bus: B,
    pub store: ProvisionStore<F>,
    pub channel: SecureChannel,
    /// The attestation half of the AP keypair; also opens channel traffic.
    pub attest_key: OpenKey,
    pub nonces: NonceSource,
    /// Bus addresses never contacted (hardware quirk).
    pub reserved_addrs: Vec<BusAddr>,
}

impl<B: BusController, F: FlashPage> ApContext<B, F> {
    /// Assemble a context from the compiled-in deployment parameters.
    pub fn init(bus: B, flash: F) -> Result<Self> {
        let attest_key = OpenKey::from_pkcs1_der(params::AP_ATTEST_PRIV_DER)?;
        let comp_pub = SealKey::from_pkcs1_der(params::COMP_CHAN_PUB_DER)?;
        debug!("key handles initialized");

        Self::assemble(bus, flash, params::COMPONENT_IDS, attest_key, comp_pub, params::AP_SEED)
    }

    /// Assemble a context from explicit parts (tests provision their own).
    pub fn assemble(
        bus: B,
        flash: F,
        seed_ids: &[busguard_common::ComponentId],
        attest_key: OpenKey,
        comp_pub: SealKey,
        nonce_seed: u64,
    ) -> Result<Self> {
        let channel = SecureChannel::new(comp_pub, attest_key.clone())?;
        let store = ProvisionStore::load(flash, seed_ids)?;
        Ok(Self {
            bus,
            store,
            channel,
            attest_key,
            nonces: NonceSource::seeded(nonce_seed),
            reserved_addrs: DEFAULT_RESERVED_ADDRS.to_vec(),
        })
    }
}

//! Flash-backed provisioning store.
//!
//! One page holds the record: magic word, Component count, then up to 32
//! IDs, all little-endian. A page without the magic word is the first-boot
//! state (or the aftermath of a power loss between erase and write) and is
//! re-seeded from the build-time ID list.

use crate::flash::FlashPage;
use busguard_common::{ComponentId, Error, Result};
use bytes::{Buf, BufMut};
use tracing::{debug, info};

/// Marks a programmed provisioning page.
pub const FLASH_MAGIC: u32 = 0xDEADBEEF;

/// Capacity of the record.
pub const MAX_COMPONENTS: usize = 32;

/// On-flash record size: magic + count + 32 ID slots.
pub const RECORD_SIZE: usize = 8 + 4 * MAX_COMPONENTS;

/// The decoded provisioning record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRecord {
    ids: Vec<ComponentId>,
}

impl ProvisionRecord {
    fn from_ids(ids: &[ComponentId]) -> Self {
        Self { ids: ids.to_vec() }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RECORD_SIZE);
        buf.put_u32_le(FLASH_MAGIC);
        buf.put_u32_le(self.ids.len() as u32);
        for &id in &self.ids {
            buf.put_u32_le(id);
        }
        buf.resize(RECORD_SIZE, 0);
        buf
    }

    /// Decode a page. `None` means the magic word is absent (first boot);
    /// a present magic with a malformed body is a flash fault.
    fn from_bytes(mut data: &[u8]) -> Result<Option<Self>> {
        if data.len() < 8 || data.get_u32_le() != FLASH_MAGIC {
            return Ok(None);
        }
        let count = data.get_u32_le() as usize;
        if count > MAX_COMPONENTS || data.remaining() < 4 * count {
            return Err(Error::Flash(format!(
                "provisioning record corrupt: count {count}"
            )));
        }
        let ids = (0..count).map(|_| data.get_u32_le()).collect();
        Ok(Some(Self { ids }))
    }
}

/// The store: a decoded record plus the page it lives on.
pub struct ProvisionStore<F: FlashPage> {
    flash: F,
    record: ProvisionRecord,
}

impl<F: FlashPage> ProvisionStore<F> {
    /// Read the page; seed and persist the build-time ID list if the magic
    /// word is absent.
    pub fn load(mut flash: F, seed_ids: &[ComponentId]) -> Result<Self> {
        let page = flash.read()?;
        let record = match ProvisionRecord::from_bytes(&page)? {
            Some(record) => {
                debug!(count = record.ids.len(), "provisioning record loaded");
                record
            }
            None => {
                info!("first boot, seeding provisioning record");
                if seed_ids.len() > MAX_COMPONENTS {
                    return Err(Error::Flash(format!(
                        "deployment provisions {} components, record holds {MAX_COMPONENTS}",
                        seed_ids.len()
                    )));
                }
                let record = ProvisionRecord::from_ids(seed_ids);
                flash.write(&record.to_bytes())?;
                record
            }
        };
        Ok(Self { flash, record })
    }

    /// Currently provisioned IDs, in record order.
    pub fn list(&self) -> &[ComponentId] {
        &self.record.ids
    }

    pub fn count(&self) -> usize {
        self.record.ids.len()
    }

    /// Swap `id_out` for `id_in` in place and rewrite the page.
    pub fn replace(&mut self, id_out: ComponentId, id_in: ComponentId) -> Result<()> {
        let slot = self
            .record
            .ids
            .iter()
            .position(|&id| id == id_out)
            .ok_or(Error::UnknownComponent(id_out))?;
        if id_in != id_out && self.record.ids.contains(&id_in) {
            return Err(Error::DuplicateComponent(id_in));
        }

        self.record.ids[slot] = id_in;
        self.flash.erase()?;
        self.flash.write(&self.record.to_bytes())?;
        debug!(
            removed = format_args!("0x{id_out:08x}"),
            added = format_args!("0x{id_in:08x}"),
            "provisioning record rewritten"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::{FlashPage, MemFlash};

    const SEED: &[ComponentId] = &[0x11111124, 0x11111125];

    #[test]
    fn test_first_boot_seeds_record() {
        let flash = MemFlash::new();
        let store = ProvisionStore::load(flash.clone(), SEED).unwrap();
        assert_eq!(store.list(), SEED);

        // The seeded record is persisted, not just in memory
        let mut flash_check = flash;
        let page = flash_check.read().unwrap();
        assert_eq!(page.len(), RECORD_SIZE);
        let mut header = &page[..8];
        assert_eq!(header.get_u32_le(), FLASH_MAGIC);
        assert_eq!(header.get_u32_le(), 2);
    }

    #[test]
    fn test_record_survives_reload() {
        let flash = MemFlash::new();
        {
            let mut store = ProvisionStore::load(flash.clone(), SEED).unwrap();
            store.replace(0x11111124, 0x22222222).unwrap();
        }
        // "Power cycle": reload from the same storage with the same seed
        let store = ProvisionStore::load(flash, SEED).unwrap();
        assert_eq!(store.list(), &[0x22222222, 0x11111125]);
    }

    #[test]
    fn test_replace_swaps_in_place() {
        let mut store = ProvisionStore::load(MemFlash::new(), SEED).unwrap();
        store.replace(0x11111124, 0x22222222).unwrap();
        assert_eq!(store.count(), 2);
        assert_eq!(store.list(), &[0x22222222, 0x11111125]);
        assert!(!store.list().contains(&0x11111124));
    }

    #[test]
    fn test_replace_unknown_component() {
        let mut store = ProvisionStore::load(MemFlash::new(), SEED).unwrap();
        let result = store.replace(0x33333333, 0x22222222);
        assert!(matches!(result, Err(Error::UnknownComponent(0x33333333))));
        assert_eq!(store.list(), SEED);
    }

    #[test]
    fn test_replace_repeated_fails_but_preserves_record() {
        let mut store = ProvisionStore::load(MemFlash::new(), SEED).unwrap();
        store.replace(0x11111124, 0x22222222).unwrap();
        // The out-ID is gone now; repetition cannot corrupt the record
        assert!(store.replace(0x11111124, 0x22222222).is_err());
        assert_eq!(store.count(), 2);
        assert_eq!(store.list(), &[0x22222222, 0x11111125]);
    }

    #[test]
    fn test_replace_self_is_idempotent() {
        let mut store = ProvisionStore::load(MemFlash::new(), SEED).unwrap();
        store.replace(0x11111125, 0x11111125).unwrap();
        store.replace(0x11111125, 0x11111125).unwrap();
        assert_eq!(store.list(), SEED);
    }

    #[test]
    fn test_replace_rejects_duplicate() {
        let mut store = ProvisionStore::load(MemFlash::new(), SEED).unwrap();
        let result = store.replace(0x11111124, 0x11111125);
        assert!(matches!(result, Err(Error::DuplicateComponent(0x11111125))));
        assert_eq!(store.list(), SEED);
    }

    #[test]
    fn test_corrupt_count_is_flash_error() {
        let mut flash = MemFlash::new();
        let mut page = Vec::new();
        page.put_u32_le(FLASH_MAGIC);
        page.put_u32_le(999);
        flash.write(&page).unwrap();
        assert!(matches!(
            ProvisionStore::load(flash, SEED),
            Err(Error::Flash(_))
        ));
    }

    #[test]
    fn test_interrupted_replace_reseeds() {
        // Power loss between erase and write leaves an unmagic page; the
        // next load falls back to the build-time defaults.
        let flash = MemFlash::new();
        {
            let _ = ProvisionStore::load(flash.clone(), SEED).unwrap();
        }
        let mut wiped = flash.clone();
        wiped.erase().unwrap();
        let store = ProvisionStore::load(flash, SEED).unwrap();
        assert_eq!(store.list(), SEED);
    }
}

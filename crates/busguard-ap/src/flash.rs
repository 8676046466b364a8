//! Flash page seam.
//!
//! The vendor flash driver exposes one erasable page to the provisioning
//! store. `FileFlash` is the host-side stand-in used by the binary; a blank
//! or missing file reads back empty, which the store treats as the unmagic
//! first-boot state. `MemFlash` backs tests and is cloneable so a test can
//! reload "after power cycle" from the same storage.

use busguard_common::{Error, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub trait FlashPage {
    /// Read the whole page. An erased page reads back empty.
    fn read(&mut self) -> Result<Vec<u8>>;

    /// Erase the page.
    fn erase(&mut self) -> Result<()>;

    /// Program the page.
    fn write(&mut self, data: &[u8]) -> Result<()>;
}

/// File-backed flash page.
pub struct FileFlash {
    path: PathBuf,
}

impl FileFlash {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FlashPage for FileFlash {
    fn read(&mut self) -> Result<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(Error::Flash(e.to_string())),
        }
    }

    fn erase(&mut self) -> Result<()> {
        fs::write(&self.path, []).map_err(|e| Error::Flash(e.to_string()))
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        fs::write(&self.path, data).map_err(|e| Error::Flash(e.to_string()))
    }
}

/// In-memory flash page with shared storage.
#[derive(Clone, Default)]
pub struct MemFlash {
    data: Arc<Mutex<Vec<u8>>>,
}

impl MemFlash {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemFlash {
    fn storage(&self) -> Result<std::sync::MutexGuard<'_, Vec<u8>>> {
        self.data
            .lock()
            .map_err(|_| Error::Flash("page storage poisoned".into()))
    }
}

impl FlashPage for MemFlash {
    fn read(&mut self) -> Result<Vec<u8>> {
        Ok(self.storage()?.clone())
    }

    fn erase(&mut self) -> Result<()> {
        self.storage()?.clear();
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        *self.storage()? = data.to_vec();
        Ok(())
    }
}

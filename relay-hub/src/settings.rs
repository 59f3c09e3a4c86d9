use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::{fs, io};
use tracing::debug;

/// Durable home for the last validated relay board address.
pub trait AddressStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, address: &str) -> Result<()>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nodemcu_ip: Option<String>,
}

/// JSON key-value file on disk.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AddressStore for SettingsFile {
    fn load(&self) -> Result<Option<String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let document: SettingsDocument = serde_json::from_str(&raw)?;
        Ok(document.nodemcu_ip)
    }

    fn save(&self, address: &str) -> Result<()> {
        let document = SettingsDocument {
            nodemcu_ip: Some(address.to_string()),
        };
        fs::write(&self.path, serde_json::to_vec_pretty(&document)?)?;
        debug!("Persisted device address to {}", self.path.display());
        Ok(())
    }
}

/// Process-local store, used when nothing should touch the disk.
#[derive(Debug, Default)]
pub struct MemoryAddressStore {
    address: Mutex<Option<String>>,
}

impl MemoryAddressStore {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            address: Mutex::new(initial),
        }
    }
}

impl AddressStore for MemoryAddressStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self
            .address
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone())
    }

    fn save(&self, address: &str) -> Result<()> {
        *self.address.lock().unwrap_or_else(|p| p.into_inner()) = Some(address.to_string());
        Ok(())
    }
}

//! Durable local projection of the cart.
//!
//! The whole cart state is written as one record after every mutation and
//! read back once at session start.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use cartwheel_core::{Coupon, LineItem};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed identifier the cart record is stored under.
pub const CART_STORAGE_KEY: &str = "cartwheel-cart";

/// Current record layout.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors reading or writing the cart record.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Unsupported cart record version {0}")]
    UnsupportedVersion(u32),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// The persisted cart: `{ items, appliedCoupon }` plus a layout version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub applied_coupon: Option<Coupon>,
}

const fn current_version() -> u32 {
    SNAPSHOT_VERSION
}

impl CartSnapshot {
    #[must_use]
    pub const fn new(items: Vec<LineItem>, applied_coupon: Option<Coupon>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            items,
            applied_coupon,
        }
    }
}

impl Default for CartSnapshot {
    fn default() -> Self {
        Self::new(Vec::new(), None)
    }
}

/// Backend for the durable cart record.
///
/// Single writer: only the cart store touches it.
pub trait CartStorage: Send + Sync {
    /// Read the record. `Ok(None)` when nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record exists but cannot be read or decoded.
    fn load(&self) -> Result<Option<CartSnapshot>, StorageError>;

    /// Replace the record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written.
    fn save(&self, snapshot: &CartSnapshot) -> Result<(), StorageError>;
}

/// JSON file at `<dir>/cartwheel-cart.json`, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct FileCartStorage {
    path: PathBuf,
}

impl FileCartStorage {
    /// Store the record inside `dir`. The directory is created on first save.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{CART_STORAGE_KEY}.json")),
        }
    }

    /// Location of the record.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CartStorage for FileCartStorage {
    fn load(&self) -> Result<Option<CartSnapshot>, StorageError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: CartSnapshot = serde_json::from_slice(&raw)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(StorageError::UnsupportedVersion(snapshot.version));
        }
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &CartSnapshot) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            serde_json::to_writer_pretty(&mut file, snapshot)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-process storage, shared between clones. Used by tests and embedders
/// that persist elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartStorage {
    record: Arc<Mutex<Option<CartSnapshot>>>,
}

impl MemoryCartStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing record.
    #[must_use]
    pub fn with_snapshot(snapshot: CartSnapshot) -> Self {
        Self {
            record: Arc::new(Mutex::new(Some(snapshot))),
        }
    }

    /// What is currently persisted.
    #[must_use]
    pub fn snapshot(&self) -> Option<CartSnapshot> {
        self.record.lock().ok().and_then(|guard| guard.clone())
    }
}

impl CartStorage for MemoryCartStorage {
    fn load(&self) -> Result<Option<CartSnapshot>, StorageError> {
        Ok(self.record.lock().map_err(|_| StorageError::Poisoned)?.clone())
    }

    fn save(&self, snapshot: &CartSnapshot) -> Result<(), StorageError> {
        *self.record.lock().map_err(|_| StorageError::Poisoned)? = Some(snapshot.clone());
        Ok(())
    }
}

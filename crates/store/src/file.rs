//! JSON-file-backed session store.
//!
//! Entries are cached in memory and written through to disk on every save,
//! so resume state survives process restarts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::debug;
use uplift_protocol::UploadId;

use crate::{SessionStore, StoreError, StoredUpload};

/// Persistent session store backed by a JSON file.
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, StoredUpload>>,
}

impl FileStore {
    /// Creates a store at `path`, loading any existing entries from disk.
    pub fn new(path: PathBuf) -> Result<Self, StoreError> {
        let entries = load_entries(&path)?;
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Writes the current entries to disk.
    fn persist(&self) -> Result<(), StoreError> {
        let entries = self.entries.read().unwrap();
        let json = serde_json::to_string_pretty(&*entries)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;
        debug!("persisted {} upload(s) to {:?}", entries.len(), self.path);
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn load(&self, key: &str) -> Option<StoredUpload> {
        self.entries.read().unwrap().get(key).cloned()
    }

    fn save(&self, key: &str, identity: &UploadId, offset: u64) -> Result<(), StoreError> {
        {
            let mut entries = self.entries.write().unwrap();
            entries.insert(
                key.to_string(),
                StoredUpload {
                    identity: identity.clone(),
                    offset,
                },
            );
        }
        self.persist()
    }

    fn clear(&self, key: &str) -> Result<(), StoreError> {
        {
            let mut entries = self.entries.write().unwrap();
            entries.remove(key);
        }
        self.persist()
    }
}

/// Loads entries from a JSON file on disk.
fn load_entries(path: &Path) -> Result<HashMap<String, StoredUpload>, StoreError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let data = std::fs::read_to_string(path)?;
    let entries: HashMap<String, StoredUpload> = serde_json::from_str(&data)?;
    debug!("loaded {} upload(s) from {:?}", entries.len(), path);
    Ok(entries)
}

/// Returns the default store path.
pub fn default_store_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("uplift").join("uploads.json"))
}

/// Returns the platform-specific config directory.
fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join(".config"))
    }
}

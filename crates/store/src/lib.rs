//! Durable resume state for uploads.
//!
//! A [`SessionStore`] maps a caller-chosen upload key (typically the source
//! file path) to the server-assigned identity and the last acknowledged
//! byte offset, so an interrupted upload resumes instead of restarting.

mod file;

pub use file::{FileStore, default_store_path};

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use uplift_protocol::UploadId;

/// Errors from resume-state persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Resume state for one upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUpload {
    pub identity: UploadId,
    pub offset: u64,
}

/// Durable mapping from upload key to resume state.
///
/// Each key has a single logical writer at a time; distinct keys may be
/// used concurrently.
pub trait SessionStore: Send + Sync {
    /// Returns the stored resume state for `key`, if any.
    fn load(&self, key: &str) -> Option<StoredUpload>;

    /// Records `(identity, offset)` for `key`, replacing any previous entry.
    fn save(&self, key: &str, identity: &UploadId, offset: u64) -> Result<(), StoreError>;

    /// Removes the entry for `key`.
    fn clear(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store; resume works within one process only.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredUpload>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, key: &str) -> Option<StoredUpload> {
        self.entries.read().unwrap().get(key).cloned()
    }

    fn save(&self, key: &str, identity: &UploadId, offset: u64) -> Result<(), StoreError> {
        self.entries.write().unwrap().insert(
            key.to_string(),
            StoredUpload {
                identity: identity.clone(),
                offset,
            },
        );
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().unwrap().remove(key);
        Ok(())
    }
}

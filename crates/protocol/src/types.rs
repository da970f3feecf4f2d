use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Default chunk size: 4 MiB.
///
/// Larger chunks reduce per-request overhead; servers may still accept
/// fewer bytes than sent.
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Default request payload cap: one chunk per request.
pub const DEFAULT_REQUEST_PAYLOAD_SIZE: usize = DEFAULT_CHUNK_SIZE;

/// Server-assigned identifier for one upload.
///
/// Opaque to everything in this workspace; for the HTTP transport it holds
/// the upload URL returned at creation time. All events and resume state
/// are correlated by this value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(String);

impl UploadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors from upload configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("no endpoint provided")]
    MissingEndpoint,

    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("request payload size {payload} is smaller than chunk size {chunk}")]
    PayloadSmallerThanChunk { payload: usize, chunk: usize },

    #[error("metadata key {0:?} contains a space or comma")]
    InvalidMetadataKey(String),
}

/// Configuration for one upload. Immutable once a session starts.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// URL used to create a new upload.
    pub endpoint: String,
    /// Maximum bytes read from the source per transfer step.
    pub chunk_size: usize,
    /// Maximum bytes per network request; chunks are coalesced up to this
    /// cap. Must be at least `chunk_size`.
    pub request_payload_size: usize,
    /// Custom header values sent with every request.
    pub headers: HashMap<String, String>,
    /// Additional metadata passed to the server only when creating the
    /// upload (filenames, content types, ...).
    pub metadata: HashMap<String, String>,
    /// When set, every request carries a SHA-256 digest of its body.
    pub send_checksums: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            request_payload_size: DEFAULT_REQUEST_PAYLOAD_SIZE,
            headers: HashMap::new(),
            metadata: HashMap::new(),
            send_checksums: false,
        }
    }
}

impl UploadConfig {
    /// Creates a configuration for `endpoint` with default sizes.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Checks the invariants a session relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.request_payload_size < self.chunk_size {
            return Err(ConfigError::PayloadSmallerThanChunk {
                payload: self.request_payload_size,
                chunk: self.chunk_size,
            });
        }
        for key in self.metadata.keys() {
            if key.is_empty() || key.contains(' ') || key.contains(',') {
                return Err(ConfigError::InvalidMetadataKey(key.clone()));
            }
        }
        Ok(())
    }
}

//! Upload error taxonomy.

use uplift_protocol::ConfigError;
use uplift_source::SourceError;
use uplift_store::StoreError;
use uplift_transport::TransportError;

/// Errors surfaced by an upload session.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Invalid configuration. Fatal; not retryable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The server rejected upload creation. No resumable state remains;
    /// retry with a fresh `start()`.
    #[error("upload creation failed: {0}")]
    Create(#[source] TransportError),

    /// A transfer failed mid-flight. The acknowledged offset is preserved
    /// and `start()` resumes from it.
    #[error("transfer failed: {0}")]
    Transfer(#[source] TransportError),

    /// The server acknowledged an offset at or behind what it already
    /// had. Never silently corrected; the attempt fails with the local
    /// offset intact.
    #[error("server-acknowledged offset {server} does not advance past local offset {local}")]
    OffsetRegression { local: u64, server: u64 },

    /// Reading from the byte source failed.
    #[error("source read failed: {0}")]
    Source(#[from] SourceError),

    /// Persisting or loading resume state failed.
    #[error("session store error: {0}")]
    Store(#[from] StoreError),

    /// A blocking read task failed to join.
    #[error("task join error: {0}")]
    TaskJoin(String),

    /// The attempt was stopped by `abort()`. Internal; never delivered to
    /// error callbacks.
    #[error("cancelled")]
    Cancelled,
}

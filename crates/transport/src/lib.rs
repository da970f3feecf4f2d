//! Transport layer performing the remote side of resumable uploads.
//!
//! The session core talks to a [`Transport`] trait object; [`HttpTransport`]
//! is the default implementation, speaking tus 1.0.0 over HTTP.

mod http;

pub use http::HttpTransport;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use uplift_protocol::UploadId;

/// Errors from the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("server rejected {context} with status {status}")]
    Rejected { context: &'static str, status: u16 },

    #[error("missing {0} header in response")]
    MissingHeader(&'static str),

    #[error("invalid {0} header in response")]
    InvalidHeader(&'static str),

    #[error("request cancelled")]
    Cancelled,
}

/// Parameters for creating a remote upload.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub endpoint: String,
    pub total_size: u64,
    /// Sent to the server only at creation time.
    pub metadata: HashMap<String, String>,
    pub headers: HashMap<String, String>,
}

/// One transfer request: a body of one or more coalesced chunks starting
/// at `offset`.
#[derive(Debug, Clone)]
pub struct ChunkRequest {
    pub identity: UploadId,
    pub offset: u64,
    pub body: Vec<u8>,
    /// `Upload-Checksum` header value, when checksums are enabled.
    pub checksum: Option<String>,
    pub headers: HashMap<String, String>,
}

/// Parameters for reading the server-acknowledged offset of an upload.
#[derive(Debug, Clone)]
pub struct HeadRequest {
    pub identity: UploadId,
    pub headers: HashMap<String, String>,
}

/// Abstract transport for one upload protocol.
///
/// Kept as a trait so the session logic stays decoupled from the wire and
/// testable with mocks.
pub trait Transport: Send + Sync {
    /// Creates a remote upload and returns its identity.
    fn create(
        &self,
        req: CreateRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UploadId, TransportError>> + Send + '_>>;

    /// Sends one request body; resolves to the new server-acknowledged
    /// offset.
    fn send_chunk(
        &self,
        req: ChunkRequest,
    ) -> Pin<Box<dyn Future<Output = Result<u64, TransportError>> + Send + '_>>;

    /// Reads the server-acknowledged offset for an existing upload.
    fn head(
        &self,
        req: HeadRequest,
    ) -> Pin<Box<dyn Future<Output = Result<u64, TransportError>> + Send + '_>>;

    /// Best-effort cancellation of in-flight requests for `identity`.
    fn cancel(&self, identity: UploadId) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = TransportError::Rejected {
            context: "create",
            status: 413,
        };
        assert_eq!(err.to_string(), "server rejected create with status 413");

        let err = TransportError::MissingHeader("Upload-Offset");
        assert_eq!(err.to_string(), "missing Upload-Offset header in response");

        let err = TransportError::Cancelled;
        assert_eq!(err.to_string(), "request cancelled");
    }
}

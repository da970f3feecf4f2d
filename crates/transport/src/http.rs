//! HTTP transport speaking tus 1.0.0.
//!
//! Wire exchange:
//! - create: `POST` to the endpoint with `Upload-Length` and optional
//!   `Upload-Metadata`; the `Location` response header, resolved against
//!   the endpoint, becomes the upload identity.
//! - head: `HEAD` on the upload URL; the `Upload-Offset` response header
//!   is the server-acknowledged offset.
//! - chunk: `PATCH` on the upload URL with
//!   `application/offset+octet-stream` body and `Upload-Offset`; the
//!   response carries the new acknowledged offset.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use uplift_protocol::UploadId;
use uplift_protocol::headers::{
    CONTENT_TYPE_OFFSET_STREAM, HEADER_LOCATION, HEADER_TUS_RESUMABLE, HEADER_UPLOAD_CHECKSUM,
    HEADER_UPLOAD_LENGTH, HEADER_UPLOAD_METADATA, HEADER_UPLOAD_OFFSET, TUS_VERSION,
};
use uplift_protocol::metadata::encode_metadata;

use crate::{ChunkRequest, CreateRequest, HeadRequest, Transport, TransportError};

/// HTTP transport for tus-style resumable uploads.
///
/// Holds a cancellation token per active upload so [`Transport::cancel`]
/// stops in-flight requests for that identity.
pub struct HttpTransport {
    client: reqwest::Client,
    tokens: Mutex<HashMap<String, CancellationToken>>,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    /// Creates a transport with a default HTTP client.
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Creates a transport reusing an existing HTTP client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cancellation token for `identity`, creating one if
    /// needed.
    fn token_for(&self, identity: &UploadId) -> CancellationToken {
        self.tokens
            .lock()
            .unwrap()
            .entry(identity.as_str().to_string())
            .or_default()
            .clone()
    }

    async fn do_create(&self, req: &CreateRequest) -> Result<UploadId, TransportError> {
        let endpoint = reqwest::Url::parse(&req.endpoint)
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

        let mut request = self
            .client
            .post(endpoint.clone())
            .header(HEADER_TUS_RESUMABLE, TUS_VERSION)
            .header(HEADER_UPLOAD_LENGTH, req.total_size);
        if let Some(metadata) = encode_metadata(&req.metadata) {
            request = request.header(HEADER_UPLOAD_METADATA, metadata);
        }
        for (name, value) in &req.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Rejected {
                context: "create",
                status: status.as_u16(),
            });
        }

        let location = response
            .headers()
            .get(HEADER_LOCATION)
            .ok_or(TransportError::MissingHeader("Location"))?
            .to_str()
            .map_err(|_| TransportError::InvalidHeader("Location"))?;
        let upload_url = endpoint
            .join(location)
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

        debug!(upload = %upload_url, "upload created");
        Ok(UploadId::new(upload_url))
    }

    async fn do_send_chunk(&self, req: &ChunkRequest) -> Result<u64, TransportError> {
        let mut request = self
            .client
            .patch(req.identity.as_str())
            .header(HEADER_TUS_RESUMABLE, TUS_VERSION)
            .header(HEADER_UPLOAD_OFFSET, req.offset)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE_OFFSET_STREAM)
            .body(req.body.clone());
        if let Some(checksum) = &req.checksum {
            request = request.header(HEADER_UPLOAD_CHECKSUM, checksum.as_str());
        }
        for (name, value) in &req.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Rejected {
                context: "chunk",
                status: status.as_u16(),
            });
        }
        parse_offset(response.headers())
    }

    async fn do_head(&self, req: &HeadRequest) -> Result<u64, TransportError> {
        let mut request = self
            .client
            .head(req.identity.as_str())
            .header(HEADER_TUS_RESUMABLE, TUS_VERSION);
        for (name, value) in &req.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Rejected {
                context: "head",
                status: status.as_u16(),
            });
        }
        parse_offset(response.headers())
    }
}

impl Transport for HttpTransport {
    fn create(
        &self,
        req: CreateRequest,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<UploadId, TransportError>> + Send + '_>,
    > {
        Box::pin(async move { self.do_create(&req).await })
    }

    fn send_chunk(
        &self,
        req: ChunkRequest,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<u64, TransportError>> + Send + '_>>
    {
        Box::pin(async move {
            let token = self.token_for(&req.identity);
            tokio::select! {
                _ = token.cancelled() => Err(TransportError::Cancelled),
                result = self.do_send_chunk(&req) => result,
            }
        })
    }

    fn head(
        &self,
        req: HeadRequest,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<u64, TransportError>> + Send + '_>>
    {
        Box::pin(async move {
            let token = self.token_for(&req.identity);
            tokio::select! {
                _ = token.cancelled() => Err(TransportError::Cancelled),
                result = self.do_head(&req) => result,
            }
        })
    }

    fn cancel(
        &self,
        identity: UploadId,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let token = self.tokens.lock().unwrap().remove(identity.as_str());
            if let Some(token) = token {
                debug!(upload = %identity, "cancelling in-flight requests");
                token.cancel();
            }
        })
    }
}

/// Parses the `Upload-Offset` header from a response.
fn parse_offset(headers: &reqwest::header::HeaderMap) -> Result<u64, TransportError> {
    headers
        .get(HEADER_UPLOAD_OFFSET)
        .ok_or(TransportError::MissingHeader("Upload-Offset"))?
        .to_str()
        .map_err(|_| TransportError::InvalidHeader("Upload-Offset"))?
        .parse::<u64>()
        .map_err(|_| TransportError::InvalidHeader("Upload-Offset"))
}

//! Header names and version constants for the tus wire exchange.

/// Protocol version sent as `Tus-Resumable` on every request.
pub const TUS_VERSION: &str = "1.0.0";

/// Names every request with the protocol version.
pub const HEADER_TUS_RESUMABLE: &str = "Tus-Resumable";

/// Byte offset of a request body, and the server's acknowledged offset in
/// responses.
pub const HEADER_UPLOAD_OFFSET: &str = "Upload-Offset";

/// Total upload length, sent at creation time.
pub const HEADER_UPLOAD_LENGTH: &str = "Upload-Length";

/// Base64-encoded key/value metadata, sent only at creation time.
pub const HEADER_UPLOAD_METADATA: &str = "Upload-Metadata";

/// Digest of a request body (`<algorithm> <base64 digest>`).
pub const HEADER_UPLOAD_CHECKSUM: &str = "Upload-Checksum";

/// Response header carrying the URL of a freshly created upload.
pub const HEADER_LOCATION: &str = "Location";

/// Content type for chunk transfer requests.
pub const CONTENT_TYPE_OFFSET_STREAM: &str = "application/offset+octet-stream";

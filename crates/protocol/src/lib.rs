//! Wire-level types and helpers for the tus resumable-upload protocol.
//!
//! This crate carries everything the transport, session, and client crates
//! share: header names and the protocol version, upload metadata encoding,
//! request checksum digests, and the upload identity and configuration types.

pub mod checksum;
pub mod headers;
pub mod metadata;
pub mod types;

pub use types::{
    ConfigError, DEFAULT_CHUNK_SIZE, DEFAULT_REQUEST_PAYLOAD_SIZE, UploadConfig, UploadId,
};

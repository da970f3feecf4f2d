//! Request body digests for the checksum extension.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

/// Algorithm name announced in the `Upload-Checksum` header.
pub const CHECKSUM_ALGORITHM: &str = "sha256";

/// Computes the `Upload-Checksum` header value for a request body.
pub fn upload_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = STANDARD.encode(hasher.finalize());
    format!("{CHECKSUM_ALGORITHM} {digest}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        assert_eq!(upload_checksum(b"hello world"), upload_checksum(b"hello world"));
    }

    #[test]
    fn different_data_different_digest() {
        assert_ne!(upload_checksum(b"hello"), upload_checksum(b"world"));
    }

    #[test]
    fn header_value_shape() {
        let value = upload_checksum(b"payload");
        let (algorithm, digest) = value.split_once(' ').unwrap();
        assert_eq!(algorithm, "sha256");
        // SHA-256 is 32 bytes, 44 base64 chars with padding.
        assert_eq!(digest.len(), 44);
    }
}

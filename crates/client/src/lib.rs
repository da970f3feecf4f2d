//! Resumable upload client.
//!
//! One [`Upload`] manages one file (or in-memory payload): it creates the
//! remote upload, transfers it in chunks, reports progress through
//! callbacks, survives interruptions, and resumes from the last byte the
//! server acknowledged.
//!
//! ```no_run
//! use std::sync::Arc;
//! use uplift_client::{Upload, UploadConfig};
//!
//! # async fn demo() -> Result<(), uplift_client::UploadError> {
//! let upload = Arc::new(Upload::from_file(
//!     "video.mp4",
//!     UploadConfig::new("https://tus.example.com/files/"),
//! )?);
//! upload.on_progress(Box::new(|uploaded, total| {
//!     println!("{uploaded}/{total} bytes");
//! }));
//! upload.on_success(Box::new(|url| println!("uploaded to {url}")));
//!
//! upload.start().await?;
//! # Ok(())
//! # }
//! ```

mod upload;

pub use upload::Upload;

pub use uplift_protocol::{
    ConfigError, DEFAULT_CHUNK_SIZE, DEFAULT_REQUEST_PAYLOAD_SIZE, UploadConfig, UploadId,
};
pub use uplift_session::{
    ErrorCallback, ProgressCallback, SessionState, SuccessCallback, UploadError,
};
pub use uplift_source::{ByteSource, FileSource, MemorySource, SourceError};
pub use uplift_store::{FileStore, MemoryStore, SessionStore, StoreError, default_store_path};
pub use uplift_transport::{HttpTransport, Transport, TransportError};

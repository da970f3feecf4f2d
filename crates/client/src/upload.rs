//! Public upload facade.

use std::path::Path;
use std::sync::{Arc, RwLock};

use uplift_protocol::UploadConfig;
use uplift_session::{
    AttemptOutcome, ErrorCallback, ProgressCallback, SessionDriver, SessionState, SuccessCallback,
    UploadError,
};
use uplift_source::{ByteSource, FileSource};
use uplift_store::{MemoryStore, SessionStore};
use uplift_transport::{HttpTransport, Transport};

/// One resumable upload.
///
/// Constructed per payload; owns its configuration and session. Wrap it in
/// an [`Arc`] to call [`abort`](Self::abort) from another task while
/// [`start`](Self::start) is running.
pub struct Upload {
    driver: SessionDriver,
    url: RwLock<Option<String>>,
}

impl Upload {
    /// Opens `path` and prepares an upload keyed by that path, with the
    /// default HTTP transport and an in-memory session store.
    ///
    /// Fails if the file cannot be opened.
    pub fn from_file(path: impl AsRef<Path>, config: UploadConfig) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let source = FileSource::open(path)?;
        let key = path.to_string_lossy().into_owned();
        Ok(Self::new(Arc::new(source), key, config))
    }

    /// Prepares an upload from an arbitrary byte source.
    ///
    /// `key` identifies the upload in the session store; uploads sharing a
    /// store must use distinct keys.
    pub fn new(
        source: Arc<dyn ByteSource>,
        key: impl Into<String>,
        config: UploadConfig,
    ) -> Self {
        Self::with_collaborators(
            source,
            key,
            config,
            Arc::new(HttpTransport::new()),
            Arc::new(MemoryStore::new()),
        )
    }

    /// Prepares an upload with explicit transport and store
    /// implementations.
    ///
    /// Use a [`uplift_store::FileStore`] here to resume across process
    /// restarts.
    pub fn with_collaborators(
        source: Arc<dyn ByteSource>,
        key: impl Into<String>,
        config: UploadConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            driver: SessionDriver::new(config, source, transport, store, key),
            url: RwLock::new(None),
        }
    }

    /// Registers the progress callback, invoked with
    /// `(bytes_uploaded, bytes_total)`. Offsets are non-decreasing and
    /// never exceed the total.
    pub fn on_progress(&self, callback: ProgressCallback) {
        self.driver.callbacks().set_progress(callback);
    }

    /// Registers the success callback, invoked at most once per attempt
    /// with the final upload URL.
    pub fn on_success(&self, callback: SuccessCallback) {
        self.driver.callbacks().set_success(callback);
    }

    /// Registers the error callback, invoked at most once per attempt.
    pub fn on_error(&self, callback: ErrorCallback) {
        self.driver.callbacks().set_error(callback);
    }

    /// Starts or resumes the upload and drives it to a terminal state.
    ///
    /// Errors are delivered to the error callback when one is registered;
    /// without one they are returned from this method. A `start` while
    /// another attempt is in flight is a no-op, as is a `start` after the
    /// upload completed.
    pub async fn start(&self) -> Result<(), UploadError> {
        match self.driver.run().await {
            AttemptOutcome::Completed { url } => {
                *self.url.write().unwrap() = Some(url);
                Ok(())
            }
            AttemptOutcome::Aborted
            | AttemptOutcome::AlreadyRunning
            | AttemptOutcome::AlreadyCompleted => Ok(()),
            AttemptOutcome::Failed { error, delivered } => {
                if delivered { Ok(()) } else { Err(error) }
            }
        }
    }

    /// Aborts the in-flight attempt, preserving the acknowledged offset so
    /// a later [`start`](Self::start) resumes instead of restarting.
    ///
    /// Always safe to call; does nothing when no attempt is running.
    pub async fn abort(&self) {
        self.driver.abort().await;
    }

    /// The remote upload URL, available once the upload succeeds.
    pub fn url(&self) -> Option<String> {
        self.url.read().unwrap().clone()
    }

    /// Current lifecycle state of the session.
    pub fn state(&self) -> SessionState {
        self.driver.session().state()
    }

    /// Bytes the server has acknowledged so far.
    pub fn bytes_uploaded(&self) -> u64 {
        self.driver.session().offset()
    }

    /// Total payload size in bytes.
    pub fn bytes_total(&self) -> u64 {
        self.driver.session().total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use uplift_protocol::UploadId;
    use uplift_source::MemorySource;
    use uplift_transport::{ChunkRequest, CreateRequest, HeadRequest, TransportError};

    /// Transport that accepts everything it is sent.
    #[derive(Default)]
    struct AcceptAllTransport {
        create_count: AtomicUsize,
        chunk_offsets: Mutex<Vec<u64>>,
    }

    impl Transport for AcceptAllTransport {
        fn create(
            &self,
            _req: CreateRequest,
        ) -> Pin<Box<dyn Future<Output = Result<UploadId, TransportError>> + Send + '_>> {
            self.create_count.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(UploadId::new("https://tus.test/files/u1")) })
        }

        fn send_chunk(
            &self,
            req: ChunkRequest,
        ) -> Pin<Box<dyn Future<Output = Result<u64, TransportError>> + Send + '_>> {
            Box::pin(async move {
                self.chunk_offsets.lock().unwrap().push(req.offset);
                Ok(req.offset + req.body.len() as u64)
            })
        }

        fn head(
            &self,
            _req: HeadRequest,
        ) -> Pin<Box<dyn Future<Output = Result<u64, TransportError>> + Send + '_>> {
            Box::pin(async { Ok(0) })
        }

        fn cancel(
            &self,
            _identity: UploadId,
        ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
            Box::pin(async {})
        }
    }

    fn small_config() -> UploadConfig {
        UploadConfig {
            chunk_size: 4,
            request_payload_size: 4,
            ..UploadConfig::new("https://tus.test/files/")
        }
    }

    fn test_upload(data: &[u8]) -> (Upload, Arc<AcceptAllTransport>) {
        let transport = Arc::new(AcceptAllTransport::default());
        let upload = Upload::with_collaborators(
            Arc::new(MemorySource::new(data.to_vec())),
            "test-key",
            small_config(),
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::new(MemoryStore::new()),
        );
        (upload, transport)
    }

    #[tokio::test]
    async fn start_sets_url_and_fires_success_once() {
        let (upload, _transport) = test_upload(b"0123456789");
        let successes = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&successes);
        upload.on_success(Box::new(move |url| s.lock().unwrap().push(url.to_string())));

        assert!(upload.url().is_none());
        upload.start().await.unwrap();

        assert_eq!(upload.url().unwrap(), "https://tus.test/files/u1");
        assert_eq!(upload.state(), SessionState::Completed);
        assert_eq!(upload.bytes_uploaded(), 10);
        assert_eq!(upload.bytes_total(), 10);
        assert_eq!(*successes.lock().unwrap(), vec!["https://tus.test/files/u1"]);
    }

    #[tokio::test]
    async fn start_after_completion_is_noop() {
        let (upload, transport) = test_upload(b"0123");
        upload.start().await.unwrap();
        upload.start().await.unwrap();
        assert_eq!(transport.create_count.load(Ordering::SeqCst), 1);
        assert_eq!(transport.chunk_offsets.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_endpoint_returned_without_error_callback() {
        let transport = Arc::new(AcceptAllTransport::default());
        let upload = Upload::with_collaborators(
            Arc::new(MemorySource::new(b"data".to_vec())),
            "test-key",
            UploadConfig::default(),
            transport as Arc<dyn Transport>,
            Arc::new(MemoryStore::new()),
        );

        let result = upload.start().await;
        assert!(matches!(result, Err(UploadError::Config(_))));
    }

    #[tokio::test]
    async fn missing_endpoint_delivered_to_error_callback() {
        let transport = Arc::new(AcceptAllTransport::default());
        let upload = Upload::with_collaborators(
            Arc::new(MemorySource::new(b"data".to_vec())),
            "test-key",
            UploadConfig::default(),
            transport as Arc<dyn Transport>,
            Arc::new(MemoryStore::new()),
        );
        let errors = Arc::new(Mutex::new(Vec::new()));
        let e = Arc::clone(&errors);
        upload.on_error(Box::new(move |error| {
            e.lock().unwrap().push(error.to_string())
        }));

        // Delivered through the callback, so start reports success.
        upload.start().await.unwrap();
        assert_eq!(*errors.lock().unwrap(), vec!["no endpoint provided"]);
    }

    #[tokio::test]
    async fn abort_before_start_is_noop() {
        let (upload, _transport) = test_upload(b"0123");
        upload.abort().await;
        assert_eq!(upload.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn from_file_missing_file_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let result = Upload::from_file(
            dir.path().join("nonexistent.bin"),
            UploadConfig::new("https://tus.test/files/"),
        );
        assert!(matches!(result, Err(UploadError::Source(_))));
    }

    #[tokio::test]
    async fn progress_reaches_callbacks_in_order() {
        let (upload, _transport) = test_upload(b"0123456789");
        let progress = Arc::new(Mutex::new(Vec::new()));
        let p = Arc::clone(&progress);
        upload.on_progress(Box::new(move |uploaded, total| {
            p.lock().unwrap().push((uploaded, total));
        }));

        upload.start().await.unwrap();

        let events = progress.lock().unwrap();
        assert_eq!(*events.last().unwrap(), (10, 10));
        let mut last = 0;
        for &(uploaded, _) in events.iter() {
            assert!(uploaded >= last);
            last = uploaded;
        }
    }
}

//! End-to-end upload flows against a scripted transport: interruption,
//! restart, and resume from persisted state.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use uplift_client::{
    FileStore, SessionStore, Transport, TransportError, Upload, UploadConfig, UploadId,
};
use uplift_transport::{ChunkRequest, CreateRequest, HeadRequest};

/// Transport that fails every chunk send after an initial quota, tracking
/// the server-side offset like a real endpoint would.
struct FlakyTransport {
    server_offset: Mutex<u64>,
    sends_before_failure: AtomicUsize,
    create_count: AtomicUsize,
}

impl FlakyTransport {
    fn new(sends_before_failure: usize) -> Self {
        Self {
            server_offset: Mutex::new(0),
            sends_before_failure: AtomicUsize::new(sends_before_failure),
            create_count: AtomicUsize::new(0),
        }
    }

    fn allow_sends(&self, count: usize) {
        self.sends_before_failure.store(count, Ordering::SeqCst);
    }
}

impl Transport for FlakyTransport {
    fn create(
        &self,
        _req: CreateRequest,
    ) -> Pin<Box<dyn Future<Output = Result<UploadId, TransportError>> + Send + '_>> {
        self.create_count.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(UploadId::new("https://tus.test/files/flaky")) })
    }

    fn send_chunk(
        &self,
        req: ChunkRequest,
    ) -> Pin<Box<dyn Future<Output = Result<u64, TransportError>> + Send + '_>> {
        Box::pin(async move {
            let remaining = self.sends_before_failure.load(Ordering::SeqCst);
            if remaining == 0 {
                return Err(TransportError::Rejected {
                    context: "chunk",
                    status: 502,
                });
            }
            self.sends_before_failure.fetch_sub(1, Ordering::SeqCst);

            let mut offset = self.server_offset.lock().unwrap();
            assert_eq!(req.offset, *offset, "client sent a chunk out of order");
            *offset += req.body.len() as u64;
            Ok(*offset)
        })
    }

    fn head(
        &self,
        _req: HeadRequest,
    ) -> Pin<Box<dyn Future<Output = Result<u64, TransportError>> + Send + '_>> {
        Box::pin(async { Ok(*self.server_offset.lock().unwrap()) })
    }

    fn cancel(&self, _identity: UploadId) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async {})
    }
}

fn config() -> UploadConfig {
    UploadConfig {
        chunk_size: 1,
        request_payload_size: 1,
        ..UploadConfig::new("https://tus.test/files/")
    }
}

#[tokio::test]
async fn resume_across_facade_instances() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("payload.bin");
    std::fs::write(&file_path, b"0123456789").unwrap();
    let store_path = dir.path().join("uploads.json");

    let transport = Arc::new(FlakyTransport::new(5));

    // First process: five chunks make it through, the sixth fails.
    {
        let store = Arc::new(FileStore::new(store_path.clone()).unwrap());
        let source = Arc::new(uplift_client::FileSource::open(&file_path).unwrap());
        let upload = Upload::with_collaborators(
            source,
            file_path.to_string_lossy().into_owned(),
            config(),
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::clone(&store) as Arc<dyn SessionStore>,
        );
        let errors = Arc::new(Mutex::new(Vec::new()));
        let e = Arc::clone(&errors);
        upload.on_error(Box::new(move |err| e.lock().unwrap().push(err.to_string())));

        upload.start().await.unwrap();
        assert_eq!(errors.lock().unwrap().len(), 1);
        assert!(upload.url().is_none());
        assert_eq!(upload.bytes_uploaded(), 5);
    }

    // The resume point survived the "restart" on disk.
    {
        let reloaded = FileStore::new(store_path.clone()).unwrap();
        let entry = reloaded.load(&file_path.to_string_lossy()).unwrap();
        assert_eq!(entry.offset, 5);
    }

    // Second process: a fresh facade picks up where the first left off.
    transport.allow_sends(usize::MAX);
    let store = Arc::new(FileStore::new(store_path.clone()).unwrap());
    let source = Arc::new(uplift_client::FileSource::open(&file_path).unwrap());
    let upload = Upload::with_collaborators(
        source,
        file_path.to_string_lossy().into_owned(),
        config(),
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::clone(&store) as Arc<dyn SessionStore>,
    );
    let progress = Arc::new(Mutex::new(Vec::new()));
    let p = Arc::clone(&progress);
    upload.on_progress(Box::new(move |uploaded, total| {
        p.lock().unwrap().push((uploaded, total));
    }));
    let successes = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&successes);
    upload.on_success(Box::new(move |url| s.lock().unwrap().push(url.to_string())));

    upload.start().await.unwrap();

    // One create overall: the second facade resumed, not restarted.
    assert_eq!(transport.create_count.load(Ordering::SeqCst), 1);
    assert_eq!(*successes.lock().unwrap(), vec!["https://tus.test/files/flaky"]);
    assert_eq!(upload.url().unwrap(), "https://tus.test/files/flaky");

    // Progress resumed above the old offset and finished at the total.
    let events = progress.lock().unwrap();
    assert!(events.iter().all(|&(uploaded, total)| {
        uploaded >= 5 && uploaded <= 10 && total == 10
    }));
    assert_eq!(*events.last().unwrap(), (10, 10));

    // Terminal success clears the persisted resume state.
    assert!(store.load(&file_path.to_string_lossy()).is_none());
}

#[tokio::test]
async fn post_completion_start_and_abort_stay_quiet() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("payload.bin");
    std::fs::write(&file_path, b"abcdefgh").unwrap();

    let transport = Arc::new(FlakyTransport::new(usize::MAX));
    let store = Arc::new(uplift_client::MemoryStore::new());
    let upload = Arc::new(Upload::with_collaborators(
        Arc::new(uplift_client::FileSource::open(&file_path).unwrap()),
        "payload.bin",
        config(),
        Arc::clone(&transport) as Arc<dyn Transport>,
        Arc::clone(&store) as Arc<dyn SessionStore>,
    ));
    let successes = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&successes);
    upload.on_success(Box::new(move |url| s.lock().unwrap().push(url.to_string())));

    // Complete the upload normally first, then make sure repeated aborts
    // and starts stay quiet.
    upload.start().await.unwrap();
    upload.abort().await;
    upload.start().await.unwrap();
    upload.abort().await;

    assert_eq!(successes.lock().unwrap().len(), 1);
    assert_eq!(transport.create_count.load(Ordering::SeqCst), 1);
    assert_eq!(upload.url().unwrap(), "https://tus.test/files/flaky");
}

//! Upload session driver: creation, resume, chunk loop, abort.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use uplift_protocol::{UploadConfig, UploadId, checksum};
use uplift_source::{ByteSource, SourceError};
use uplift_store::SessionStore;
use uplift_transport::{ChunkRequest, CreateRequest, HeadRequest, Transport, TransportError};

use crate::error::UploadError;
use crate::events::{CallbackSet, UploadEvent};
use crate::router::{Dispatch, EventRouter};
use crate::state::{SessionState, UploadSession};

/// Terminal outcome of one [`SessionDriver::run`] attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The upload finished; `url` is the remote upload URL.
    Completed { url: String },
    /// The attempt was aborted; resume state is preserved in the store.
    Aborted,
    /// The attempt failed. `delivered` is `true` when an error callback
    /// consumed the error.
    Failed {
        error: UploadError,
        delivered: bool,
    },
    /// Another attempt was already in flight; this call did nothing.
    AlreadyRunning,
    /// The upload had already completed; nothing to do.
    AlreadyCompleted,
}

/// Drives one upload through its lifecycle.
///
/// The driver owns the session state, the event router, and the abort
/// machinery. [`run`](Self::run) performs one attempt from start (or
/// resume) to a terminal state; [`abort`](Self::abort) may be called from
/// any task while an attempt is in flight.
pub struct SessionDriver {
    config: UploadConfig,
    source: Arc<dyn ByteSource>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn SessionStore>,
    store_key: String,
    session: UploadSession,
    router: Arc<EventRouter>,
    callbacks: Arc<CallbackSet>,
    aborting: Arc<AtomicBool>,
    cancel: Mutex<CancellationToken>,
    run_gate: tokio::sync::Mutex<()>,
}

impl SessionDriver {
    pub fn new(
        config: UploadConfig,
        source: Arc<dyn ByteSource>,
        transport: Arc<dyn Transport>,
        store: Arc<dyn SessionStore>,
        store_key: impl Into<String>,
    ) -> Self {
        let total = source.len();
        Self {
            config,
            source,
            transport,
            store,
            store_key: store_key.into(),
            session: UploadSession::new(total),
            router: Arc::new(EventRouter::new()),
            callbacks: Arc::new(CallbackSet::new()),
            aborting: Arc::new(AtomicBool::new(false)),
            cancel: Mutex::new(CancellationToken::new()),
            run_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    pub fn callbacks(&self) -> &Arc<CallbackSet> {
        &self.callbacks
    }

    pub fn router(&self) -> &Arc<EventRouter> {
        &self.router
    }

    /// Starts or resumes the upload and drives it to a terminal state.
    ///
    /// Re-entrant: while an attempt is in flight a second call is a no-op.
    pub async fn run(&self) -> AttemptOutcome {
        let Ok(_gate) = self.run_gate.try_lock() else {
            debug!("attempt already in flight");
            return AttemptOutcome::AlreadyRunning;
        };
        if self.session.state() == SessionState::Completed {
            debug!("upload already completed");
            return AttemptOutcome::AlreadyCompleted;
        }
        if let Err(e) = self.config.validate() {
            let error = UploadError::from(e);
            warn!(error = %error, "invalid upload configuration");
            let delivered = self.callbacks.fire_error(&error);
            return AttemptOutcome::Failed { error, delivered };
        }

        // Fresh attempt: clear the abort flag and arm a new token.
        self.aborting.store(false, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        *self.cancel.lock().unwrap() = cancel.clone();

        // An identity from a previous attempt (in memory or persisted)
        // means resume; otherwise create a remote upload first.
        let resume = self
            .session
            .identity()
            .map(|id| (id, self.session.offset()))
            .or_else(|| {
                self.store
                    .load(&self.store_key)
                    .map(|s| (s.identity, s.offset))
            });

        let (identity, start_offset, fresh) = match resume {
            Some((id, local_offset)) => {
                debug!(upload = %id, local_offset, "resuming upload");
                (id, local_offset, false)
            }
            None => {
                self.session.begin_create();
                info!(
                    endpoint = %self.config.endpoint,
                    bytes = self.session.total(),
                    "creating upload"
                );
                match self.create_upload(&cancel).await {
                    Ok(id) => {
                        if let Err(e) = self.store.save(&self.store_key, &id, 0) {
                            warn!(upload = %id, error = %e, "failed to persist resume state");
                        }
                        (id, 0, true)
                    }
                    Err(UploadError::Cancelled) => {
                        self.session.reset();
                        info!("creation aborted");
                        return AttemptOutcome::Aborted;
                    }
                    Err(error) => {
                        self.session.fail_creating();
                        warn!(error = %error, "upload creation failed");
                        let delivered = self.callbacks.fire_error(&error);
                        return AttemptOutcome::Failed { error, delivered };
                    }
                }
            }
        };

        self.router.subscribe(
            identity.clone(),
            Arc::clone(&self.aborting),
            Arc::clone(&self.callbacks),
        );
        self.session.begin_transfer(identity.clone(), start_offset);

        // The server owns the truth about the acknowledged offset; a local
        // resume point may be stale after a crash or concurrent restart.
        if !fresh {
            match self.resync_offset(&identity, &cancel).await {
                Ok(server_offset) => {
                    debug!(upload = %identity, server_offset, "offset re-synchronized");
                    self.session.advance(server_offset);
                }
                Err(UploadError::Cancelled) => return self.finish_abort(&identity),
                Err(error) => return self.fail_attempt(&identity, error),
            }
        }

        self.transfer_loop(&identity, &cancel).await
    }

    /// Requests cancellation of the in-flight attempt.
    ///
    /// Safe to call at any time; a no-op when nothing is running. The
    /// transport is told to stop in-flight requests, and the running
    /// attempt finishes as aborted without surfacing an error.
    pub async fn abort(&self) {
        if !self.session.is_active() {
            debug!(state = ?self.session.state(), "abort ignored");
            return;
        }
        self.aborting.store(true, Ordering::SeqCst);
        let token = self.cancel.lock().unwrap().clone();
        token.cancel();
        if let Some(id) = self.session.identity() {
            self.transport.cancel(id).await;
        }
    }

    async fn create_upload(&self, cancel: &CancellationToken) -> Result<UploadId, UploadError> {
        let request = CreateRequest {
            endpoint: self.config.endpoint.clone(),
            total_size: self.session.total(),
            metadata: self.config.metadata.clone(),
            headers: self.config.headers.clone(),
        };
        let created = tokio::select! {
            _ = cancel.cancelled() => return Err(UploadError::Cancelled),
            result = self.transport.create(request) => result,
        };
        match created {
            Ok(id) => {
                info!(upload = %id, "upload created");
                Ok(id)
            }
            Err(TransportError::Cancelled) => Err(UploadError::Cancelled),
            Err(e) => Err(UploadError::Create(e)),
        }
    }

    async fn resync_offset(
        &self,
        id: &UploadId,
        cancel: &CancellationToken,
    ) -> Result<u64, UploadError> {
        let request = HeadRequest {
            identity: id.clone(),
            headers: self.config.headers.clone(),
        };
        let offset = tokio::select! {
            _ = cancel.cancelled() => return Err(UploadError::Cancelled),
            result = self.transport.head(request) => result,
        };
        match offset {
            Ok(o) => Ok(o),
            Err(TransportError::Cancelled) => Err(UploadError::Cancelled),
            Err(e) => Err(UploadError::Transfer(e)),
        }
    }

    async fn transfer_loop(&self, id: &UploadId, cancel: &CancellationToken) -> AttemptOutcome {
        let total = self.session.total();
        loop {
            let offset = self.session.offset();
            if offset >= total {
                break;
            }
            if cancel.is_cancelled() {
                return self.finish_abort(id);
            }

            let (body, boundaries) = match self.fill_request(offset, total).await {
                Ok(filled) => filled,
                Err(error) => return self.fail_attempt(id, error),
            };
            let sent = body.len() as u64;

            let request = ChunkRequest {
                identity: id.clone(),
                offset,
                checksum: self
                    .config
                    .send_checksums
                    .then(|| checksum::upload_checksum(&body)),
                body,
                headers: self.config.headers.clone(),
            };
            let acked = tokio::select! {
                _ = cancel.cancelled() => return self.finish_abort(id),
                result = self.transport.send_chunk(request) => result,
            };
            let new_offset = match acked {
                Ok(o) => o,
                Err(TransportError::Cancelled) => return self.finish_abort(id),
                Err(e) => return self.fail_attempt(id, UploadError::Transfer(e)),
            };
            if new_offset <= offset {
                return self.fail_attempt(
                    id,
                    UploadError::OffsetRegression {
                        local: offset,
                        server: new_offset,
                    },
                );
            }

            if let Err(e) = self.store.save(&self.store_key, id, new_offset) {
                warn!(upload = %id, error = %e, "failed to persist resume state");
            }
            self.session.advance(new_offset);
            debug!(upload = %id, offset = new_offset, total, "chunk acknowledged");

            // Per-chunk progress for everything the server confirmed.
            for &boundary in &boundaries {
                if boundary < new_offset {
                    self.router.dispatch(UploadEvent::Progress {
                        id,
                        bytes_uploaded: boundary,
                        bytes_total: total,
                    });
                }
            }
            self.router.dispatch(UploadEvent::Progress {
                id,
                bytes_uploaded: new_offset,
                bytes_total: total,
            });
            if new_offset < offset + sent {
                debug!(
                    upload = %id,
                    sent,
                    acked = new_offset - offset,
                    "partial acknowledgement"
                );
            }
        }

        // One closing progress event mirrors the server's final state.
        self.router.dispatch(UploadEvent::Progress {
            id,
            bytes_uploaded: total,
            bytes_total: total,
        });
        self.session.complete();
        if let Err(e) = self.store.clear(&self.store_key) {
            warn!(upload = %id, error = %e, "failed to clear resume state");
        }
        let url = id.as_str().to_string();
        info!(upload = %id, bytes = total, "upload complete");
        self.router.dispatch(UploadEvent::Success { id, url: &url });
        AttemptOutcome::Completed { url }
    }

    /// Reads up to one request payload of chunks starting at `offset`.
    ///
    /// Returns the request body and the chunk boundaries within it; the
    /// boundaries become per-chunk progress once the body is acknowledged.
    async fn fill_request(
        &self,
        offset: u64,
        total: u64,
    ) -> Result<(Vec<u8>, Vec<u64>), UploadError> {
        let payload_cap = self.config.request_payload_size;
        let chunk_size = self.config.chunk_size;
        let mut body: Vec<u8> = Vec::new();
        let mut boundaries: Vec<u64> = Vec::new();

        while body.len() < payload_cap && offset + (body.len() as u64) < total {
            let read_at = offset + body.len() as u64;
            let remaining = total - read_at;
            let want = (chunk_size.min(payload_cap - body.len()) as u64).min(remaining) as usize;

            let source = Arc::clone(&self.source);
            let chunk = tokio::task::spawn_blocking(move || source.read(read_at, want))
                .await
                .map_err(|e| UploadError::TaskJoin(e.to_string()))??;
            if chunk.is_empty() {
                // The source ended early relative to its advertised length.
                return Err(UploadError::Source(SourceError::OutOfBounds {
                    offset: read_at,
                    len: total,
                }));
            }
            body.extend_from_slice(&chunk);
            boundaries.push(offset + body.len() as u64);
        }
        Ok((body, boundaries))
    }

    /// Fails the attempt, routing the error through the router so an abort
    /// in progress suppresses it.
    fn fail_attempt(&self, id: &UploadId, error: UploadError) -> AttemptOutcome {
        if self.aborting.load(Ordering::SeqCst) {
            // A failure induced by cancellation folds into the abort.
            return self.finish_abort(id);
        }
        self.session.fail();
        warn!(upload = %id, error = %error, "attempt failed");
        let dispatch = self.router.dispatch(UploadEvent::Error { id, error: &error });
        if dispatch == Dispatch::Suppressed {
            // The abort flag was raised between the check above and the
            // dispatch; the abort wins.
            return self.finish_abort(id);
        }
        AttemptOutcome::Failed {
            error,
            delivered: dispatch == Dispatch::Delivered,
        }
    }

    /// Completes an abort: persists the resume point, tears down the
    /// subscription, and returns the session to idle.
    fn finish_abort(&self, id: &UploadId) -> AttemptOutcome {
        self.session.begin_abort();
        let offset = self.session.offset();
        if let Err(e) = self.store.save(&self.store_key, id, offset) {
            warn!(upload = %id, error = %e, "failed to persist resume state");
        }
        self.router.unsubscribe();
        self.session.reset();
        info!(upload = %id, offset, "upload aborted");
        AttemptOutcome::Aborted
    }
}

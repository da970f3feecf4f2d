//! Session lifecycle state.

use std::sync::RwLock;

use uplift_protocol::UploadId;

/// Lifecycle state of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No remote identity; nothing in flight.
    Idle,
    /// Remote creation request in flight.
    Creating,
    /// Chunk loop running.
    Transferring,
    /// Abort requested; waiting for the in-flight operation to stop.
    Aborting,
    /// Finished successfully. Terminal.
    Completed,
    /// The last attempt failed; resumable via another `start()`.
    Failed,
}

/// Mutable runtime state of one upload (thread-safe).
///
/// The offset only moves forward; the identity is owned exclusively by the
/// session driver and cleared when creation fails or an abort returns the
/// session to idle.
pub struct UploadSession {
    inner: RwLock<SessionInner>,
}

struct SessionInner {
    state: SessionState,
    identity: Option<UploadId>,
    offset: u64,
    total: u64,
}

impl UploadSession {
    /// Creates an idle session for a payload of `total` bytes.
    pub fn new(total: u64) -> Self {
        Self {
            inner: RwLock::new(SessionInner {
                state: SessionState::Idle,
                identity: None,
                offset: 0,
                total,
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.read().unwrap().state
    }

    pub fn identity(&self) -> Option<UploadId> {
        self.inner.read().unwrap().identity.clone()
    }

    /// Bytes the server has acknowledged.
    pub fn offset(&self) -> u64 {
        self.inner.read().unwrap().offset
    }

    /// Total payload size in bytes.
    pub fn total(&self) -> u64 {
        self.inner.read().unwrap().total
    }

    /// Returns `true` while an attempt is in flight.
    pub fn is_active(&self) -> bool {
        matches!(
            self.state(),
            SessionState::Creating | SessionState::Transferring
        )
    }

    /// Enters the creation phase.
    pub fn begin_create(&self) {
        let mut s = self.inner.write().unwrap();
        s.state = SessionState::Creating;
    }

    /// Adopts an identity and server-acknowledged offset, entering the
    /// transfer phase.
    pub fn begin_transfer(&self, identity: UploadId, offset: u64) {
        let mut s = self.inner.write().unwrap();
        s.identity = Some(identity);
        s.offset = offset;
        s.state = SessionState::Transferring;
    }

    /// Advances the acknowledged offset.
    pub fn advance(&self, offset: u64) {
        let mut s = self.inner.write().unwrap();
        s.offset = offset;
    }

    /// Marks the session completed.
    pub fn complete(&self) {
        let mut s = self.inner.write().unwrap();
        s.state = SessionState::Completed;
    }

    /// Marks the attempt failed, keeping identity and offset for resume.
    pub fn fail(&self) {
        let mut s = self.inner.write().unwrap();
        s.state = SessionState::Failed;
    }

    /// Marks a failed creation: no identity, nothing to resume.
    pub fn fail_creating(&self) {
        let mut s = self.inner.write().unwrap();
        s.state = SessionState::Failed;
        s.identity = None;
    }

    /// Enters the abort phase.
    pub fn begin_abort(&self) {
        let mut s = self.inner.write().unwrap();
        s.state = SessionState::Aborting;
    }

    /// Returns to `Idle` after an abort. The identity is dropped here;
    /// resume state lives in the session store.
    pub fn reset(&self) {
        let mut s = self.inner.write().unwrap();
        s.state = SessionState::Idle;
        s.identity = None;
    }
}

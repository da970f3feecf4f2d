//! Upload events and user callbacks.

use std::sync::RwLock;

use uplift_protocol::UploadId;

use crate::error::UploadError;

/// Callback invoked with `(bytes_uploaded, bytes_total)`.
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;
/// Callback invoked with the final upload URL.
pub type SuccessCallback = Box<dyn Fn(&str) + Send + Sync>;
/// Callback invoked when an attempt fails.
pub type ErrorCallback = Box<dyn Fn(&UploadError) + Send + Sync>;

/// One event produced by an upload attempt, tagged with the identity it
/// pertains to.
#[derive(Debug, Clone, Copy)]
pub enum UploadEvent<'a> {
    Progress {
        id: &'a UploadId,
        bytes_uploaded: u64,
        bytes_total: u64,
    },
    Success {
        id: &'a UploadId,
        url: &'a str,
    },
    Error {
        id: &'a UploadId,
        error: &'a UploadError,
    },
}

impl<'a> UploadEvent<'a> {
    /// The identity this event pertains to.
    pub fn identity(&self) -> &'a UploadId {
        match *self {
            UploadEvent::Progress { id, .. }
            | UploadEvent::Success { id, .. }
            | UploadEvent::Error { id, .. } => id,
        }
    }
}

/// The callbacks registered on one upload.
///
/// Registration may happen at any time before `start()`; all slots are
/// optional. Callbacks run on the session's task and must not call back
/// into the same upload.
#[derive(Default)]
pub struct CallbackSet {
    progress: RwLock<Option<ProgressCallback>>,
    success: RwLock<Option<SuccessCallback>>,
    error: RwLock<Option<ErrorCallback>>,
}

impl CallbackSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_progress(&self, callback: ProgressCallback) {
        *self.progress.write().unwrap() = Some(callback);
    }

    pub fn set_success(&self, callback: SuccessCallback) {
        *self.success.write().unwrap() = Some(callback);
    }

    pub fn set_error(&self, callback: ErrorCallback) {
        *self.error.write().unwrap() = Some(callback);
    }

    /// Fires the progress callback. Returns `true` if one was registered.
    pub fn fire_progress(&self, bytes_uploaded: u64, bytes_total: u64) -> bool {
        let guard = self.progress.read().unwrap();
        match guard.as_ref() {
            Some(cb) => {
                cb(bytes_uploaded, bytes_total);
                true
            }
            None => false,
        }
    }

    /// Fires the success callback. Returns `true` if one was registered.
    pub fn fire_success(&self, url: &str) -> bool {
        let guard = self.success.read().unwrap();
        match guard.as_ref() {
            Some(cb) => {
                cb(url);
                true
            }
            None => false,
        }
    }

    /// Fires the error callback. Returns `true` if one consumed the error.
    pub fn fire_error(&self, error: &UploadError) -> bool {
        let guard = self.error.read().unwrap();
        match guard.as_ref() {
            Some(cb) => {
                cb(error);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn event_identity() {
        let id = UploadId::new("u1");
        let event = UploadEvent::Progress {
            id: &id,
            bytes_uploaded: 5,
            bytes_total: 10,
        };
        assert_eq!(event.identity(), &id);
    }

    #[test]
    fn fire_without_callbacks_reports_unhandled() {
        let callbacks = CallbackSet::new();
        assert!(!callbacks.fire_progress(1, 2));
        assert!(!callbacks.fire_success("https://example.com/u1"));
        assert!(!callbacks.fire_error(&UploadError::Cancelled));
    }

    #[test]
    fn fire_progress_invokes_callback() {
        let callbacks = CallbackSet::new();
        let seen = Arc::new(AtomicU64::new(0));
        let s = Arc::clone(&seen);
        callbacks.set_progress(Box::new(move |uploaded, _total| {
            s.store(uploaded, Ordering::SeqCst);
        }));

        assert!(callbacks.fire_progress(42, 100));
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn replacing_callback_uses_latest() {
        let callbacks = CallbackSet::new();
        let seen = Arc::new(AtomicU64::new(0));

        let s = Arc::clone(&seen);
        callbacks.set_progress(Box::new(move |_, _| s.store(1, Ordering::SeqCst)));
        let s = Arc::clone(&seen);
        callbacks.set_progress(Box::new(move |_, _| s.store(2, Ordering::SeqCst)));

        callbacks.fire_progress(0, 0);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}

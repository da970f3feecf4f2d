//! Routes attempt events to the callbacks of the active upload.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;
use uplift_protocol::UploadId;

use crate::events::{CallbackSet, UploadEvent};

/// What happened to a dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Delivered to a registered callback.
    Delivered,
    /// A matching subscription existed but no callback was registered.
    Unhandled,
    /// Dropped: no subscription, stale identity, or abort suppression.
    Suppressed,
}

struct Subscription {
    id: UploadId,
    aborting: Arc<AtomicBool>,
    callbacks: Arc<CallbackSet>,
}

/// Correlates events back to the active upload by identity.
///
/// Exactly one subscription is active at a time. Subscribing replaces the
/// previous registration in the same operation, so events tagged with an
/// old identity can never be delivered once a new identity is active.
/// While the aborting flag is set, `Progress` and `Error` events are
/// suppressed entirely; a racing `Success` is suppressed too (the abort
/// wins) but still tears the subscription down.
#[derive(Default)]
pub struct EventRouter {
    active: RwLock<Option<Subscription>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activates routing for `id`, replacing any previous subscription.
    pub fn subscribe(&self, id: UploadId, aborting: Arc<AtomicBool>, callbacks: Arc<CallbackSet>) {
        debug!(upload = %id, "subscribed");
        *self.active.write().unwrap() = Some(Subscription {
            id,
            aborting,
            callbacks,
        });
    }

    /// Tears down the active subscription.
    pub fn unsubscribe(&self) {
        self.active.write().unwrap().take();
    }

    /// The identity currently being routed, if any.
    pub fn active_identity(&self) -> Option<UploadId> {
        self.active.read().unwrap().as_ref().map(|s| s.id.clone())
    }

    /// Dispatches one event according to the rules above.
    ///
    /// `Success` and a delivered `Error` are terminal: the subscription is
    /// torn down after them.
    pub fn dispatch(&self, event: UploadEvent<'_>) -> Dispatch {
        let (result, teardown) = {
            let guard = self.active.read().unwrap();
            let Some(sub) = guard.as_ref() else {
                debug!(upload = %event.identity(), "event without subscription dropped");
                return Dispatch::Suppressed;
            };
            if sub.id != *event.identity() {
                debug!(
                    event = %event.identity(),
                    active = %sub.id,
                    "stale event dropped"
                );
                return Dispatch::Suppressed;
            }

            let aborting = sub.aborting.load(Ordering::SeqCst);
            match event {
                UploadEvent::Progress {
                    bytes_uploaded,
                    bytes_total,
                    ..
                } => {
                    if aborting {
                        (Dispatch::Suppressed, false)
                    } else if sub.callbacks.fire_progress(bytes_uploaded, bytes_total) {
                        (Dispatch::Delivered, false)
                    } else {
                        (Dispatch::Unhandled, false)
                    }
                }
                UploadEvent::Success { url, .. } => {
                    if aborting {
                        // The abort won the race; the subscription still
                        // goes away.
                        (Dispatch::Suppressed, true)
                    } else if sub.callbacks.fire_success(url) {
                        (Dispatch::Delivered, true)
                    } else {
                        (Dispatch::Unhandled, true)
                    }
                }
                UploadEvent::Error { error, .. } => {
                    if aborting {
                        (Dispatch::Suppressed, false)
                    } else if sub.callbacks.fire_error(error) {
                        (Dispatch::Delivered, true)
                    } else {
                        (Dispatch::Unhandled, true)
                    }
                }
            }
        };

        if teardown {
            self.unsubscribe();
        }
        result
    }
}

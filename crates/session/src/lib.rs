//! Resumable upload session core.
//!
//! This crate owns the lifecycle of one upload: remote creation, the
//! chunked transfer loop, resume from the last acknowledged offset, and
//! abort. Events produced by an attempt are correlated back to the active
//! upload by identity through the [`EventRouter`] before they reach user
//! callbacks.
//!
//! The byte source, the transport, and the resume-state store are trait
//! objects supplied by the caller; the facade crate wires up the defaults.

mod driver;
mod error;
mod events;
mod router;
mod state;

pub use driver::{AttemptOutcome, SessionDriver};
pub use error::UploadError;
pub use events::{CallbackSet, ErrorCallback, ProgressCallback, SuccessCallback, UploadEvent};
pub use router::{Dispatch, EventRouter};
pub use state::{SessionState, UploadSession};

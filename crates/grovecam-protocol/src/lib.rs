//! Grove serial camera protocol engine.
//!
//! Drives an OV528 camera over a [`grovecam_transport::SerialSession`]:
//! synchronize, send settings, snapshot, then pull the JPEG back package by
//! package with checksum-guarded retries. [`Camera`] bundles the whole flow;
//! the individual phases are public for callers that want finer control.

pub mod camera;
pub mod cancel;
pub mod config;
pub mod error;
mod exchange;
pub mod handshake;
pub mod query;
pub mod retrieve;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use camera::Camera;
pub use cancel::CancelFlag;
pub use config::{
    HandshakeConfig, RetrievalConfig, SessionConfig, Termination, DEFAULT_BAUD,
    DEFAULT_MAX_PACKAGE_RETRIES, DEFAULT_SETTINGS_TIMEOUT, DEFAULT_SYNC_INTERVAL,
    DEFAULT_SYNC_RETRIES,
};
pub use error::{CameraError, Result};
pub use handshake::{handshake, Handshake, HandshakeOutcome, HandshakeState};
pub use query::query_picture_length;
pub use retrieve::{package_count, retrieve_image, RetrievedImage};

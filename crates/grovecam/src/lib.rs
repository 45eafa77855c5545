//! Capture JPEG pictures from a Grove serial camera (OV528 command set).
//!
//! # Crate Structure
//!
//! - [`transport`]: serial link, timer and polling session
//! - [`frame`]: 6-byte command frames, image packages and checksums
//! - [`protocol`]: handshake, picture length query, package retrieval, [`Camera`]
//! - [`store`]: writing finished pictures to disk
//!
//! ```no_run
//! # #[cfg(feature = "serial")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use grovecam::store::{DirectoryStore, ImageStore, DEFAULT_PREFIX};
//! use grovecam::{Camera, SessionConfig};
//!
//! let mut camera = Camera::open("/dev/ttyUSB0", SessionConfig::default())?;
//! let image = camera.capture()?;
//! let path = DirectoryStore::default().save(&image.data, DEFAULT_PREFIX)?;
//! println!("saved {}", path.display());
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "serial"))]
//! # fn main() {}
//! ```

pub mod store;

/// Re-export transport types.
pub mod transport {
    pub use grovecam_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use grovecam_frame::*;
}

/// Re-export protocol types.
pub mod protocol {
    pub use grovecam_protocol::*;
}

pub use grovecam_protocol::{
    Camera, CameraError, CancelFlag, RetrievedImage, SessionConfig, Termination,
};

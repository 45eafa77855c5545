use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use grovecam_frame::PackageSize;
use grovecam_transport::SessionOptions;

use crate::error::{CameraError, Result};

/// Baud rate the camera boots with.
pub const DEFAULT_BAUD: u32 = 9600;

/// SYNC frames sent before giving up.
pub const DEFAULT_SYNC_RETRIES: u32 = 64;

/// Pause between SYNC frames.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_millis(100);

/// Deadline for the settings acknowledgement.
pub const DEFAULT_SETTINGS_TIMEOUT: Duration = Duration::from_secs(2);

/// Re-requests of a single package before the retrieval fails.
pub const DEFAULT_MAX_PACKAGE_RETRIES: u32 = 8;

/// How the retriever decides the image is complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Termination {
    /// Request exactly `ceil(length / payload_capacity)` packages.
    Counted,
    /// Request packages until the payload ends with the JPEG `FF D9` marker.
    #[default]
    Marker,
}

impl Termination {
    pub fn as_str(self) -> &'static str {
        match self {
            Termination::Counted => "counted",
            Termination::Marker => "marker",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Termination {
    type Err = CameraError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "counted" => Ok(Termination::Counted),
            "marker" => Ok(Termination::Marker),
            other => Err(CameraError::InvalidConfig(format!(
                "unknown termination policy {other:?} (expected counted or marker)"
            ))),
        }
    }
}

/// Synchronization and settings negotiation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// Maximum number of SYNC frames to send.
    pub sync_retries: u32,
    /// Sleep after each SYNC before checking for a reply.
    pub sync_interval: Duration,
    /// Deadline for the settings ACK.
    pub settings_timeout: Duration,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            sync_retries: DEFAULT_SYNC_RETRIES,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            settings_timeout: DEFAULT_SETTINGS_TIMEOUT,
        }
    }
}

/// Package transfer parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalConfig {
    pub package_size: PackageSize,
    pub termination: Termination,
    /// Re-requests allowed per package after a checksum failure.
    pub max_package_retries: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            package_size: PackageSize::default(),
            termination: Termination::default(),
            max_package_retries: DEFAULT_MAX_PACKAGE_RETRIES,
        }
    }
}

/// Everything needed to open and drive one camera session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub baud: u32,
    pub options: SessionOptions,
    pub handshake: HandshakeConfig,
    pub retrieval: RetrievalConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            baud: DEFAULT_BAUD,
            options: SessionOptions::default(),
            handshake: HandshakeConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Check values the types alone cannot rule out.
    pub fn validate(&self) -> Result<()> {
        if self.baud == 0 {
            return Err(CameraError::InvalidConfig("baud rate must be > 0".into()));
        }
        if self.handshake.sync_retries == 0 {
            return Err(CameraError::InvalidConfig(
                "sync retry budget must be > 0".into(),
            ));
        }
        if self.options.poll_interval.is_zero() {
            return Err(CameraError::InvalidConfig(
                "poll interval must be > 0".into(),
            ));
        }
        if self.options.read_timeout.is_zero() {
            return Err(CameraError::InvalidConfig(
                "read timeout must be > 0".into(),
            ));
        }
        if self.handshake.settings_timeout.is_zero() {
            return Err(CameraError::InvalidConfig(
                "settings timeout must be > 0".into(),
            ));
        }
        Ok(())
    }
}

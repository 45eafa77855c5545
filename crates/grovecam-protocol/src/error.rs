use grovecam_frame::FrameError;
use grovecam_transport::TransportError;

/// Errors that can occur while talking to the camera.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    /// Serial link failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Malformed frame or package.
    #[error("frame error: {0}")]
    Frame(#[source] FrameError),

    /// Rejected session configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The camera never answered a SYNC.
    #[error("camera did not respond after {attempts} sync attempts")]
    SyncTimeout { attempts: u32 },

    /// The camera answered with something other than the expected frame.
    #[error("protocol mismatch during {phase}: {detail}")]
    ProtocolMismatch { phase: &'static str, detail: String },

    /// A package checksum did not match. Recovered by re-requesting the
    /// package.
    #[error("checksum mismatch in package {sequence}: computed 0x{computed:02X}, received 0x{received:02X}")]
    ChecksumMismatch {
        sequence: u16,
        computed: u8,
        received: u8,
    },

    /// A package kept failing its checksum.
    #[error("package {sequence} failed checksum {attempts} times")]
    ChecksumExhausted { sequence: u16, attempts: u32 },

    /// The picture needs more packages than the 16-bit sequence space holds.
    #[error("picture of {length} bytes does not fit in 65536 packages of {package_size} bytes")]
    PictureTooLarge { length: u32, package_size: u16 },

    /// Retrieval was cancelled between packages.
    #[error("capture cancelled")]
    Cancelled,
}

impl From<FrameError> for CameraError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::Transport(inner) => CameraError::Transport(inner),
            other => CameraError::Frame(other),
        }
    }
}

impl CameraError {
    pub(crate) fn mismatch(phase: &'static str, detail: impl Into<String>) -> Self {
        CameraError::ProtocolMismatch {
            phase,
            detail: detail.into(),
        }
    }

    /// Whether the failure was a read deadline expiring.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CameraError::Transport(TransportError::Timeout { .. }))
            || matches!(self, CameraError::SyncTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, CameraError>;

/// Errors that can occur while building or decoding frames and packages.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The buffer is too short (or the wrong size) for the requested operation.
    #[error("invalid frame length: {len} bytes ({requirement})")]
    InvalidFrameLength {
        len: usize,
        requirement: &'static str,
    },

    /// A frame did not start with the 0xAA sync byte.
    #[error("invalid sync byte 0x{0:02X} (expected 0xAA)")]
    InvalidSync(u8),

    /// Package size outside the range the camera accepts.
    #[error("package size {0} out of range (16..=2048)")]
    InvalidPackageSize(u16),

    /// The package header declares more payload than the package holds.
    #[error("declared payload of {declared} bytes exceeds package capacity {capacity}")]
    PayloadOverflow { declared: usize, capacity: usize },

    /// The serial link failed while sending or receiving a frame.
    #[error("frame transport error: {0}")]
    Transport(#[from] grovecam_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, FrameError>;

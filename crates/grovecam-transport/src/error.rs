use std::time::Duration;

/// Errors that can occur on the serial link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial device.
    #[error("failed to open {port} at {baud} baud: {source}")]
    Open {
        port: String,
        baud: u32,
        source: std::io::Error,
    },

    /// An I/O error occurred on the serial link.
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fewer bytes than requested arrived before the read deadline.
    #[error("timed out after {after:?} waiting for {wanted} bytes ({available} available)")]
    Timeout {
        wanted: usize,
        available: usize,
        after: Duration,
    },

    /// The session has been closed.
    #[error("serial session closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;

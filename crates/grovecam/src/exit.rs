use std::fmt;
use std::io;

use grovecam::store::StoreError;
use grovecam_protocol::CameraError;
use grovecam_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;
pub const CANCELLED: i32 = 130;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn camera_error(context: &str, err: CameraError) -> CliError {
    match err {
        CameraError::Transport(err) => transport_error(context, err),
        CameraError::SyncTimeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        CameraError::InvalidConfig(_) => CliError::new(USAGE, format!("{context}: {err}")),
        CameraError::Cancelled => CliError::new(CANCELLED, format!("{context}: {err}")),
        CameraError::Frame(_)
        | CameraError::ProtocolMismatch { .. }
        | CameraError::ChecksumMismatch { .. }
        | CameraError::ChecksumExhausted { .. }
        | CameraError::PictureTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn store_error(context: &str, err: StoreError) -> CliError {
    match err {
        StoreError::CreateDir { path, source } | StoreError::Write { path, source } => {
            io_error(&format!("{context} ({})", path.display()), source)
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn camera_errors_map_to_exit_codes() {
        let cases = [
            (CameraError::SyncTimeout { attempts: 64 }, TIMEOUT),
            (CameraError::Cancelled, CANCELLED),
            (CameraError::InvalidConfig("x".into()), USAGE),
            (
                CameraError::ChecksumExhausted {
                    sequence: 3,
                    attempts: 9,
                },
                DATA_INVALID,
            ),
            (
                CameraError::ProtocolMismatch {
                    phase: "sync",
                    detail: "bad".into(),
                },
                DATA_INVALID,
            ),
            (CameraError::Transport(TransportError::Closed), TRANSPORT_ERROR),
            (
                CameraError::Transport(TransportError::Timeout {
                    wanted: 6,
                    available: 0,
                    after: Duration::from_secs(2),
                }),
                TIMEOUT,
            ),
        ];

        for (err, code) in cases {
            assert_eq!(camera_error("capture failed", err).code, code);
        }
    }

    #[test]
    fn store_errors_keep_path_in_message() {
        let err = store_error(
            "save failed",
            StoreError::Write {
                path: "pictures/x.jpg".into(),
                source: io::Error::new(io::ErrorKind::Other, "disk full"),
            },
        );
        assert_eq!(err.code, FAILURE);
        assert!(err.message.contains("pictures/x.jpg"));
    }
}

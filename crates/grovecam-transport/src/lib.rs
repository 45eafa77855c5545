//! Serial transport session for the Grove serial camera.
//!
//! This is the lowest layer of grovecam. It owns the serial link and offers
//! blocking reads with polling-until-available semantics:
//! - [`SerialTransport`]: the raw byte link (write, read buffered, available)
//! - [`Timer`]: the time source used for polling and deadlines
//! - [`SerialSession`]: open/drain/close plus `read_exact` with a hard deadline
//!
//! The `serial` feature adds a `serialport`-backed transport.

pub mod error;
pub mod session;
pub mod traits;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

#[cfg(feature = "serial")]
pub mod serial;

pub use error::{Result, TransportError};
pub use session::{SerialSession, SessionOptions, DEFAULT_POLL_INTERVAL, DEFAULT_READ_TIMEOUT};
pub use traits::{SerialTransport, SystemTimer, Timer};

#[cfg(feature = "serial")]
pub use serial::{list_ports, PortInfo, SerialPortTransport};

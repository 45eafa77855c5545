use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::traits::{SerialTransport, SystemTimer, Timer};

/// Default interval between availability checks while waiting for bytes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default hard deadline for a single `read_exact` call.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Timing configuration for a [`SerialSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Sleep between `available()` checks while a read is pending.
    pub poll_interval: Duration,
    /// Maximum time a single `read_exact` may block.
    pub read_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Owns a serial link for its whole lifetime.
///
/// Reads poll the transport at `poll_interval` until the requested number of
/// bytes has arrived or the deadline passes. There is no buffering beyond
/// what the transport itself provides.
pub struct SerialSession<T, C = SystemTimer> {
    transport: T,
    timer: C,
    options: SessionOptions,
    closed: bool,
}

impl<T: SerialTransport, C: Timer> SerialSession<T, C> {
    /// Wrap an already-open transport.
    pub fn new(transport: T, timer: C, options: SessionOptions) -> Self {
        Self {
            transport,
            timer,
            options,
            closed: false,
        }
    }

    /// Write every byte to the link.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_open()?;
        trace!(len = bytes.len(), "serial write");
        self.transport.write_all(bytes)
    }

    /// Number of inbound bytes ready to read.
    pub fn available(&mut self) -> Result<usize> {
        self.ensure_open()?;
        self.transport.available()
    }

    /// Read exactly `n` bytes using the session's read deadline.
    pub fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.read_exact_into(&mut buf)?;
        Ok(buf)
    }

    /// Fill `buf` completely using the session's read deadline.
    pub fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<()> {
        let timeout = self.options.read_timeout;
        self.read_exact_within(buf, timeout)
    }

    /// Fill `buf` completely, failing with [`TransportError::Timeout`] once
    /// `timeout` has elapsed.
    pub fn read_exact_within(&mut self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        self.ensure_open()?;
        let started = self.timer.now();
        let mut filled = 0usize;

        while filled < buf.len() {
            let ready = self.transport.available()?;
            if ready > 0 {
                let take = ready.min(buf.len() - filled);
                let read = self.transport.read(&mut buf[filled..filled + take])?;
                filled += read;
                if filled == buf.len() {
                    break;
                }
            }

            if self.timer.elapsed_since(started) >= timeout {
                return Err(TransportError::Timeout {
                    wanted: buf.len(),
                    available: filled,
                    after: timeout,
                });
            }
            self.timer.sleep(self.options.poll_interval);
        }

        Ok(())
    }

    /// Discard every inbound byte currently buffered. Returns the count.
    pub fn drain(&mut self) -> Result<usize> {
        let pending = self.available()?;
        if pending == 0 {
            return Ok(0);
        }

        let mut sink = vec![0u8; pending];
        let discarded = self.transport.read(&mut sink)?;
        debug!(discarded, "drained serial input");
        Ok(discarded)
    }

    /// Sleep on the session's timer.
    pub fn sleep(&mut self, duration: Duration) {
        self.timer.sleep(duration);
    }

    /// Close the link. Further I/O fails with [`TransportError::Closed`].
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!("closing serial session");
        self.transport.close()
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Session timing configuration.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Borrow the session's timer.
    pub fn timer(&self) -> &C {
        &self.timer
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the session and return the transport without closing it.
    pub fn into_inner(self) -> T {
        self.transport
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}

#[cfg(feature = "serial")]
impl SerialSession<crate::serial::SerialPortTransport, SystemTimer> {
    /// Open a serial device (8N1) and wrap it in a session.
    pub fn open(port: &str, baud: u32, options: SessionOptions) -> Result<Self> {
        let transport = crate::serial::SerialPortTransport::open(port, baud)?;
        Ok(Self::new(transport, SystemTimer, options))
    }
}

impl<T, C> std::fmt::Debug for SerialSession<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSession")
            .field("options", &self.options)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::mock::{ManualTimer, MockLink};

    fn session(link: MockLink) -> SerialSession<MockLink, ManualTimer> {
        let timer = link.clock();
        SerialSession::new(link, timer, SessionOptions::default())
    }

    #[test]
    fn read_exact_returns_buffered_bytes() {
        let mut link = MockLink::silent();
        link.push_inbound(&[1, 2, 3, 4]);
        let mut session = session(link);

        assert_eq!(session.read_exact(3).unwrap(), vec![1, 2, 3]);
        assert_eq!(session.available().unwrap(), 1);
    }

    #[test]
    fn read_exact_waits_for_late_bytes() {
        let mut link = MockLink::silent();
        link.schedule(Duration::from_millis(35), &[9, 8]);
        let mut session = session(link);

        let started = session.timer().now();
        assert_eq!(session.read_exact(2).unwrap(), vec![9, 8]);
        let waited = session.timer().elapsed_since(started);
        assert!(waited >= Duration::from_millis(35));
        assert!(waited < Duration::from_millis(60));
    }

    #[test]
    fn read_exact_times_out_with_partial_count() {
        let mut link = MockLink::silent();
        link.push_inbound(&[0xAA, 0x0E]);
        let mut session = session(link);

        let err = session.read_exact(6).unwrap_err();
        match err {
            TransportError::Timeout {
                wanted,
                available,
                after,
            } => {
                assert_eq!(wanted, 6);
                assert_eq!(available, 2);
                assert_eq!(after, DEFAULT_READ_TIMEOUT);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_length_read_never_touches_the_link() {
        let mut session = session(MockLink::silent());
        assert!(session.read_exact(0).unwrap().is_empty());
    }

    #[test]
    fn drain_discards_everything_buffered() {
        let mut link = MockLink::silent();
        link.push_inbound(&[1, 2, 3, 4, 5]);
        let mut session = session(link);

        assert_eq!(session.drain().unwrap(), 5);
        assert_eq!(session.available().unwrap(), 0);
        assert_eq!(session.drain().unwrap(), 0);
    }

    #[test]
    fn closed_session_rejects_io() {
        let mut session = session(MockLink::silent());
        session.close().unwrap();
        session.close().unwrap();

        assert!(session.is_closed());
        assert!(session.get_ref().is_closed());
        assert!(matches!(session.write(&[0xAA]), Err(TransportError::Closed)));
        assert!(matches!(session.read_exact(1), Err(TransportError::Closed)));
        assert!(matches!(session.drain(), Err(TransportError::Closed)));
    }

    #[test]
    fn writes_reach_the_link() {
        let mut session = session(MockLink::silent());
        session.write(&[0xAA, 0x0D, 0, 0, 0, 0]).unwrap();
        assert_eq!(session.get_ref().writes(), &[vec![0xAA, 0x0D, 0, 0, 0, 0]]);
    }
}

use std::time::{Duration, Instant};

use crate::error::Result;

/// A raw serial link: the byte-level collaborator the session drives.
///
/// Implementations never block waiting for data in [`read`](Self::read); the
/// session polls [`available`](Self::available) and only reads what is
/// already buffered.
pub trait SerialTransport {
    /// Write every byte of `bytes` to the link.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read up to `buf.len()` already-buffered bytes, returning the count.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Number of inbound bytes buffered and ready to read.
    fn available(&mut self) -> Result<usize>;

    /// Release the underlying device.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: SerialTransport + ?Sized> SerialTransport for Box<T> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn available(&mut self) -> Result<usize> {
        (**self).available()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Source of time for polling loops and deadlines.
pub trait Timer {
    /// The current instant.
    fn now(&self) -> Instant;

    /// Block the calling thread for `duration`.
    fn sleep(&mut self, duration: Duration);

    /// Time elapsed since `earlier`.
    fn elapsed_since(&self, earlier: Instant) -> Duration {
        self.now().saturating_duration_since(earlier)
    }
}

/// Wall-clock timer backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimer;

impl Timer for SystemTimer {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_timer_elapsed_is_monotonic() {
        let mut timer = SystemTimer;
        let start = timer.now();
        timer.sleep(Duration::from_millis(2));
        assert!(timer.elapsed_since(start) >= Duration::from_millis(2));
    }
}

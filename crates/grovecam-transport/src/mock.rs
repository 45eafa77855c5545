//! In-memory serial link and virtual clock for exercising protocol code
//! without a device attached.
//!
//! [`MockLink`] records every write and hands it to a [`Responder`], which
//! schedules reply bytes on the shared [`ManualTimer`] clock. Scheduled bytes
//! become readable once the clock reaches their due instant, so deadlines and
//! retry budgets run in virtual time.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::error::{Result, TransportError};
use crate::traits::{SerialTransport, Timer};

/// A virtual clock. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualTimer {
    now: Rc<Cell<Instant>>,
}

impl ManualTimer {
    /// Start a clock at the current wall-clock instant.
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

impl Default for ManualTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for ManualTimer {
    fn now(&self) -> Instant {
        self.now.get()
    }

    fn sleep(&mut self, duration: Duration) {
        self.advance(duration);
    }
}

/// Bytes the simulated device sends back after `delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub delay: Duration,
    pub bytes: Vec<u8>,
}

impl Reply {
    /// Reply visible immediately.
    pub fn now(bytes: impl Into<Vec<u8>>) -> Self {
        Self::after(Duration::ZERO, bytes)
    }

    /// Reply visible once `delay` has passed on the clock.
    pub fn after(delay: Duration, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            delay,
            bytes: bytes.into(),
        }
    }
}

/// Reacts to host writes.
pub trait Responder {
    fn on_write(&mut self, written: &[u8]) -> Vec<Reply>;
}

impl<F> Responder for F
where
    F: FnMut(&[u8]) -> Vec<Reply>,
{
    fn on_write(&mut self, written: &[u8]) -> Vec<Reply> {
        self(written)
    }
}

struct Silent;

impl Responder for Silent {
    fn on_write(&mut self, _written: &[u8]) -> Vec<Reply> {
        Vec::new()
    }
}

/// Scripted serial link.
pub struct MockLink {
    clock: ManualTimer,
    inbound: VecDeque<u8>,
    scheduled: Vec<(Instant, Vec<u8>)>,
    writes: Vec<Vec<u8>>,
    responder: Box<dyn Responder>,
    closed: bool,
}

impl MockLink {
    /// A link whose device answers through `responder`.
    pub fn new(responder: impl Responder + 'static) -> Self {
        Self::with_clock(ManualTimer::new(), responder)
    }

    /// Like [`new`](Self::new) but sharing an existing clock.
    pub fn with_clock(clock: ManualTimer, responder: impl Responder + 'static) -> Self {
        Self {
            clock,
            inbound: VecDeque::new(),
            scheduled: Vec::new(),
            writes: Vec::new(),
            responder: Box::new(responder),
            closed: false,
        }
    }

    /// A link whose device never answers.
    pub fn silent() -> Self {
        Self::new(Silent)
    }

    /// Handle to the link's clock.
    pub fn clock(&self) -> ManualTimer {
        self.clock.clone()
    }

    /// Make `bytes` readable right away.
    pub fn push_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    /// Make `bytes` readable once `delay` has passed.
    pub fn schedule(&mut self, delay: Duration, bytes: &[u8]) {
        self.scheduled.push((self.clock.now() + delay, bytes.to_vec()));
    }

    /// Every write call in order.
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// Number of writes equal to `frame`.
    pub fn count_writes(&self, frame: &[u8]) -> usize {
        self.writes.iter().filter(|w| w.as_slice() == frame).count()
    }

    /// Whether `close` was called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn release_due(&mut self) {
        let now = self.clock.now();
        let mut due: Vec<(Instant, Vec<u8>)> = Vec::new();
        let mut pending = Vec::with_capacity(self.scheduled.len());
        for entry in self.scheduled.drain(..) {
            if entry.0 <= now {
                due.push(entry);
            } else {
                pending.push(entry);
            }
        }
        self.scheduled = pending;
        due.sort_by_key(|(at, _)| *at);
        for (_, bytes) in due {
            self.inbound.extend(bytes);
        }
    }
}

impl SerialTransport for MockLink {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.writes.push(bytes.to_vec());
        for reply in self.responder.on_write(bytes) {
            self.schedule(reply.delay, &reply.bytes);
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.release_due();
        let count = buf.len().min(self.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(self.inbound.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }

    fn available(&mut self) -> Result<usize> {
        self.release_due();
        Ok(self.inbound.len())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

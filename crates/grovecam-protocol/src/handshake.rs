use grovecam_frame::{send_frame, CommandFrame, SYNC};
use grovecam_transport::{SerialSession, SerialTransport, Timer};
use tracing::{debug, info, warn};

use crate::config::HandshakeConfig;
use crate::error::{CameraError, Result};
use crate::exchange::{expect_ack, read_reply};

/// Where the handshake currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    /// SYNC frames are being sent until the camera answers.
    Syncing,
    /// The camera answered; its ACK and own SYNC are being checked.
    Acknowledging,
    /// SYNC is acknowledged both ways; settings are next.
    SettingsPending,
    Ready,
    Failed,
}

/// Summary of a completed handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeOutcome {
    /// SYNC frames sent before the camera answered.
    pub sync_attempts: u32,
    /// Bytes discarded while draining the link.
    pub discarded_bytes: usize,
}

/// Camera synchronization and settings negotiation, one transition per
/// [`step`](Handshake::step).
///
/// ```text
/// Idle ─▶ Syncing ─▶ Acknowledging ─▶ SettingsPending ─▶ Ready
///            │             │                 │
///            └─────────────┴─────────────────┴──▶ Failed
/// ```
#[derive(Debug, Clone)]
pub struct Handshake {
    config: HandshakeConfig,
    state: HandshakeState,
    sync_attempts: u32,
    discarded_bytes: usize,
}

impl Handshake {
    pub fn new(config: HandshakeConfig) -> Self {
        Self {
            config,
            state: HandshakeState::Idle,
            sync_attempts: 0,
            discarded_bytes: 0,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// SYNC frames sent so far.
    pub fn sync_attempts(&self) -> u32 {
        self.sync_attempts
    }

    /// Outcome once the state machine reached `Ready`.
    pub fn outcome(&self) -> Option<HandshakeOutcome> {
        (self.state == HandshakeState::Ready).then_some(HandshakeOutcome {
            sync_attempts: self.sync_attempts,
            discarded_bytes: self.discarded_bytes,
        })
    }

    /// Perform one transition. Any error moves the machine to `Failed`.
    pub fn step<T: SerialTransport, C: Timer>(
        &mut self,
        session: &mut SerialSession<T, C>,
    ) -> Result<HandshakeState> {
        let next = match self.state {
            HandshakeState::Idle => {
                debug!(budget = self.config.sync_retries, "starting camera sync");
                Ok(HandshakeState::Syncing)
            }
            HandshakeState::Syncing => self.sync_once(session),
            HandshakeState::Acknowledging => self.acknowledge(session),
            HandshakeState::SettingsPending => self.send_settings(session),
            HandshakeState::Ready => Ok(HandshakeState::Ready),
            HandshakeState::Failed => Err(CameraError::mismatch(
                "handshake",
                "handshake already failed; open a new session",
            )),
        };

        match next {
            Ok(state) => {
                self.state = state;
                Ok(state)
            }
            Err(err) => {
                self.state = HandshakeState::Failed;
                Err(err)
            }
        }
    }

    fn sync_once<T: SerialTransport, C: Timer>(
        &mut self,
        session: &mut SerialSession<T, C>,
    ) -> Result<HandshakeState> {
        send_frame(session, &CommandFrame::sync())?;
        self.sync_attempts += 1;
        session.sleep(self.config.sync_interval);

        if session.available()? > 0 {
            debug!(attempt = self.sync_attempts, "camera answered sync");
            return Ok(HandshakeState::Acknowledging);
        }
        if self.sync_attempts >= self.config.sync_retries {
            warn!(attempts = self.sync_attempts, "camera never answered sync");
            return Err(CameraError::SyncTimeout {
                attempts: self.sync_attempts,
            });
        }
        Ok(HandshakeState::Syncing)
    }

    fn acknowledge<T: SerialTransport, C: Timer>(
        &mut self,
        session: &mut SerialSession<T, C>,
    ) -> Result<HandshakeState> {
        let ack = read_reply(session, "sync", None)?;
        if !ack.is_ack_for(SYNC) {
            warn!(received = %ack, "camera sent a wrong sync ACK");
            return Err(CameraError::mismatch(
                "sync",
                format!("expected ACK for SYNC, received {ack}"),
            ));
        }
        self.discarded_bytes += session.drain()?;

        let camera_sync = read_reply(session, "sync", None)?;
        if !camera_sync.is_sync() {
            warn!(received = %camera_sync, "camera sent no SYNC after its ACK");
            return Err(CameraError::mismatch(
                "sync",
                format!("expected camera SYNC, received {camera_sync}"),
            ));
        }
        send_frame(session, &CommandFrame::ack(SYNC))?;
        Ok(HandshakeState::SettingsPending)
    }

    fn send_settings<T: SerialTransport, C: Timer>(
        &mut self,
        session: &mut SerialSession<T, C>,
    ) -> Result<HandshakeState> {
        expect_ack(
            session,
            &CommandFrame::settings(),
            "settings",
            Some(self.config.settings_timeout),
        )?;
        self.discarded_bytes += session.drain()?;
        Ok(HandshakeState::Ready)
    }
}

/// Run the handshake to completion.
pub fn handshake<T: SerialTransport, C: Timer>(
    session: &mut SerialSession<T, C>,
    config: &HandshakeConfig,
) -> Result<HandshakeOutcome> {
    let mut machine = Handshake::new(config.clone());
    loop {
        if let Some(outcome) = machine.outcome() {
            info!(
                sync_attempts = outcome.sync_attempts,
                discarded = outcome.discarded_bytes,
                "camera ready"
            );
            return Ok(outcome);
        }
        machine.step(session)?;
    }
}

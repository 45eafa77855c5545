use grovecam_transport::{SerialSession, SerialTransport, SystemTimer, Timer};
use tracing::debug;

use crate::cancel::CancelFlag;
use crate::config::SessionConfig;
use crate::error::Result;
use crate::handshake::{handshake, HandshakeOutcome};
use crate::query::query_picture_length;
use crate::retrieve::{retrieve_image, RetrievedImage};

/// A synchronized camera.
///
/// Constructing one runs the handshake, so every method here starts from
/// the `Ready` state. All operations take `&mut self`; one capture at a time.
pub struct Camera<T: SerialTransport, C: Timer = SystemTimer> {
    session: SerialSession<T, C>,
    config: SessionConfig,
    outcome: HandshakeOutcome,
    cancel: CancelFlag,
}

impl<T: SerialTransport, C: Timer> Camera<T, C> {
    /// Handshake over an already-open transport.
    pub fn connect(transport: T, timer: C, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let session = SerialSession::new(transport, timer, config.options);
        Self::from_session(session, config)
    }

    /// Handshake over an existing session.
    pub fn from_session(mut session: SerialSession<T, C>, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let outcome = match handshake(&mut session, &config.handshake) {
            Ok(outcome) => outcome,
            Err(err) => {
                let _ = session.close();
                return Err(err);
            }
        };
        Ok(Self {
            session,
            config,
            outcome,
            cancel: CancelFlag::new(),
        })
    }

    /// Replace the cancellation flag, e.g. with one wired to Ctrl-C.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn handshake_outcome(&self) -> HandshakeOutcome {
        self.outcome
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Snapshot and report the picture length without retrieving it.
    pub fn picture_length(&mut self) -> Result<u32> {
        query_picture_length(&mut self.session, self.config.retrieval.package_size)
    }

    /// Snapshot and retrieve one picture.
    pub fn capture(&mut self) -> Result<RetrievedImage> {
        let length = self.picture_length()?;
        debug!(
            length,
            termination = %self.config.retrieval.termination,
            "retrieving picture"
        );
        retrieve_image(&mut self.session, length, &self.config.retrieval, &self.cancel)
    }

    /// Release the port. Safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        self.session.close()?;
        Ok(())
    }

    pub fn session(&self) -> &SerialSession<T, C> {
        &self.session
    }

    pub fn into_session(self) -> SerialSession<T, C> {
        self.session
    }
}

#[cfg(feature = "serial")]
impl Camera<grovecam_transport::SerialPortTransport, SystemTimer> {
    /// Open `port` at the configured baud rate and handshake.
    pub fn open(port: &str, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let session = SerialSession::open(port, config.baud, config.options)?;
        Self::from_session(session, config)
    }
}

impl<T: SerialTransport, C: Timer> std::fmt::Debug for Camera<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Camera")
            .field("config", &self.config)
            .field("outcome", &self.outcome)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use grovecam_frame::{CommandFrame, PackageSize};
    use grovecam_transport::mock::MockLink;

    use super::*;
    use crate::config::Termination;
    use crate::error::CameraError;
    use crate::mock::MockCamera;

    fn camera_config(termination: Termination) -> SessionConfig {
        let mut config = SessionConfig::default();
        config.retrieval.package_size = PackageSize::new(64).unwrap();
        config.retrieval.termination = termination;
        config
    }

    #[test]
    fn connect_then_capture() {
        let mut picture: Vec<u8> = (0..200u8).collect();
        picture.extend_from_slice(&[0xFF, 0xD9]);
        let link = MockLink::new(MockCamera::new(picture.clone()).answering_sync(2));
        let clock = link.clock();

        let mut camera = Camera::connect(link, clock, camera_config(Termination::Marker)).unwrap();
        assert_eq!(camera.handshake_outcome().sync_attempts, 2);

        let image = camera.capture().unwrap();
        assert_eq!(&image.data[..], picture.as_slice());
        assert_eq!(image.packages, 4);

        camera.close().unwrap();
        camera.close().unwrap();
        assert!(camera.session().get_ref().is_closed());
    }

    #[test]
    fn capture_twice_on_one_session() {
        let picture = vec![0x10; 30];
        let link = MockLink::new(MockCamera::new(picture.clone()));
        let clock = link.clock();
        let mut camera =
            Camera::connect(link, clock, camera_config(Termination::Counted)).unwrap();

        assert_eq!(camera.capture().unwrap().data.len(), 30);
        assert_eq!(camera.capture().unwrap().data.len(), 30);
        assert_eq!(
            camera
                .session()
                .get_ref()
                .count_writes(CommandFrame::package_end_ack().as_bytes()),
            2
        );
    }

    #[test]
    fn failed_handshake_closes_link() {
        let link = MockLink::new(MockCamera::silent());
        let clock = link.clock();
        let mut config = SessionConfig::default();
        config.handshake.sync_retries = 2;

        let err = Camera::connect(link, clock, config).unwrap_err();
        assert!(matches!(err, CameraError::SyncTimeout { attempts: 2 }));
    }

    #[test]
    fn invalid_config_is_rejected_before_io() {
        let link = MockLink::silent();
        let clock = link.clock();
        let mut config = SessionConfig::default();
        config.handshake.sync_retries = 0;

        let err = Camera::connect(link, clock, config).unwrap_err();
        assert!(matches!(err, CameraError::InvalidConfig(_)));
    }

    #[test]
    fn cancelled_capture_reports_cancelled() {
        let link = MockLink::new(MockCamera::new(vec![1u8; 100]));
        let clock = link.clock();
        let cancel = CancelFlag::new();
        let mut camera = Camera::connect(link, clock, camera_config(Termination::Counted))
            .unwrap()
            .with_cancel_flag(cancel.clone());

        cancel.cancel();
        assert!(matches!(camera.capture(), Err(CameraError::Cancelled)));
    }
}

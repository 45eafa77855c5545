use grovecam_frame::{CommandFrame, PackageSize};
use grovecam_transport::{SerialSession, SerialTransport, Timer};
use tracing::{debug, info};

use crate::error::{CameraError, Result};
use crate::exchange::{expect_ack, read_reply};

/// Negotiate the package size, take a snapshot and ask for its length.
///
/// The session must already be handshaken.
pub fn query_picture_length<T: SerialTransport, C: Timer>(
    session: &mut SerialSession<T, C>,
    package_size: PackageSize,
) -> Result<u32> {
    debug!(package_size = package_size.get(), "setting package size");
    expect_ack(
        session,
        &CommandFrame::set_package_size(package_size),
        "package size",
        None,
    )?;

    debug!("taking snapshot");
    expect_ack(session, &CommandFrame::snapshot(), "snapshot", None)?;

    expect_ack(session, &CommandFrame::get_picture(), "get picture", None)?;
    let data = read_reply(session, "get picture", None)?;
    let length = data.picture_length().ok_or_else(|| {
        CameraError::mismatch("get picture", format!("expected DATA frame, received {data}"))
    })?;
    if length == 0 {
        return Err(CameraError::mismatch(
            "get picture",
            "camera reported an empty picture",
        ));
    }

    info!(length, "picture length received");
    Ok(length)
}

#[cfg(test)]
mod tests {
    use grovecam_frame::{SET_PACKAGE_SIZE, SNAPSHOT};
    use grovecam_transport::mock::{ManualTimer, MockLink, Reply};
    use grovecam_transport::{SessionOptions, TransportError};

    use super::*;
    use crate::config::HandshakeConfig;
    use crate::handshake::handshake;
    use crate::mock::MockCamera;

    fn ready_session(camera: MockCamera) -> SerialSession<MockLink, ManualTimer> {
        let mut session = camera.into_session();
        handshake(&mut session, &HandshakeConfig::default()).unwrap();
        session
    }

    #[test]
    fn reads_24_bit_length() {
        let camera = MockCamera::new(vec![0u8; 10]).reporting_length(0x01_0203);
        let mut session = ready_session(camera);

        let length = query_picture_length(&mut session, PackageSize::new(64).unwrap()).unwrap();

        assert_eq!(length, 0x01_0203);
        let link = session.get_ref();
        assert_eq!(
            link.count_writes(&[0xAA, SET_PACKAGE_SIZE, 0x08, 64, 0x00, 0x00]),
            1
        );
        assert_eq!(link.count_writes(&[0xAA, SNAPSHOT, 0, 0, 0, 0]), 1);
        assert_eq!(
            link.count_writes(CommandFrame::get_picture().as_bytes()),
            1
        );
    }

    #[test]
    fn zero_length_is_a_mismatch() {
        let mut session = ready_session(MockCamera::new(Vec::new()));

        let err = query_picture_length(&mut session, PackageSize::default()).unwrap_err();

        assert!(matches!(
            err,
            CameraError::ProtocolMismatch {
                phase: "get picture",
                ..
            }
        ));
    }

    #[test]
    fn ack_for_another_command_is_a_mismatch() {
        let camera = MockCamera::new(vec![0u8; 10]).acking_as(SET_PACKAGE_SIZE, 0x05);
        let mut session = ready_session(camera);

        let err = query_picture_length(&mut session, PackageSize::default()).unwrap_err();

        assert!(matches!(
            err,
            CameraError::ProtocolMismatch {
                phase: "package size",
                ..
            }
        ));
        assert_eq!(
            session
                .get_ref()
                .count_writes(CommandFrame::snapshot().as_bytes()),
            0
        );
    }

    #[test]
    fn unanswered_snapshot_is_a_timeout() {
        // Acknowledges the package size but nothing after it.
        let link = MockLink::new(|written: &[u8]| {
            if written[1] == SET_PACKAGE_SIZE {
                vec![Reply::now(vec![0xAA, 0x0E, SET_PACKAGE_SIZE, 0x00, 0x00, 0x00])]
            } else {
                Vec::new()
            }
        });
        let clock = link.clock();
        let mut session = SerialSession::new(link, clock, SessionOptions::default());

        let err = query_picture_length(&mut session, PackageSize::default()).unwrap_err();

        assert!(matches!(err, CameraError::Transport(TransportError::Timeout { .. })));
    }
}

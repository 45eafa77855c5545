use std::time::Duration;

use grovecam_transport::{SerialSession, SerialTransport, Timer};
use tracing::trace;

use crate::codec::{CommandFrame, Hex, ResponseFrame, FRAME_LEN};
use crate::command::command_name;
use crate::error::Result;

/// Write one command frame.
pub fn send_frame<T: SerialTransport, C: Timer>(
    session: &mut SerialSession<T, C>,
    frame: &CommandFrame,
) -> Result<()> {
    trace!(
        command = command_name(frame.command_id()),
        bytes = %Hex(frame.as_bytes()),
        "tx frame"
    );
    session.write(frame.as_bytes())?;
    Ok(())
}

/// Read one 6-byte response using the session's read timeout.
pub fn read_response<T: SerialTransport, C: Timer>(
    session: &mut SerialSession<T, C>,
) -> Result<ResponseFrame> {
    let mut buf = [0u8; FRAME_LEN];
    session.read_exact_into(&mut buf)?;
    let frame = ResponseFrame::parse(&buf)?;
    trace!(bytes = %frame, "rx frame");
    Ok(frame)
}

/// Read one 6-byte response, failing if it takes longer than `timeout`.
pub fn read_response_within<T: SerialTransport, C: Timer>(
    session: &mut SerialSession<T, C>,
    timeout: Duration,
) -> Result<ResponseFrame> {
    let mut buf = [0u8; FRAME_LEN];
    session.read_exact_within(&mut buf, timeout)?;
    let frame = ResponseFrame::parse(&buf)?;
    trace!(bytes = %frame, "rx frame");
    Ok(frame)
}

/// Read a package window of `window` bytes into `buf`, resizing it.
pub fn read_package<T: SerialTransport, C: Timer>(
    session: &mut SerialSession<T, C>,
    buf: &mut Vec<u8>,
    window: usize,
) -> Result<()> {
    buf.resize(window, 0);
    session.read_exact_into(buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use grovecam_transport::mock::{MockLink, Reply};
    use grovecam_transport::{SessionOptions, TransportError};

    use super::*;
    use crate::error::FrameError;

    #[test]
    fn send_then_read_ack() {
        let link = MockLink::new(|written: &[u8]| {
            vec![Reply::now(vec![0xAA, 0x0E, written[1], 0x01, 0x00, 0x00])]
        });
        let clock = link.clock();
        let mut session = SerialSession::new(link, clock, SessionOptions::default());

        send_frame(&mut session, &CommandFrame::snapshot()).unwrap();
        let ack = read_response(&mut session).unwrap();

        assert!(ack.is_ack_for(crate::command::SNAPSHOT));
        assert_eq!(
            session.get_ref().count_writes(CommandFrame::snapshot().as_bytes()),
            1
        );
    }

    #[test]
    fn short_response_times_out() {
        let mut link = MockLink::silent();
        link.push_inbound(&[0xAA, 0x0E]);
        let clock = link.clock();
        let mut session = SerialSession::new(link, clock, SessionOptions::default());

        let err = read_response_within(&mut session, Duration::from_millis(50)).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Transport(TransportError::Timeout {
                wanted: 6,
                available: 2,
                ..
            })
        ));
    }

    #[test]
    fn package_window_is_read_whole() {
        let mut link = MockLink::silent();
        link.push_inbound(&[1, 2, 3, 4]);
        link.schedule(Duration::from_millis(30), &[5, 6, 7, 8]);
        let clock = link.clock();
        let mut session = SerialSession::new(link, clock, SessionOptions::default());

        let mut buf = Vec::new();
        read_package(&mut session, &mut buf, 8).unwrap();
        assert_eq!(buf, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }
}

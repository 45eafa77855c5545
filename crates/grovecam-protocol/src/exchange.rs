use std::time::Duration;

use grovecam_frame::{
    command_name, read_response, read_response_within, send_frame, CommandFrame, FrameError,
    ResponseFrame,
};
use grovecam_transport::{SerialSession, SerialTransport, Timer};
use tracing::warn;

use crate::error::{CameraError, Result};

/// Read one reply frame. A bad sync byte is the camera saying something
/// unexpected, so it becomes a protocol mismatch for `phase`.
pub(crate) fn read_reply<T: SerialTransport, C: Timer>(
    session: &mut SerialSession<T, C>,
    phase: &'static str,
    timeout: Option<Duration>,
) -> Result<ResponseFrame> {
    let result = match timeout {
        Some(timeout) => read_response_within(session, timeout),
        None => read_response(session),
    };
    result.map_err(|err| match err {
        FrameError::InvalidSync(byte) => {
            warn!(phase, received = byte, "reply does not start with the sync byte");
            CameraError::mismatch(
                phase,
                format!("reply started with 0x{byte:02X} instead of 0xAA"),
            )
        }
        other => other.into(),
    })
}

/// Send `command` and require an ACK naming its command id.
pub(crate) fn expect_ack<T: SerialTransport, C: Timer>(
    session: &mut SerialSession<T, C>,
    command: &CommandFrame,
    phase: &'static str,
    timeout: Option<Duration>,
) -> Result<ResponseFrame> {
    send_frame(session, command)?;
    let reply = read_reply(session, phase, timeout)?;
    if !reply.is_ack_for(command.command_id()) {
        warn!(phase, received = %reply, "unexpected reply to command");
        return Err(CameraError::mismatch(
            phase,
            format!(
                "expected ACK for {}, received {reply}",
                command_name(command.command_id())
            ),
        ));
    }
    Ok(reply)
}

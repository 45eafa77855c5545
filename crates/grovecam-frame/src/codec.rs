use std::fmt;

use crate::command::{self, ACK, DATA, GET_PICTURE, INITIAL, SET_PACKAGE_SIZE, SNAPSHOT, SYNC};
use crate::error::{FrameError, Result};
use crate::package::PackageSize;

/// Every command and response frame is exactly 6 bytes.
pub const FRAME_LEN: usize = 6;

/// First byte of every frame.
pub const SYNC_BYTE: u8 = 0xAA;

/// Settings sent after synchronization: JPEG color type (0x07), preview
/// resolution 0x03, JPEG resolution 0x07 (640x480).
pub const JPEG_SETTINGS: [u8; 4] = [0x00, 0x07, 0x03, 0x07];

/// Fixed first parameter of SET-PACKAGE-SIZE.
const PACKAGE_SIZE_PARAM: u8 = 0x08;

/// Sequence-number slot value that tells the camera the transfer is over.
const PACKAGE_END: [u8; 2] = [0xF0, 0xF0];

/// An outbound 6-byte command.
///
/// ```text
/// ┌──────┬───────────┬────────┬────────┬────────┬────────┐
/// │ 0xAA │ commandId │ param1 │ param2 │ param3 │ param4 │
/// └──────┴───────────┴────────┴────────┴────────┴────────┘
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandFrame([u8; FRAME_LEN]);

/// Build a command frame from its id and four parameters.
pub fn build_frame(command_id: u8, p1: u8, p2: u8, p3: u8, p4: u8) -> CommandFrame {
    CommandFrame([SYNC_BYTE, command_id, p1, p2, p3, p4])
}

/// Camera checksum: wrapping 8-bit sum of every byte except the last two.
///
/// The last two bytes of a package are the checksum slot and the end byte,
/// so they never contribute. Buffers shorter than 3 bytes have nothing to
/// sum and are rejected.
pub fn checksum(bytes: &[u8]) -> Result<u8> {
    if bytes.len() < 3 {
        return Err(FrameError::InvalidFrameLength {
            len: bytes.len(),
            requirement: "checksum needs at least 3 bytes",
        });
    }
    Ok(bytes[..bytes.len() - 2]
        .iter()
        .fold(0u8, |acc, b| acc.wrapping_add(*b)))
}

impl CommandFrame {
    /// `AA 0D 00 00 00 00`
    pub fn sync() -> Self {
        build_frame(SYNC, 0x00, 0x00, 0x00, 0x00)
    }

    /// Acknowledge `command_id`: `AA 0E id 00 00 00`.
    pub fn ack(command_id: u8) -> Self {
        build_frame(ACK, command_id, 0x00, 0x00, 0x00)
    }

    /// `AA 01 00 07 03 07`
    pub fn settings() -> Self {
        let [p1, p2, p3, p4] = JPEG_SETTINGS;
        build_frame(INITIAL, p1, p2, p3, p4)
    }

    /// `AA 06 08 lo hi 00`
    pub fn set_package_size(size: PackageSize) -> Self {
        let [lo, hi] = size.get().to_le_bytes();
        build_frame(SET_PACKAGE_SIZE, PACKAGE_SIZE_PARAM, lo, hi, 0x00)
    }

    /// `AA 05 00 00 00 00`
    pub fn snapshot() -> Self {
        build_frame(SNAPSHOT, 0x00, 0x00, 0x00, 0x00)
    }

    /// `AA 04 01 00 00 00`
    pub fn get_picture() -> Self {
        build_frame(GET_PICTURE, 0x01, 0x00, 0x00, 0x00)
    }

    /// Request package `sequence`: `AA 0E 00 00 lo hi`.
    pub fn receive_package(sequence: u16) -> Self {
        let [lo, hi] = sequence.to_le_bytes();
        build_frame(ACK, 0x00, 0x00, lo, hi)
    }

    /// Tell the camera every package arrived: `AA 0E 00 00 F0 F0`.
    pub fn package_end_ack() -> Self {
        build_frame(ACK, 0x00, 0x00, PACKAGE_END[0], PACKAGE_END[1])
    }

    /// Command id (byte 1).
    pub fn command_id(&self) -> u8 {
        self.0[1]
    }

    /// The four parameter bytes (bytes 2..6).
    pub fn params(&self) -> [u8; 4] {
        [self.0[2], self.0[3], self.0[4], self.0[5]]
    }

    /// Wire bytes.
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Package sequence number if this is a RECEIVE-PACKAGE request.
    pub fn package_sequence(&self) -> Option<u16> {
        let [sub, _, lo, hi] = self.params();
        if self.command_id() == ACK && sub == 0x00 && [lo, hi] != PACKAGE_END {
            Some(u16::from_le_bytes([lo, hi]))
        } else {
            None
        }
    }
}

impl AsRef<[u8]> for CommandFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandFrame({} {})", command::command_name(self.0[1]), Hex(&self.0))
    }
}

/// A 6-byte frame received from the camera.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ResponseFrame([u8; FRAME_LEN]);

impl ResponseFrame {
    /// Parse exactly [`FRAME_LEN`] bytes starting with the sync byte.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; FRAME_LEN] =
            bytes
                .try_into()
                .map_err(|_| FrameError::InvalidFrameLength {
                    len: bytes.len(),
                    requirement: "frames are exactly 6 bytes",
                })?;
        if raw[0] != SYNC_BYTE {
            return Err(FrameError::InvalidSync(raw[0]));
        }
        Ok(Self(raw))
    }

    /// Command id (byte 1).
    pub fn command_id(&self) -> u8 {
        self.0[1]
    }

    /// Wire bytes.
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// ACK for `command_id`. Byte 3 is the camera's ACK counter and is
    /// ignored.
    pub fn is_ack_for(&self, command_id: u8) -> bool {
        self.0[0] == SYNC_BYTE
            && self.0[1] == ACK
            && self.0[2] == command_id
            && self.0[4] == 0x00
            && self.0[5] == 0x00
    }

    /// The camera's own SYNC frame, `AA 0D 00 00 00 00`.
    pub fn is_sync(&self) -> bool {
        self.0 == *CommandFrame::sync().as_bytes()
    }

    /// Picture length carried by a DATA frame `AA 0A 01 l m h`.
    pub fn picture_length(&self) -> Option<u32> {
        if self.0[0] != SYNC_BYTE || self.0[1] != DATA || self.0[2] != 0x01 {
            return None;
        }
        Some(u32::from_le_bytes([self.0[3], self.0[4], self.0[5], 0x00]))
    }
}

impl fmt::Debug for ResponseFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResponseFrame({})", Hex(&self.0))
    }
}

impl fmt::Display for ResponseFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Hex(&self.0))
    }
}

/// Space-separated uppercase hex.
pub struct Hex<'a>(pub &'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_commands_match_camera_table() {
        assert_eq!(CommandFrame::sync().as_bytes(), &[0xAA, 0x0D, 0, 0, 0, 0]);
        assert_eq!(CommandFrame::ack(SYNC).as_bytes(), &[0xAA, 0x0E, 0x0D, 0, 0, 0]);
        assert_eq!(
            CommandFrame::settings().as_bytes(),
            &[0xAA, 0x01, 0x00, 0x07, 0x03, 0x07]
        );
        assert_eq!(CommandFrame::snapshot().as_bytes(), &[0xAA, 0x05, 0, 0, 0, 0]);
        assert_eq!(
            CommandFrame::get_picture().as_bytes(),
            &[0xAA, 0x04, 0x01, 0, 0, 0]
        );
        assert_eq!(
            CommandFrame::package_end_ack().as_bytes(),
            &[0xAA, 0x0E, 0x00, 0x00, 0xF0, 0xF0]
        );
    }

    #[test]
    fn set_package_size_is_little_endian_for_every_valid_size() {
        for raw in PackageSize::MIN..=PackageSize::MAX {
            let size = PackageSize::new(raw).unwrap();
            let frame = CommandFrame::set_package_size(size);
            let bytes = frame.as_bytes();

            assert_eq!(&bytes[..3], &[0xAA, 0x06, 0x08]);
            assert_eq!(bytes[5], 0x00);
            assert_eq!(u16::from_le_bytes([bytes[3], bytes[4]]), raw);
        }
    }

    #[test]
    fn receive_package_embeds_sequence() {
        let frame = CommandFrame::receive_package(0x0102);
        assert_eq!(frame.as_bytes(), &[0xAA, 0x0E, 0x00, 0x00, 0x02, 0x01]);
        assert_eq!(frame.package_sequence(), Some(0x0102));
        assert_eq!(CommandFrame::package_end_ack().package_sequence(), None);
        assert_eq!(CommandFrame::ack(SYNC).package_sequence(), None);
    }

    #[test]
    fn checksum_wraps_and_skips_trailer() {
        assert_eq!(checksum(&[0x01, 0x02, 0xFF, 0xFF]).unwrap(), 0x03);
        assert_eq!(checksum(&[0xF0, 0x20, 0x00, 0x00]).unwrap(), 0x10);
        assert_eq!(checksum(&[0x05, 0x00, 0x00]).unwrap(), 0x05);
    }

    #[test]
    fn checksum_is_deterministic_and_sensitive_to_payload() {
        let frame = build_frame(0x0E, 0x00, 0x00, 0x12, 0x34);
        let first = checksum(frame.as_bytes()).unwrap();
        assert_eq!(first, checksum(frame.as_bytes()).unwrap());

        let changed = build_frame(0x0E, 0x01, 0x00, 0x12, 0x34);
        assert_ne!(first, checksum(changed.as_bytes()).unwrap());
    }

    #[test]
    fn checksum_rejects_short_buffers() {
        for len in 0..3 {
            let buf = vec![0u8; len];
            assert!(matches!(
                checksum(&buf),
                Err(FrameError::InvalidFrameLength { len: l, .. }) if l == len
            ));
        }
    }

    #[test]
    fn response_parse_requires_six_bytes() {
        assert!(ResponseFrame::parse(&[0xAA, 0x0E, 0x0D]).is_err());
        assert!(ResponseFrame::parse(&[0u8; 7]).is_err());
        assert!(ResponseFrame::parse(&[0xAA, 0x0E, 0x0D, 0x00, 0x00, 0x00]).is_ok());
        assert!(matches!(
            ResponseFrame::parse(&[0x00, 0x0E, 0x0D, 0x00, 0x00, 0x00]),
            Err(FrameError::InvalidSync(0x00))
        ));
    }

    #[test]
    fn ack_match_ignores_counter_byte() {
        let ack = ResponseFrame::parse(&[0xAA, 0x0E, 0x0D, 0x2C, 0x00, 0x00]).unwrap();
        assert!(ack.is_ack_for(SYNC));
        assert!(!ack.is_ack_for(INITIAL));

        let bad_tail = ResponseFrame::parse(&[0xAA, 0x0E, 0x0D, 0x00, 0x01, 0x00]).unwrap();
        assert!(!bad_tail.is_ack_for(SYNC));
    }

    #[test]
    fn picture_length_is_24_bit_little_endian() {
        let data = ResponseFrame::parse(&[0xAA, 0x0A, 0x01, 0x34, 0x12, 0x01]).unwrap();
        assert_eq!(data.picture_length(), Some(0x01_1234));

        let high_bytes = ResponseFrame::parse(&[0xAA, 0x0A, 0x01, 0xFF, 0xFF, 0xFF]).unwrap();
        assert_eq!(high_bytes.picture_length(), Some(0xFF_FFFF));

        let not_data = ResponseFrame::parse(&[0xAA, 0x0E, 0x04, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(not_data.picture_length(), None);
    }

    #[test]
    fn debug_output_names_command() {
        let dbg = format!("{:?}", CommandFrame::snapshot());
        assert_eq!(dbg, "CommandFrame(SNAPSHOT AA 05 00 00 00 00)");
    }
}

//! Scripted OV528 camera for driving the protocol without hardware.
//!
//! [`MockCamera`] plugs into a [`MockLink`] as its responder. It answers the
//! handshake, settings, package size, snapshot and picture requests, and
//! serves `picture` in packages of the negotiated size.

use std::collections::HashMap;
use std::time::Duration;

use grovecam_frame::{
    build_frame, encode_package, ResponseFrame, ACK, DATA, GET_PICTURE, INITIAL,
    PACKAGE_HEADER_LEN, PACKAGE_OVERHEAD, SET_PACKAGE_SIZE, SNAPSHOT, SYNC, SYNC_BYTE,
};
use grovecam_transport::mock::{ManualTimer, MockLink, Reply, Responder};
use grovecam_transport::{SerialSession, SessionOptions};

use crate::config::DEFAULT_SYNC_INTERVAL;

/// Simulated camera state.
#[derive(Debug, Clone)]
pub struct MockCamera {
    /// Answer the n-th SYNC (1-based). `None` keeps the camera silent.
    pub answer_sync: Option<u32>,
    /// Delay between the SYNC ACK and the camera's own SYNC. Must exceed the
    /// host's sync interval so the post-ACK drain does not swallow it.
    pub camera_sync_delay: Duration,
    /// Commands acknowledged under a different command id.
    pub ack_as: HashMap<u8, u8>,
    /// Frame the camera sends as its own SYNC after acknowledging the host.
    pub camera_sync: [u8; 6],
    /// Acknowledge the settings frame.
    pub ack_settings: bool,
    /// JPEG bytes served in packages.
    pub picture: Vec<u8>,
    /// Length announced in the DATA frame. Defaults to `picture.len()`.
    pub reported_length: Option<u32>,
    /// Number of times each sequence number gets a corrupted checksum.
    pub corrupt: HashMap<u16, u32>,
    /// Number of times each sequence number has its last payload byte
    /// flipped. The checksum is left as computed over the original bytes.
    pub garble: HashMap<u16, u32>,
    package_size: usize,
    syncs_seen: u32,
    ack_counter: u8,
}

impl MockCamera {
    pub fn new(picture: impl Into<Vec<u8>>) -> Self {
        Self {
            answer_sync: Some(1),
            camera_sync_delay: DEFAULT_SYNC_INTERVAL + Duration::from_millis(50),
            ack_as: HashMap::new(),
            camera_sync: [SYNC_BYTE, SYNC, 0x00, 0x00, 0x00, 0x00],
            ack_settings: true,
            picture: picture.into(),
            reported_length: None,
            corrupt: HashMap::new(),
            garble: HashMap::new(),
            package_size: 512,
            syncs_seen: 0,
            ack_counter: 0,
        }
    }

    /// A camera that never answers.
    pub fn silent() -> Self {
        Self {
            answer_sync: None,
            ..Self::new(Vec::new())
        }
    }

    pub fn answering_sync(mut self, attempt: u32) -> Self {
        self.answer_sync = Some(attempt);
        self
    }

    pub fn reporting_length(mut self, length: u32) -> Self {
        self.reported_length = Some(length);
        self
    }

    /// Corrupt the checksum of `sequence` the next `times` it is served.
    pub fn corrupting(mut self, sequence: u16, times: u32) -> Self {
        self.corrupt.insert(sequence, times);
        self
    }

    /// Flip the last payload byte of `sequence` the next `times` it is
    /// served.
    pub fn garbling(mut self, sequence: u16, times: u32) -> Self {
        self.garble.insert(sequence, times);
        self
    }

    /// Acknowledge `command` with `reply_id` instead of its own id.
    pub fn acking_as(mut self, command: u8, reply_id: u8) -> Self {
        self.ack_as.insert(command, reply_id);
        self
    }

    /// Attach to a fresh link and wrap it in a session with default timing.
    pub fn into_session(self) -> SerialSession<MockLink, ManualTimer> {
        let link = MockLink::new(self);
        let clock = link.clock();
        SerialSession::new(link, clock, SessionOptions::default())
    }

    fn ack(&mut self, command_id: u8) -> Vec<u8> {
        self.ack_counter = self.ack_counter.wrapping_add(1);
        let command_id = self.ack_as.get(&command_id).copied().unwrap_or(command_id);
        vec![SYNC_BYTE, ACK, command_id, self.ack_counter, 0x00, 0x00]
    }

    fn package(&mut self, sequence: u16) -> Option<Vec<u8>> {
        let capacity = self.package_size - PACKAGE_OVERHEAD;
        let start = usize::from(sequence) * capacity;
        if start >= self.picture.len() {
            return None;
        }
        let end = (start + capacity).min(self.picture.len());
        let chunk = &self.picture[start..end];
        let window = if chunk.len() == capacity {
            self.package_size
        } else {
            chunk.len() + PACKAGE_OVERHEAD
        };
        let mut bytes = encode_package(sequence, chunk, window).ok()?;

        if let Some(left) = self.corrupt.get_mut(&sequence) {
            if *left > 0 {
                *left -= 1;
                bytes[window - 2] = bytes[window - 2].wrapping_add(1);
            }
        }
        if let Some(left) = self.garble.get_mut(&sequence) {
            if *left > 0 && !chunk.is_empty() {
                *left -= 1;
                bytes[PACKAGE_HEADER_LEN + chunk.len() - 1] ^= 0xFF;
            }
        }
        Some(bytes)
    }
}

impl Responder for MockCamera {
    fn on_write(&mut self, written: &[u8]) -> Vec<Reply> {
        let Ok(frame) = ResponseFrame::parse(written) else {
            return Vec::new();
        };
        let params = &frame.as_bytes()[2..];

        match frame.command_id() {
            SYNC => {
                self.syncs_seen += 1;
                match self.answer_sync {
                    Some(n) if self.syncs_seen == n => {
                        let ack = self.ack(SYNC);
                        vec![
                            Reply::now(ack),
                            Reply::after(self.camera_sync_delay, self.camera_sync.to_vec()),
                        ]
                    }
                    _ => Vec::new(),
                }
            }
            INITIAL if self.ack_settings => vec![Reply::now(self.ack(INITIAL))],
            SET_PACKAGE_SIZE => {
                self.package_size = usize::from(u16::from_le_bytes([params[1], params[2]]));
                vec![Reply::now(self.ack(SET_PACKAGE_SIZE))]
            }
            SNAPSHOT => vec![Reply::now(self.ack(SNAPSHOT))],
            GET_PICTURE => {
                let length = self.reported_length.unwrap_or(self.picture.len() as u32);
                let [l, m, h, _] = length.to_le_bytes();
                vec![
                    Reply::now(self.ack(GET_PICTURE)),
                    Reply::now(vec![SYNC_BYTE, DATA, 0x01, l, m, h]),
                ]
            }
            ACK => {
                let request = build_frame(ACK, params[0], params[1], params[2], params[3]);
                match request.package_sequence() {
                    Some(sequence) => self.package(sequence).map(Reply::now).into_iter().collect(),
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }
}

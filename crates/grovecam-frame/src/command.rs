//! OV528 command identifiers (byte 1 of every frame).

/// Host → camera: select image format and resolution.
pub const INITIAL: u8 = 0x01;

/// Host → camera: request the current snapshot.
pub const GET_PICTURE: u8 = 0x04;

/// Host → camera: freeze a frame into the camera's buffer.
pub const SNAPSHOT: u8 = 0x05;

/// Host → camera: set the image package size.
pub const SET_PACKAGE_SIZE: u8 = 0x06;

/// Camera → host: picture length announcement.
pub const DATA: u8 = 0x0A;

/// Both directions: synchronization request.
pub const SYNC: u8 = 0x0D;

/// Both directions: acknowledgement. Also used to request image packages.
pub const ACK: u8 = 0x0E;

/// Returns a human-readable name for a command ID.
pub fn command_name(id: u8) -> &'static str {
    match id {
        INITIAL => "INITIAL",
        GET_PICTURE => "GET_PICTURE",
        SNAPSHOT => "SNAPSHOT",
        SET_PACKAGE_SIZE => "SET_PACKAGE_SIZE",
        DATA => "DATA",
        SYNC => "SYNC",
        ACK => "ACK",
        _ => "UNKNOWN",
    }
}

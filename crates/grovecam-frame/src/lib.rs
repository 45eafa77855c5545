//! OV528 wire format for the Grove serial camera.
//!
//! Two shapes cross the link:
//! - 6-byte command/response frames, always starting with `0xAA`
//! - image packages: a 4-byte header, payload, checksum byte and `0x00`
//!
//! [`io`] moves both over a [`grovecam_transport::SerialSession`].

pub mod codec;
pub mod command;
pub mod error;
pub mod io;
pub mod package;

pub use codec::{build_frame, checksum, CommandFrame, Hex, ResponseFrame, FRAME_LEN, SYNC_BYTE};
pub use command::{command_name, ACK, DATA, GET_PICTURE, INITIAL, SET_PACKAGE_SIZE, SNAPSHOT, SYNC};
pub use error::{FrameError, Result};
pub use io::{read_package, read_response, read_response_within, send_frame};
pub use package::{
    encode_package, Package, PackageSize, END_OF_IMAGE, PACKAGE_HEADER_LEN, PACKAGE_OVERHEAD,
};

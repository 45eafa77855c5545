use bytes::{Bytes, BytesMut};
use grovecam_frame::{
    read_package, send_frame, CommandFrame, FrameError, Package, PackageSize, PACKAGE_HEADER_LEN,
    PACKAGE_OVERHEAD,
};
use grovecam_transport::{SerialSession, SerialTransport, Timer};
use tracing::{debug, info, warn};

use crate::cancel::CancelFlag;
use crate::config::{RetrievalConfig, Termination};
use crate::error::{CameraError, Result};

/// Sequence numbers are 16 bits on the wire.
const MAX_PACKAGES: u32 = u16::MAX as u32 + 1;

/// Upper bound on the buffer reserved up front in marker mode, where the
/// announced length is not trusted.
const MARKER_RESERVE: usize = 64 * 1024;

/// A fully reassembled picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedImage {
    /// JPEG bytes, headers and trailers stripped.
    pub data: Bytes,
    /// Packages accepted.
    pub packages: u32,
    /// Re-requests caused by checksum failures.
    pub checksum_retries: u32,
}

/// Packages needed to carry `picture_length` bytes.
pub fn package_count(picture_length: u32, package_size: PackageSize) -> u32 {
    let capacity = package_size.payload_capacity() as u32;
    picture_length.div_ceil(capacity)
}

/// Fetch every package of the current snapshot and acknowledge the end of
/// the transfer.
///
/// `cancel` is checked before each package request. On any error the
/// partial buffer is dropped and no ACK-END is sent.
pub fn retrieve_image<T: SerialTransport, C: Timer>(
    session: &mut SerialSession<T, C>,
    picture_length: u32,
    config: &RetrievalConfig,
    cancel: &CancelFlag,
) -> Result<RetrievedImage> {
    let mut retriever = Retriever {
        config,
        cancel,
        window: Vec::with_capacity(config.package_size.window()),
        checksum_retries: 0,
    };

    let (data, packages) = match config.termination {
        Termination::Counted => retriever.counted(session, picture_length)?,
        Termination::Marker => retriever.until_marker(session, picture_length)?,
    };

    send_frame(session, &CommandFrame::package_end_ack())?;
    info!(
        bytes = data.len(),
        packages,
        checksum_retries = retriever.checksum_retries,
        "picture retrieved"
    );

    Ok(RetrievedImage {
        data: data.freeze(),
        packages,
        checksum_retries: retriever.checksum_retries,
    })
}

struct Retriever<'a> {
    config: &'a RetrievalConfig,
    cancel: &'a CancelFlag,
    window: Vec<u8>,
    checksum_retries: u32,
}

impl Retriever<'_> {
    fn counted<T: SerialTransport, C: Timer>(
        &mut self,
        session: &mut SerialSession<T, C>,
        picture_length: u32,
    ) -> Result<(BytesMut, u32)> {
        let package_size = self.config.package_size;
        let count = package_count(picture_length, package_size);
        if count > MAX_PACKAGES {
            return Err(CameraError::PictureTooLarge {
                length: picture_length,
                package_size: package_size.get(),
            });
        }
        debug!(count, "retrieving counted packages");

        let capacity = package_size.payload_capacity();
        let total = picture_length as usize;
        let mut data = BytesMut::with_capacity(total);

        for index in 0..count {
            // count <= MAX_PACKAGES, so every index fits in a u16
            let sequence = index as u16;
            let remaining = total - index as usize * capacity;
            let window = remaining.min(capacity) + PACKAGE_OVERHEAD;

            self.fetch(session, sequence, |session, buf| {
                read_package(session, buf, window)?;
                Ok(false)
            })?;
            Package::parse(&self.window)?.copy_payload_into(&mut data)?;
        }

        Ok((data, count))
    }

    fn until_marker<T: SerialTransport, C: Timer>(
        &mut self,
        session: &mut SerialSession<T, C>,
        picture_length: u32,
    ) -> Result<(BytesMut, u32)> {
        let package_size = self.config.package_size;
        let window = package_size.window();
        let mut data = BytesMut::with_capacity(marker_reserve(picture_length));
        let mut previous: Option<u8> = None;
        let mut packages = 0u32;

        loop {
            let sequence =
                u16::try_from(packages).map_err(|_| CameraError::PictureTooLarge {
                    length: picture_length,
                    package_size: package_size.get(),
                })?;

            let terminal = self.fetch(session, sequence, |session, buf| {
                read_until_marker(session, buf, window, previous)
            })?;

            let package = Package::parse(&self.window)?;
            package.copy_payload_into(&mut data)?;
            previous = package.payload()?.last().copied().or(previous);
            packages += 1;

            if terminal {
                return Ok((data, packages));
            }
        }
    }

    /// Request `sequence` until it arrives intact. `read` fills the window
    /// and reports whether it holds the final package.
    fn fetch<T, C, F>(
        &mut self,
        session: &mut SerialSession<T, C>,
        sequence: u16,
        mut read: F,
    ) -> Result<bool>
    where
        T: SerialTransport,
        C: Timer,
        F: FnMut(&mut SerialSession<T, C>, &mut Vec<u8>) -> Result<bool>,
    {
        let mut failures = 0u32;
        loop {
            self.cancel.check()?;
            debug!(sequence, attempt = failures + 1, "requesting package");
            send_frame(session, &CommandFrame::receive_package(sequence))?;

            let terminal = read(session, &mut self.window)?;
            let package = Package::parse(&self.window)?;

            if terminal {
                if !package.verify_checksum() {
                    warn!(sequence, "accepting final package despite checksum mismatch");
                }
                return Ok(true);
            }

            match check_package(sequence, &package) {
                Ok(()) => return Ok(false),
                Err(err) if is_retryable(&err) => {
                    failures += 1;
                    self.checksum_retries += 1;
                    if failures > self.config.max_package_retries {
                        return Err(CameraError::ChecksumExhausted {
                            sequence,
                            attempts: failures,
                        });
                    }
                    warn!(sequence, attempt = failures, error = %err, "re-requesting package");
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn check_package(sequence: u16, package: &Package<'_>) -> Result<()> {
    if !package.verify_checksum() {
        return Err(CameraError::ChecksumMismatch {
            sequence,
            computed: package.computed_checksum(),
            received: package.received_checksum(),
        });
    }
    package.payload()?;
    Ok(())
}

fn is_retryable(err: &CameraError) -> bool {
    matches!(
        err,
        CameraError::ChecksumMismatch { .. }
            | CameraError::Frame(FrameError::PayloadOverflow { .. })
    )
}

fn marker_reserve(picture_length: u32) -> usize {
    (picture_length as usize).min(MARKER_RESERVE)
}

/// Read a package byte by byte, stopping as soon as the bytes so far hold
/// the declared payload. The package is final when that payload ends with
/// `FF D9`; anything else goes back to the caller for checksum verification.
fn read_until_marker<T: SerialTransport, C: Timer>(
    session: &mut SerialSession<T, C>,
    buf: &mut Vec<u8>,
    window: usize,
    previous: Option<u8>,
) -> Result<bool> {
    buf.clear();
    buf.resize(PACKAGE_HEADER_LEN, 0);
    session.read_exact_into(buf)?;

    let mut byte = [0u8; 1];
    while buf.len() < window {
        session.read_exact_into(&mut byte)?;
        buf.push(byte[0]);

        if buf.len() >= PACKAGE_OVERHEAD {
            let package = Package::parse(buf)?;
            if package.is_full() {
                return Ok(package.ends_image(previous));
            }
        }
    }
    Ok(false)
}

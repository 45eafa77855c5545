use bytes::BytesMut;

use crate::codec::checksum;
use crate::error::{FrameError, Result};

/// Header bytes preceding the payload: package id (LE u16) and payload
/// size (LE u16).
pub const PACKAGE_HEADER_LEN: usize = 4;

/// Header plus the trailing checksum and end bytes.
pub const PACKAGE_OVERHEAD: usize = PACKAGE_HEADER_LEN + 2;

/// JPEG end-of-image marker.
pub const END_OF_IMAGE: [u8; 2] = [0xFF, 0xD9];

/// Number of bytes the camera sends per package, header and trailer
/// included. Always within `16..=2048`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageSize(u16);

impl PackageSize {
    pub const MIN: u16 = 16;
    pub const MAX: u16 = 2048;
    pub const DEFAULT: PackageSize = PackageSize(512);

    /// Validate a raw size.
    pub fn new(size: u16) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&size) {
            Ok(Self(size))
        } else {
            Err(FrameError::InvalidPackageSize(size))
        }
    }

    pub fn get(self) -> u16 {
        self.0
    }

    /// Total package window in bytes.
    pub fn window(self) -> usize {
        usize::from(self.0)
    }

    /// Image bytes a full package carries.
    pub fn payload_capacity(self) -> usize {
        self.window() - PACKAGE_OVERHEAD
    }
}

impl Default for PackageSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u16> for PackageSize {
    type Error = FrameError;

    fn try_from(value: u16) -> Result<Self> {
        Self::new(value)
    }
}

impl std::fmt::Display for PackageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A borrowed view over one received package.
///
/// ```text
/// ┌────────┬────────┬──────────┬──────────┬─────────────┬──────────┬──────┐
/// │ id lo  │ id hi  │ size lo  │ size hi  │ payload ... │ checksum │ 0x00 │
/// └────────┴────────┴──────────┴──────────┴─────────────┴──────────┴──────┘
/// ```
///
/// The checksum covers every byte of the window except the final two.
#[derive(Debug, Clone, Copy)]
pub struct Package<'a> {
    bytes: &'a [u8],
}

impl<'a> Package<'a> {
    /// Wrap a received window. Needs at least header and trailer.
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < PACKAGE_OVERHEAD {
            return Err(FrameError::InvalidFrameLength {
                len: bytes.len(),
                requirement: "packages are at least 6 bytes",
            });
        }
        Ok(Self { bytes })
    }

    /// Package sequence number reported by the camera.
    pub fn id(&self) -> u16 {
        u16::from_le_bytes([self.bytes[0], self.bytes[1]])
    }

    /// Payload length from the header.
    pub fn declared_size(&self) -> usize {
        usize::from(u16::from_le_bytes([self.bytes[2], self.bytes[3]]))
    }

    /// Payload bytes the window can hold.
    pub fn capacity(&self) -> usize {
        self.bytes.len() - PACKAGE_OVERHEAD
    }

    /// Whether the declared payload exactly fills the window.
    pub fn is_full(&self) -> bool {
        self.declared_size() == self.capacity()
    }

    /// Declared payload. Fails when the header claims more than the window
    /// holds.
    pub fn payload(&self) -> Result<&'a [u8]> {
        let declared = self.declared_size();
        let capacity = self.capacity();
        if declared > capacity {
            return Err(FrameError::PayloadOverflow { declared, capacity });
        }
        Ok(&self.bytes[PACKAGE_HEADER_LEN..PACKAGE_HEADER_LEN + declared])
    }

    /// Checksum byte as sent by the camera.
    pub fn received_checksum(&self) -> u8 {
        self.bytes[self.bytes.len() - 2]
    }

    /// Checksum computed over the window.
    pub fn computed_checksum(&self) -> u8 {
        // parse() guarantees len >= 6
        checksum(self.bytes).unwrap_or_default()
    }

    pub fn verify_checksum(&self) -> bool {
        self.received_checksum() == self.computed_checksum()
    }

    /// Whether the declared payload ends with the JPEG end-of-image marker.
    /// `previous` is the last payload byte of the prior package, used when
    /// the marker straddles two packages.
    pub fn ends_image(&self, previous: Option<u8>) -> bool {
        let Ok(payload) = self.payload() else {
            return false;
        };
        match payload {
            [.., a, b] => [*a, *b] == END_OF_IMAGE,
            [b] => previous.map(|a| [a, *b] == END_OF_IMAGE).unwrap_or(false),
            [] => false,
        }
    }

    /// Append the declared payload to `out`.
    pub fn copy_payload_into(&self, out: &mut BytesMut) -> Result<usize> {
        let payload = self.payload()?;
        out.extend_from_slice(payload);
        Ok(payload.len())
    }

    /// The raw window.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

/// Build a well-formed package window. Used by simulated cameras and tests.
pub fn encode_package(id: u16, payload: &[u8], window: usize) -> Result<Vec<u8>> {
    if window < PACKAGE_OVERHEAD {
        return Err(FrameError::InvalidFrameLength {
            len: window,
            requirement: "packages are at least 6 bytes",
        });
    }
    let capacity = window - PACKAGE_OVERHEAD;
    if payload.len() > capacity || payload.len() > usize::from(u16::MAX) {
        return Err(FrameError::PayloadOverflow {
            declared: payload.len(),
            capacity,
        });
    }

    let mut out = vec![0u8; window];
    out[..2].copy_from_slice(&id.to_le_bytes());
    out[2..4].copy_from_slice(&(payload.len() as u16).to_le_bytes());
    out[PACKAGE_HEADER_LEN..PACKAGE_HEADER_LEN + payload.len()].copy_from_slice(payload);
    out[window - 2] = checksum(&out)?;
    out[window - 1] = 0x00;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_size_bounds() {
        assert!(matches!(
            PackageSize::new(15),
            Err(FrameError::InvalidPackageSize(15))
        ));
        assert!(PackageSize::new(16).is_ok());
        assert!(PackageSize::new(2048).is_ok());
        assert!(matches!(
            PackageSize::try_from(2049),
            Err(FrameError::InvalidPackageSize(2049))
        ));
        assert_eq!(PackageSize::default().get(), 512);
        assert_eq!(PackageSize::default().payload_capacity(), 506);
    }

    #[test]
    fn parses_header_and_payload() {
        let raw = [0x02, 0x00, 0x03, 0x00, 0xAB, 0xCD, 0xEF, 0x00, 0x00, 0x00];
        let pkg = Package::parse(&raw).unwrap();
        assert_eq!(pkg.id(), 2);
        assert_eq!(pkg.declared_size(), 3);
        assert_eq!(pkg.capacity(), 4);
        assert!(!pkg.is_full());
        assert_eq!(pkg.payload().unwrap(), &[0xAB, 0xCD, 0xEF]);
    }

    #[test]
    fn rejects_short_window() {
        assert!(matches!(
            Package::parse(&[0u8; 5]),
            Err(FrameError::InvalidFrameLength { len: 5, .. })
        ));
    }

    #[test]
    fn declared_size_beyond_window_is_overflow() {
        let raw = [0x00, 0x00, 0x10, 0x00, 1, 2, 0x00, 0x00];
        let pkg = Package::parse(&raw).unwrap();
        assert!(matches!(
            pkg.payload(),
            Err(FrameError::PayloadOverflow {
                declared: 16,
                capacity: 2
            })
        ));
    }

    #[test]
    fn encoded_package_verifies() {
        let raw = encode_package(7, &[1, 2, 3, 4, 5, 6], 12).unwrap();
        assert_eq!(raw.len(), 12);
        let pkg = Package::parse(&raw).unwrap();
        assert!(pkg.verify_checksum());
        assert_eq!(pkg.id(), 7);
        assert!(pkg.is_full());

        let mut corrupted = raw.clone();
        corrupted[5] ^= 0x01;
        assert!(!Package::parse(&corrupted).unwrap().verify_checksum());
    }

    #[test]
    fn copies_only_declared_payload() {
        let raw = encode_package(0, &[9, 8], 16).unwrap();
        let mut out = BytesMut::new();
        let n = Package::parse(&raw).unwrap().copy_payload_into(&mut out).unwrap();
        assert_eq!(n, 2);
        assert_eq!(&out[..], &[9, 8]);
    }

    #[test]
    fn end_of_image_detection() {
        let whole = encode_package(3, &[0x10, 0xFF, 0xD9], 16).unwrap();
        assert!(Package::parse(&whole).unwrap().ends_image(None));

        let split = encode_package(4, &[0xD9], 16).unwrap();
        let pkg = Package::parse(&split).unwrap();
        assert!(pkg.ends_image(Some(0xFF)));
        assert!(!pkg.ends_image(Some(0x00)));
        assert!(!pkg.ends_image(None));

        let plain = encode_package(5, &[0xFF, 0xD8], 16).unwrap();
        assert!(!Package::parse(&plain).unwrap().ends_image(None));
    }
}

//! CRC-16 checksum for GBSP frames.
//!
//! The firmware uses the AVR `_crc_ccitt_update` routine: the reflected form
//! of the CCITT polynomial 0x1021 with no final xor, which is CRC-16/KERMIT.
//! A frame checksum starts from the CRC of the prefix and then covers the
//! type, the payload length and the payload.

use crc::{Crc, CRC_16_KERMIT};

#[cfg(not(feature = "legacy-seed"))]
use crate::frame::GBSP_PREFIX;

/// CRC-16/KERMIT calculator with 256-entry lookup table.
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_KERMIT);

/// Bytes folded into the register before any header byte.
#[cfg(not(feature = "legacy-seed"))]
const SEED_PREFIX: &[u8] = GBSP_PREFIX;

/// Boards built from the kegboard sources ship the CRC of their old prefix.
#[cfg(feature = "legacy-seed")]
const SEED_PREFIX: &[u8] = b"KBSP v1:";

/// Register value every frame checksum starts from.
#[cfg(not(feature = "legacy-seed"))]
pub const PREFIX_CRC: u16 = 0xD8CD;

/// Register value every frame checksum starts from.
#[cfg(feature = "legacy-seed")]
pub const PREFIX_CRC: u16 = 0xE3AF;

/// Calculate the plain CRC-16/KERMIT of a byte slice (zero seed).
///
/// With the default seed, over a serialized frame of `len` bytes,
/// `calculate_crc16(&frame[..len - 4])` equals the frame checksum and
/// `calculate_crc16(&frame[..len - 2])` is zero.
#[inline]
#[must_use]
pub fn calculate_crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// Incremental frame checksum, pre-seeded with [`PREFIX_CRC`].
pub struct GbspDigest {
    digest: crc::Digest<'static, u16>,
}

impl GbspDigest {
    /// Create a digest that already covers the frame prefix.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        let mut digest = CRC16.digest();
        digest.update(SEED_PREFIX);
        Self { digest }
    }

    /// Update the digest with a single byte.
    #[inline]
    pub fn update(&mut self, byte: u8) {
        self.digest.update(&[byte]);
    }

    /// Update the digest with a byte slice.
    #[inline]
    pub fn update_slice(&mut self, data: &[u8]) {
        self.digest.update(data);
    }

    /// Update the digest with a 16-bit header field, low byte first.
    #[inline]
    pub fn update_u16(&mut self, value: u16) {
        self.digest.update(&value.to_le_bytes());
    }

    /// Finalize and return the checksum value.
    #[inline]
    #[must_use]
    pub fn finalize(self) -> u16 {
        self.digest.finalize()
    }
}

impl Default for GbspDigest {
    fn default() -> Self {
        Self::new()
    }
}

//! Frame serialization.
//!
//! This module provides the [`Serialize`] trait, which writes a [`Packet`]
//! as a complete GBSP frame:
//!
//! ```text
//! "GBSP v1:" | type(2, LE) | len(2, LE) | payload(len) | crc(2, LE) | "\r\n"
//! ```
//!
//! # Example
//!
//! ```
//! use gbsp_proto::{MessageType, Packet, Serialize};
//!
//! let ping = Packet::from(MessageType::Ping);
//! let mut buf = [0u8; 16];
//! let len = ping.serialize(&mut buf).unwrap();
//!
//! assert_eq!(len, 16);
//! assert!(buf.starts_with(b"GBSP v1:\x81\x00\x00\x00"));
//! assert!(buf.ends_with(b"\r\n"));
//! ```

use crate::crc::GbspDigest;
use crate::frame::{frame_len, GBSP_PREFIX, GBSP_TRAILER};
use crate::packet::{AppendError, Packet};

/// Helper for buffer management with incremental checksum calculation.
///
/// Writes directly to the output buffer while accumulating the checksum, so
/// the header and payload are only walked once.
struct SerializeBuf<'a> {
    buf: &'a mut [u8],
    pos: usize,
    crc: GbspDigest,
}

impl<'a> SerializeBuf<'a> {
    #[inline]
    fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            crc: GbspDigest::new(),
        }
    }

    /// Write bytes without checksumming (prefix; the seed already covers it).
    #[inline]
    fn write_raw(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    /// Write bytes and accumulate them into the checksum.
    #[inline]
    fn write_slice(&mut self, bytes: &[u8]) {
        self.write_raw(bytes);
        self.crc.update_slice(bytes);
    }

    /// Write a 16-bit header field, low byte first, with checksum.
    #[inline]
    fn write_u16(&mut self, value: u16) {
        self.write_slice(&value.to_le_bytes());
    }

    /// Finalize by writing the checksum and trailer.
    #[inline]
    fn finalize(mut self) -> usize {
        let checksum = self.crc.finalize();
        let crc_at = self.pos;
        self.buf[crc_at..crc_at + 2].copy_from_slice(&checksum.to_le_bytes());
        self.pos += 2;

        // Checksum digest is consumed; trailer is never checksummed
        let trailer_at = self.pos;
        self.buf[trailer_at..trailer_at + 2].copy_from_slice(GBSP_TRAILER);
        trailer_at + 2
    }
}

/// Error type for serialization operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerializeError {
    /// The output buffer is too small to hold the frame.
    BufferTooSmall,
    /// The message did not fit in a packet payload.
    PayloadOverflow,
    /// A write operation failed (for I/O adapters).
    WriteError,
}

impl core::fmt::Display for SerializeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::PayloadOverflow => write!(f, "payload overflow"),
            Self::WriteError => write!(f, "write error"),
        }
    }
}

impl From<AppendError> for SerializeError {
    fn from(_: AppendError) -> Self {
        SerializeError::PayloadOverflow
    }
}

/// Extension trait for writing GBSP frames.
///
/// Implemented for [`Packet`]; higher layers implement it for their typed
/// messages.
pub trait Serialize {
    /// Serialize to the provided buffer.
    ///
    /// Returns the number of bytes written on success.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError::BufferTooSmall`] if the buffer cannot hold
    /// the frame.
    fn serialize(&self, buf: &mut [u8]) -> Result<usize, SerializeError>;

    /// Serialize to a `heapless::Vec`.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError::BufferTooSmall`] if `N` is not large enough.
    fn serialize_to_vec<const N: usize>(&self) -> Result<heapless::Vec<u8, N>, SerializeError> {
        let mut vec = heapless::Vec::new();
        // Resize to full capacity to allow serialize() to write
        vec.resize(N, 0)
            .map_err(|_| SerializeError::BufferTooSmall)?;
        let len = self.serialize(&mut vec)?;
        vec.truncate(len);
        Ok(vec)
    }

    /// Serialize to an `embedded_io::Write` implementation.
    ///
    /// This can be used with UART or other I/O peripherals.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError::WriteError`] if the write fails.
    #[cfg(feature = "embedded-io")]
    fn serialize_io<W: embedded_io::Write>(&self, writer: &mut W) -> Result<(), SerializeError> {
        let mut buf = [0u8; crate::frame::MAX_FRAME_SIZE];
        let len = self.serialize(&mut buf)?;
        writer
            .write_all(&buf[..len])
            .map_err(|_| SerializeError::WriteError)
    }
}

impl Packet {
    /// Size of this packet's frame on the wire.
    #[inline]
    #[must_use]
    pub fn frame_len(&self) -> usize {
        frame_len(self.len())
    }
}

impl Serialize for Packet {
    fn serialize(&self, buf: &mut [u8]) -> Result<usize, SerializeError> {
        if buf.len() < self.frame_len() {
            return Err(SerializeError::BufferTooSmall);
        }

        let mut sb = SerializeBuf::new(buf);

        // Prefix (covered by the checksum seed)
        sb.write_raw(GBSP_PREFIX);

        // Header and payload (checksummed)
        sb.write_u16(u16::from(self.msg_type()));
        sb.write_u16(self.len() as u16);
        sb.write_slice(self.payload());

        Ok(sb.finalize())
    }
}

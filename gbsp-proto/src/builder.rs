//! Builder pattern API for constructing packets.
//!
//! # Example
//!
//! ```
//! use gbsp_proto::{catalog::set_output, MessageType, PacketBuilder};
//!
//! let mut buf = [0u8; 64];
//! let len = PacketBuilder::new(MessageType::SetOutput)
//!     .tag_u8(set_output::OUTPUT_ID, 2)
//!     .tag_u8(set_output::OUTPUT_MODE, set_output::OUTPUT_ENABLED)
//!     .serialize(&mut buf)
//!     .unwrap();
//!
//! assert_eq!(len, 22);
//! ```

use crate::catalog::MessageType;
use crate::packet::{AppendError, Packet};
use crate::serialize::{Serialize, SerializeError};

/// Fluent builder for a [`Packet`].
///
/// The first append that does not fit is remembered; later appends are
/// ignored and the error is reported by [`build`](Self::build) or
/// [`serialize`](Self::serialize).
#[derive(Debug, Clone)]
pub struct PacketBuilder {
    packet: Packet,
    error: Option<AppendError>,
}

impl PacketBuilder {
    /// Start building a packet of a known type.
    #[must_use]
    pub fn new(msg_type: MessageType) -> Self {
        Self::with_type_id(msg_type.id())
    }

    /// Start building a packet of a raw type.
    #[must_use]
    pub fn with_type_id(msg_type: u8) -> Self {
        Self {
            packet: Packet::with_type(msg_type),
            error: None,
        }
    }

    /// Append a record with a raw value.
    #[must_use]
    pub fn tag(mut self, tag: u8, value: &[u8]) -> Self {
        if self.error.is_none() {
            self.error = self.packet.append_tag(tag, value).err();
        }
        self
    }

    /// Append a single-byte record.
    #[must_use]
    pub fn tag_u8(self, tag: u8, value: u8) -> Self {
        self.tag(tag, &[value])
    }

    /// Append a 2-byte little-endian record.
    #[must_use]
    pub fn tag_u16(self, tag: u8, value: u16) -> Self {
        self.tag(tag, &value.to_le_bytes())
    }

    /// Append an 8-byte little-endian record.
    #[must_use]
    pub fn tag_u64(self, tag: u8, value: u64) -> Self {
        self.tag(tag, &value.to_le_bytes())
    }

    /// Get the built packet without serializing.
    ///
    /// # Errors
    ///
    /// Returns the first [`AppendError`] hit while building.
    pub fn build(self) -> Result<Packet, AppendError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.packet),
        }
    }

    /// Serialize the packet to the provided buffer.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError::PayloadOverflow`] if an append failed, or
    /// [`SerializeError::BufferTooSmall`] if the buffer is too small.
    pub fn serialize(self, buf: &mut [u8]) -> Result<usize, SerializeError> {
        self.build()?.serialize(buf)
    }

    /// Serialize to a `heapless::Vec`.
    ///
    /// # Errors
    ///
    /// See [`PacketBuilder::serialize`].
    pub fn serialize_to_vec<const N: usize>(self) -> Result<heapless::Vec<u8, N>, SerializeError> {
        self.build()?.serialize_to_vec()
    }

    /// Serialize to an `embedded_io::Write` implementation.
    ///
    /// # Errors
    ///
    /// See [`PacketBuilder::serialize`]; [`SerializeError::WriteError`] if the
    /// write fails.
    #[cfg(feature = "embedded-io")]
    pub fn serialize_io<W: embedded_io::Write>(self, writer: &mut W) -> Result<(), SerializeError> {
        self.build()?.serialize_io(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PAYLOAD_CAPACITY;

    #[test]
    fn test_build_matches_manual_appends() {
        let built = PacketBuilder::new(MessageType::SetOutput)
            .tag_u8(0x01, 5)
            .tag_u8(0x02, 1)
            .build()
            .unwrap();

        let mut manual = Packet::from(MessageType::SetOutput);
        manual.append_tag(0x01, &[5]).unwrap();
        manual.append_tag(0x02, &[1]).unwrap();

        assert_eq!(built, manual);
    }

    #[test]
    fn test_ping_has_no_payload() {
        let packet = PacketBuilder::new(MessageType::Ping).build().unwrap();
        assert_eq!(packet.msg_type(), 0x81);
        assert!(packet.is_empty());
    }

    #[test]
    fn test_typed_values() {
        let packet = PacketBuilder::with_type_id(0x13)
            .tag_u64(0x01, 0x1122_3344_5566_7788)
            .tag_u16(0x02, 0x0001)
            .build()
            .unwrap();

        assert_eq!(packet.read_tag_le(0x01), Some(0x1122_3344_5566_7788));
        assert_eq!(packet.tag_value(0x02), Some(&[0x01, 0x00][..]));
    }

    #[test]
    fn test_overflow_is_sticky() {
        let result = PacketBuilder::new(MessageType::OutputStatus)
            .tag(0x01, &[0u8; PAYLOAD_CAPACITY])
            .tag_u8(0x02, 1)
            .build();
        assert_eq!(result, Err(AppendError::CapacityExceeded));
    }

    #[test]
    fn test_serialize_reports_overflow() {
        let mut buf = [0u8; 256];
        let result = PacketBuilder::new(MessageType::OutputStatus)
            .tag(0x01, &[0u8; PAYLOAD_CAPACITY])
            .serialize(&mut buf);
        assert_eq!(result, Err(SerializeError::PayloadOverflow));
    }

    #[test]
    fn test_serialize_to_vec() {
        let vec = PacketBuilder::new(MessageType::Ping)
            .serialize_to_vec::<32>()
            .unwrap();
        assert_eq!(vec.len(), 16);
        assert!(vec.starts_with(b"GBSP v1:"));
    }
}

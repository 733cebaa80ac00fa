//! In-memory GBSP message: a type byte and a bounded TLV payload.
//!
//! Each payload record is laid out as:
//!
//! ```text
//! tag(1) | value_len(1) | value(value_len)
//! ```
//!
//! Records are packed back to back with no gaps, so a record occupies exactly
//! `2 + value_len` bytes.

use heapless::Vec;

use crate::catalog::MessageType;
use crate::crc::GbspDigest;
use crate::frame::PAYLOAD_CAPACITY;

/// Bounded payload storage.
pub type Payload = Vec<u8, PAYLOAD_CAPACITY>;

/// Error returned when a record does not fit in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AppendError {
    /// The encoded record is larger than the remaining payload capacity.
    CapacityExceeded,
}

impl core::fmt::Display for AppendError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::CapacityExceeded => write!(f, "payload capacity exceeded"),
        }
    }
}

/// A single message.
///
/// A fresh packet is in the reset state (type 0, empty payload). Appends
/// either store the whole record or fail and leave the packet untouched, so
/// the payload is always a well-formed sequence of records.
///
/// # Example
///
/// ```
/// use gbsp_proto::{MessageType, Packet};
///
/// let mut packet = Packet::from(MessageType::SetOutput);
/// packet.append_u8(0x01, 5).unwrap();
/// packet.append_u8(0x02, 1).unwrap();
///
/// assert_eq!(packet.payload(), &[0x01, 0x01, 0x05, 0x02, 0x01, 0x01]);
/// assert_eq!(packet.read_tag_u8(0x01), Some(5));
/// assert!(packet.find_tag(0x03).is_none());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet {
    msg_type: u8,
    payload: Payload,
}

impl Packet {
    /// Create a packet in the reset state.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            msg_type: 0,
            payload: Vec::new(),
        }
    }

    /// Create an empty packet of the given raw type.
    #[must_use]
    pub const fn with_type(msg_type: u8) -> Self {
        Self {
            msg_type,
            payload: Vec::new(),
        }
    }

    /// Create a packet from a raw payload, as delivered by a frame decoder.
    ///
    /// The payload is stored verbatim; it is not required to be well formed.
    ///
    /// # Errors
    ///
    /// Returns [`AppendError::CapacityExceeded`] if `payload` is longer than
    /// [`PAYLOAD_CAPACITY`].
    pub fn from_payload(msg_type: u8, payload: &[u8]) -> Result<Self, AppendError> {
        Ok(Self {
            msg_type,
            payload: Vec::from_slice(payload).map_err(|()| AppendError::CapacityExceeded)?,
        })
    }

    /// Return to the reset state.
    #[inline]
    pub fn reset(&mut self) {
        self.msg_type = 0;
        self.payload.clear();
    }

    /// True when the type is 0 and the payload is empty.
    #[inline]
    #[must_use]
    pub fn is_reset(&self) -> bool {
        self.msg_type == 0 && self.payload.is_empty()
    }

    /// Raw message type.
    #[inline]
    #[must_use]
    pub const fn msg_type(&self) -> u8 {
        self.msg_type
    }

    /// Set the raw message type.
    #[inline]
    pub fn set_type(&mut self, msg_type: u8) {
        self.msg_type = msg_type;
    }

    /// Message type, if it is one the catalog knows.
    #[inline]
    #[must_use]
    pub const fn message_type(&self) -> Option<MessageType> {
        MessageType::from_id(self.msg_type)
    }

    /// Payload bytes in use.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Number of payload bytes in use.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True if the payload is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Payload bytes still free.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        PAYLOAD_CAPACITY - self.payload.len()
    }

    /// Append a record.
    ///
    /// # Errors
    ///
    /// Returns [`AppendError::CapacityExceeded`] if `2 + value.len()` bytes do
    /// not fit in the remaining capacity. Nothing is written in that case.
    pub fn append_tag(&mut self, tag: u8, value: &[u8]) -> Result<(), AppendError> {
        let value_len = u8::try_from(value.len()).map_err(|_| AppendError::CapacityExceeded)?;
        if 2 + value.len() > self.remaining() {
            return Err(AppendError::CapacityExceeded);
        }

        self.payload
            .extend_from_slice(&[tag, value_len])
            .and_then(|()| self.payload.extend_from_slice(value))
            .map_err(|()| AppendError::CapacityExceeded)
    }

    /// Append a single-byte record.
    ///
    /// # Errors
    ///
    /// See [`Packet::append_tag`].
    #[inline]
    pub fn append_u8(&mut self, tag: u8, value: u8) -> Result<(), AppendError> {
        self.append_tag(tag, &[value])
    }

    /// Append a 2-byte little-endian record.
    ///
    /// # Errors
    ///
    /// See [`Packet::append_tag`].
    #[inline]
    pub fn append_u16(&mut self, tag: u8, value: u16) -> Result<(), AppendError> {
        self.append_tag(tag, &value.to_le_bytes())
    }

    /// Append a 4-byte little-endian record.
    ///
    /// # Errors
    ///
    /// See [`Packet::append_tag`].
    #[inline]
    pub fn append_u32(&mut self, tag: u8, value: u32) -> Result<(), AppendError> {
        self.append_tag(tag, &value.to_le_bytes())
    }

    /// Append an 8-byte little-endian record.
    ///
    /// # Errors
    ///
    /// See [`Packet::append_tag`].
    #[inline]
    pub fn append_u64(&mut self, tag: u8, value: u64) -> Result<(), AppendError> {
        self.append_tag(tag, &value.to_le_bytes())
    }

    /// Iterate over the payload records in order.
    #[inline]
    pub fn records(&self) -> Records<'_> {
        Records::new(&self.payload)
    }

    /// Find the first record with the given tag.
    #[must_use]
    pub fn find_tag(&self, tag: u8) -> Option<TagRecord<'_>> {
        self.records().find(|record| record.tag == tag)
    }

    /// Borrow the value of the first record with the given tag.
    #[inline]
    #[must_use]
    pub fn tag_value(&self, tag: u8) -> Option<&[u8]> {
        self.find_tag(tag).map(|record| record.value)
    }

    /// First value byte of the given tag.
    ///
    /// Returns `None` if the tag is absent or its value is empty.
    #[inline]
    #[must_use]
    pub fn read_tag_u8(&self, tag: u8) -> Option<u8> {
        self.find_tag(tag).and_then(|record| record.first_byte())
    }

    /// Owned copy of the value of the given tag, exactly `value_len` bytes long.
    #[must_use]
    pub fn read_tag(&self, tag: u8) -> Option<Payload> {
        self.tag_value(tag)
            .and_then(|value| Vec::from_slice(value).ok())
    }

    /// Value of the given tag read as a little-endian unsigned integer.
    ///
    /// Returns `None` if the tag is absent or its value is empty or wider
    /// than 8 bytes.
    #[inline]
    #[must_use]
    pub fn read_tag_le(&self, tag: u8) -> Option<u64> {
        self.find_tag(tag).and_then(|record| record.to_le_u64())
    }

    /// True if the records end exactly at the payload length.
    #[inline]
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        records_well_formed(&self.payload)
    }

    /// Frame checksum over type, payload length and payload.
    #[must_use]
    pub fn checksum(&self) -> u16 {
        let mut crc = GbspDigest::new();
        crc.update_u16(u16::from(self.msg_type));
        crc.update_u16(self.payload.len() as u16);
        crc.update_slice(&self.payload);
        crc.finalize()
    }
}

impl From<MessageType> for Packet {
    #[inline]
    fn from(t: MessageType) -> Self {
        Self::with_type(t.id())
    }
}

/// A view of one record inside a payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TagRecord<'a> {
    offset: usize,
    tag: u8,
    value: &'a [u8],
}

impl<'a> TagRecord<'a> {
    /// Offset of the record's tag byte within the payload.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    #[must_use]
    pub const fn tag(&self) -> u8 {
        self.tag
    }

    #[inline]
    #[must_use]
    pub const fn value(&self) -> &'a [u8] {
        self.value
    }

    /// Bytes the record occupies in the payload.
    #[inline]
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        2 + self.value.len()
    }

    #[inline]
    #[must_use]
    pub fn first_byte(&self) -> Option<u8> {
        self.value.first().copied()
    }

    /// Value as a little-endian unsigned integer of 1 to 8 bytes.
    #[must_use]
    pub fn to_le_u64(&self) -> Option<u64> {
        if self.value.is_empty() || self.value.len() > 8 {
            return None;
        }
        Some(
            self.value
                .iter()
                .rev()
                .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
        )
    }
}

/// Iterator over the records of a payload.
///
/// Stops at the payload length, at [`PAYLOAD_CAPACITY`], or at the first
/// record whose header or value would run past the payload.
#[derive(Clone, Debug)]
pub struct Records<'a> {
    payload: &'a [u8],
    pos: usize,
}

impl<'a> Records<'a> {
    #[inline]
    fn new(payload: &'a [u8]) -> Self {
        Self { payload, pos: 0 }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = TagRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.payload.len();
        if self.pos >= len || self.pos >= PAYLOAD_CAPACITY {
            return None;
        }

        let offset = self.pos;
        let end = match self.payload.get(offset + 1) {
            Some(&value_len) => offset + 2 + value_len as usize,
            None => len + 1,
        };
        if end > len {
            // Malformed tail
            self.pos = len;
            return None;
        }

        self.pos = end;
        Some(TagRecord {
            offset,
            tag: self.payload[offset],
            value: &self.payload[offset + 2..end],
        })
    }
}

/// True if `payload` is a gap-free sequence of records ending at its length.
pub(crate) fn records_well_formed(payload: &[u8]) -> bool {
    if payload.len() > PAYLOAD_CAPACITY {
        return false;
    }
    let mut pos = 0;
    while pos < payload.len() {
        match payload.get(pos + 1) {
            Some(&value_len) => pos += 2 + value_len as usize,
            None => return false,
        }
    }
    pos == payload.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_output() -> Packet {
        let mut packet = Packet::from(MessageType::SetOutput);
        packet.append_tag(0x01, &[0x05]).unwrap();
        packet.append_tag(0x02, &[0x01]).unwrap();
        packet
    }

    #[test]
    fn test_new_is_reset() {
        let packet = Packet::new();
        assert!(packet.is_reset());
        assert_eq!(packet.msg_type(), 0);
        assert_eq!(packet.len(), 0);
        assert_eq!(packet, Packet::default());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut packet = set_output();
        assert!(!packet.is_reset());

        packet.reset();
        assert!(packet.is_reset());
        packet.reset();
        assert!(packet.is_reset());
    }

    #[test]
    fn test_type_alone_is_not_reset() {
        assert!(!Packet::from(MessageType::Ping).is_reset());

        let mut packet = Packet::new();
        packet.append_tag(0x01, &[]).unwrap();
        assert!(!packet.is_reset());
    }

    #[test]
    fn test_set_output_layout() {
        let packet = set_output();
        assert_eq!(packet.len(), 6);
        assert_eq!(packet.payload(), &[0x01, 0x01, 0x05, 0x02, 0x01, 0x01]);
        assert_eq!(packet.message_type(), Some(MessageType::SetOutput));
    }

    #[test]
    fn test_find_tag_offsets() {
        let packet = set_output();

        let first = packet.find_tag(0x01).unwrap();
        assert_eq!(first.offset(), 0);
        assert_eq!(first.value(), &[0x05]);

        let second = packet.find_tag(0x02).unwrap();
        assert_eq!(second.offset(), 3);
        assert_eq!(second.value(), &[0x01]);
        assert_eq!(second.encoded_len(), 3);

        assert!(packet.find_tag(0x03).is_none());
    }

    #[test]
    fn test_find_tag_empty_payload() {
        let packet = Packet::from(MessageType::Ping);
        for tag in 0..=u8::MAX {
            assert!(packet.find_tag(tag).is_none());
        }
    }

    #[test]
    fn test_duplicate_tag_returns_first() {
        let mut packet = Packet::with_type(0x12);
        packet.append_tag(0x01, b"one").unwrap();
        packet.append_tag(0x01, b"two").unwrap();
        assert_eq!(packet.tag_value(0x01), Some(&b"one"[..]));
    }

    #[test]
    fn test_values_round_trip() {
        let mut packet = Packet::with_type(0x14);
        packet.append_tag(0x01, b"onewire").unwrap();
        packet.append_tag(0x02, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        packet.append_tag(0x03, &[]).unwrap();
        packet.append_u8(0x04, 7).unwrap();

        assert_eq!(packet.read_tag(0x01).unwrap().as_slice(), b"onewire");
        assert_eq!(
            packet.read_tag(0x02).unwrap().as_slice(),
            &[0xDE, 0xAD, 0xBE, 0xEF]
        );
        assert!(packet.read_tag(0x03).unwrap().is_empty());
        assert_eq!(packet.read_tag_u8(0x04), Some(7));
        assert_eq!(packet.find_tag(0x04).unwrap().offset(), 2 + 7 + 2 + 4 + 2);
    }

    #[test]
    fn test_read_tag_u8_empty_value() {
        let mut packet = Packet::with_type(0x13);
        packet.append_tag(0x02, &[]).unwrap();
        assert!(packet.find_tag(0x02).is_some());
        assert_eq!(packet.read_tag_u8(0x02), None);
    }

    #[test]
    fn test_little_endian_values() {
        let mut packet = Packet::with_type(0x01);
        packet.append_u16(0x01, 0x0304).unwrap();
        packet.append_u32(0x02, 0xAABB_CCDD).unwrap();
        packet.append_u64(0x03, 0x0102_0304_0506_0708).unwrap();

        assert_eq!(packet.tag_value(0x01), Some(&[0x04, 0x03][..]));
        assert_eq!(packet.read_tag_le(0x01), Some(0x0304));
        assert_eq!(packet.read_tag_le(0x02), Some(0xAABB_CCDD));
        assert_eq!(packet.read_tag_le(0x03), Some(0x0102_0304_0506_0708));
    }

    #[test]
    fn test_le_rejects_empty_and_wide() {
        let mut packet = Packet::with_type(0x01);
        packet.append_tag(0x01, &[]).unwrap();
        packet.append_tag(0x02, &[0u8; 9]).unwrap();
        assert_eq!(packet.read_tag_le(0x01), None);
        assert_eq!(packet.read_tag_le(0x02), None);
    }

    #[test]
    fn test_fill_to_capacity() {
        let mut packet = Packet::with_type(0x12);
        packet.append_tag(0x01, &[0xAA; PAYLOAD_CAPACITY - 2]).unwrap();
        assert_eq!(packet.len(), PAYLOAD_CAPACITY);
        assert_eq!(packet.remaining(), 0);
        assert!(packet.is_well_formed());
    }

    #[test]
    fn test_overflow_rejected_and_unchanged() {
        let mut packet = Packet::with_type(0x12);
        packet.append_tag(0x01, &[0x11; 100]).unwrap();
        let before = packet.clone();

        // 102 used, 10 free: 2 + 9 does not fit
        assert_eq!(
            packet.append_tag(0x02, &[0x22; 9]),
            Err(AppendError::CapacityExceeded)
        );
        assert_eq!(packet, before);

        // 2 + 8 fits exactly
        packet.append_tag(0x02, &[0x22; 8]).unwrap();
        assert_eq!(packet.remaining(), 0);

        assert_eq!(packet.append_tag(0x03, &[]), Err(AppendError::CapacityExceeded));
        assert_eq!(packet.append_u8(0x03, 0), Err(AppendError::CapacityExceeded));
        assert!(packet.is_well_formed());
    }

    #[test]
    fn test_oversized_value_rejected() {
        let mut packet = Packet::new();
        let big = [0u8; 300];
        assert_eq!(
            packet.append_tag(0x01, &big),
            Err(AppendError::CapacityExceeded)
        );
        assert!(packet.is_reset());
    }

    #[test]
    fn test_from_payload_capacity() {
        assert!(Packet::from_payload(0x12, &[0u8; PAYLOAD_CAPACITY]).is_ok());
        assert_eq!(
            Packet::from_payload(0x12, &[0u8; PAYLOAD_CAPACITY + 1]),
            Err(AppendError::CapacityExceeded)
        );
    }

    #[test]
    fn test_malformed_payload_lookup_is_bounded() {
        // Second record claims 200 value bytes but only 2 follow
        let packet = Packet::from_payload(0x13, &[0x01, 0x01, 0x07, 0x02, 200, 0x00, 0x00]).unwrap();
        assert!(!packet.is_well_formed());
        assert_eq!(packet.read_tag_u8(0x01), Some(0x07));
        assert!(packet.find_tag(0x02).is_none());
        assert_eq!(packet.records().count(), 1);
    }

    #[test]
    fn test_dangling_tag_byte() {
        let packet = Packet::from_payload(0x13, &[0x01, 0x00, 0x02]).unwrap();
        assert!(!packet.is_well_formed());
        assert!(packet.find_tag(0x01).is_some());
        assert!(packet.find_tag(0x02).is_none());
    }

    #[test]
    fn test_records_iterate_in_order() {
        let packet = set_output();
        let mut records = packet.records();
        assert_eq!(records.next().map(|r| r.tag()), Some(0x01));
        assert_eq!(records.next().map(|r| r.tag()), Some(0x02));
        assert!(records.next().is_none());
    }

    #[test]
    fn test_checksum_depends_on_contents() {
        let a = set_output();
        let b = set_output();
        assert_eq!(a.checksum(), b.checksum());

        let mut c = set_output();
        c.set_type(0x84);
        assert_ne!(a.checksum(), c.checksum());
    }

    #[cfg(not(feature = "legacy-seed"))]
    #[test]
    fn test_checksum_values() {
        assert_eq!(Packet::new().checksum(), 0xF99B);
        assert_eq!(Packet::from(MessageType::Ping).checksum(), 0xC84E);
        assert_eq!(set_output().checksum(), 0xB30A);
    }
}

//! Frame decoder.
//!
//! Frames are delimited by the declared payload length, never by scanning
//! for the trailer: payload bytes may legitimately contain `\r\n`.
//!
//! A frame is accepted only if every check passes, in this order: prefix,
//! reserved type byte, length bound, completeness, checksum, trailer and
//! finally the TLV structure of the payload.

use crate::frame::{frame_len, GBSP_PREFIX, GBSP_TRAILER, HEADER_LEN, PAYLOAD_CAPACITY, PREFIX_LEN};
use crate::packet::{records_well_formed, Packet};

/// Reasons a frame is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// The frame does not start with `GBSP v1:`.
    Prefix,
    /// The high byte of the type field is not zero.
    ReservedType,
    /// The declared payload length exceeds the payload capacity.
    PayloadTooLong,
    /// Fewer bytes than the header declares.
    Truncated,
    /// The checksum does not match the type, length and payload.
    Checksum,
    /// The frame does not end with `\r\n`.
    Trailer,
    /// The payload records do not end exactly at the payload length.
    MalformedPayload,
    /// Bytes follow the end of the frame.
    TrailingBytes,
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Prefix => write!(f, "missing frame prefix"),
            Self::ReservedType => write!(f, "reserved type byte set"),
            Self::PayloadTooLong => write!(f, "payload length out of range"),
            Self::Truncated => write!(f, "truncated frame"),
            Self::Checksum => write!(f, "checksum mismatch"),
            Self::Trailer => write!(f, "bad frame trailer"),
            Self::MalformedPayload => write!(f, "malformed payload"),
            Self::TrailingBytes => write!(f, "trailing bytes after frame"),
        }
    }
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameHeader {
    /// Raw message type.
    pub msg_type: u8,
    /// Declared payload length.
    pub payload_len: usize,
}

impl FrameHeader {
    /// Total size of the frame this header opens.
    #[inline]
    #[must_use]
    pub const fn frame_len(&self) -> usize {
        frame_len(self.payload_len)
    }
}

/// Decode the 12-byte header at the start of `bytes`.
///
/// # Errors
///
/// - [`ParseError::Truncated`] if fewer than 12 bytes are given
/// - [`ParseError::Prefix`] if the prefix does not match
/// - [`ParseError::ReservedType`] if the type high byte is set
/// - [`ParseError::PayloadTooLong`] if the length exceeds the capacity
pub fn parse_header(bytes: &[u8]) -> Result<FrameHeader, ParseError> {
    if bytes.len() < HEADER_LEN {
        return Err(ParseError::Truncated);
    }
    if &bytes[..PREFIX_LEN] != GBSP_PREFIX {
        return Err(ParseError::Prefix);
    }

    let msg_type = u16::from_le_bytes([bytes[8], bytes[9]]);
    let payload_len = u16::from_le_bytes([bytes[10], bytes[11]]) as usize;

    let msg_type = u8::try_from(msg_type).map_err(|_| ParseError::ReservedType)?;
    if payload_len > PAYLOAD_CAPACITY {
        return Err(ParseError::PayloadTooLong);
    }

    Ok(FrameHeader {
        msg_type,
        payload_len,
    })
}

/// Decode the first frame in `bytes`.
///
/// Returns the packet and the number of bytes the frame occupied; anything
/// after that is left for the caller.
///
/// # Errors
///
/// Any [`ParseError`] except [`ParseError::TrailingBytes`].
pub fn parse_frame(bytes: &[u8]) -> Result<(Packet, usize), ParseError> {
    let header = parse_header(bytes)?;
    let total = header.frame_len();
    if bytes.len() < total {
        return Err(ParseError::Truncated);
    }

    let payload_end = HEADER_LEN + header.payload_len;
    let payload = &bytes[HEADER_LEN..payload_end];
    let received_crc = u16::from_le_bytes([bytes[payload_end], bytes[payload_end + 1]]);
    let trailer = &bytes[payload_end + 2..total];

    let packet =
        Packet::from_payload(header.msg_type, payload).map_err(|_| ParseError::PayloadTooLong)?;

    if packet.checksum() != received_crc {
        return Err(ParseError::Checksum);
    }
    if trailer != GBSP_TRAILER {
        return Err(ParseError::Trailer);
    }
    if !records_well_formed(payload) {
        return Err(ParseError::MalformedPayload);
    }

    Ok((packet, total))
}

/// Decode a buffer holding exactly one frame.
///
/// # Example
///
/// ```
/// use gbsp_proto::{parse, MessageType, Packet, Serialize, MAX_FRAME_SIZE};
///
/// let mut packet = Packet::from(MessageType::SetOutput);
/// packet.append_u8(0x01, 5).unwrap();
///
/// let mut buf = [0u8; MAX_FRAME_SIZE];
/// let len = packet.serialize(&mut buf).unwrap();
///
/// let decoded = parse(&buf[..len]).unwrap();
/// assert_eq!(decoded, packet);
/// ```
///
/// # Errors
///
/// Any [`ParseError`]; [`ParseError::TrailingBytes`] if `bytes` continues
/// past the end of the frame.
pub fn parse(bytes: &[u8]) -> Result<Packet, ParseError> {
    let (packet, used) = parse_frame(bytes)?;
    if used != bytes.len() {
        return Err(ParseError::TrailingBytes);
    }
    Ok(packet)
}

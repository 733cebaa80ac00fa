//! GBSP v1 packet codec for the gateboard serial link.
//!
//! This crate provides everything needed to work with GBSP frames:
//!
//! - **Packet**: the in-memory message
//!   - [`Packet`] - Message type plus a bounded TLV payload
//!   - [`TagRecord`] - View of one payload record
//!   - [`PacketBuilder`] - Fluent builder API
//!
//! - **Encoding**: write outgoing frames
//!   - [`Serialize`] trait - Serialize to a buffer, `heapless::Vec` or I/O sink
//!
//! - **Decoding**: accept incoming frames
//!   - [`parse()`] - Decode a buffer holding one frame
//!   - [`FrameReader`] - Byte-at-a-time reader with resynchronization
//!
//! - **Catalog**: [`MessageType`] and the per-type tag constants in [`catalog`]
//!
//! # Protocol Format
//!
//! ```text
//! "GBSP v1:" | type(2, LE) | len(2, LE) | payload(len) | crc(2, LE) | "\r\n"
//! ```
//!
//! - `type` - message kind; only the low byte is used, the high byte is 0
//! - `len` - payload length, at most [`PAYLOAD_CAPACITY`] (112)
//! - `payload` - records of `tag(1) | value_len(1) | value(value_len)`
//! - `crc` - CRC-16/CCITT (KERMIT form) seeded with the CRC of the prefix,
//!   covering type, length and payload
//!
//! A frame is always `16 + len` bytes. There is no byte stuffing; frames are
//! delimited by their length field.
//!
//! # Examples
//!
//! ## Building and Serializing
//!
//! ```
//! use gbsp_proto::{catalog::set_output, MessageType, Packet, Serialize};
//!
//! let mut packet = Packet::from(MessageType::SetOutput);
//! packet.append_u8(set_output::OUTPUT_ID, 5).unwrap();
//! packet.append_u8(set_output::OUTPUT_MODE, set_output::OUTPUT_ENABLED).unwrap();
//!
//! let mut buf = [0u8; 64];
//! let len = packet.serialize(&mut buf).unwrap();
//! assert_eq!(&buf[8..18], &[0x83, 0x00, 0x06, 0x00, 0x01, 0x01, 0x05, 0x02, 0x01, 0x01]);
//! assert_eq!(len, 22);
//! ```
//!
//! ## Parsing
//!
//! ```
//! use gbsp_proto::{parse, MessageType, Packet, Serialize};
//!
//! let mut buf = [0u8; 16];
//! let len = Packet::from(MessageType::Ping).serialize(&mut buf).unwrap();
//!
//! let packet = parse(&buf[..len]).unwrap();
//! assert_eq!(packet.message_type(), Some(MessageType::Ping));
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//! - **`embedded-io`**: Enable `serialize_io()` and `FrameReader::read_from()`
//! - **`legacy-seed`**: Seed the checksum with `0xE3AF`, the constant shipped
//!   by boards built from the older kegboard sources
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations,
//! making it suitable for embedded systems with limited resources.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod builder;
pub mod catalog;
pub mod crc;
pub mod frame;
pub mod packet;
pub mod parser;
pub mod reader;
pub mod serialize;

// Re-export types at crate root for convenience
pub use builder::PacketBuilder;
pub use catalog::MessageType;
pub use crate::crc::{calculate_crc16, GbspDigest, PREFIX_CRC};
pub use frame::{
    frame_len, FRAME_OVERHEAD, GBSP_PREFIX, GBSP_TRAILER, HEADER_LEN, MAX_FRAME_SIZE,
    PAYLOAD_CAPACITY,
};
pub use packet::{AppendError, Packet, Payload, Records, TagRecord};
pub use parser::{parse, parse_frame, parse_header, FrameHeader, ParseError};
#[cfg(feature = "embedded-io")]
pub use reader::ReadError;
pub use reader::FrameReader;
pub use serialize::{Serialize, SerializeError};

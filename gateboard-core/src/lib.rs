//! Typed gateboard messages and the host-side board link.
//!
//! This crate sits on top of [`gbsp_proto`] and gives the packet records a
//! meaning. It can be used both in embedded `no_std` environments and on
//! host.
//!
//! # Overview
//!
//! - [`messages`]: Typed messages ([`Message`], [`Hello`], [`SetOutput`], ...)
//! - [`input`]: Message source trait ([`MessageSource`])
//! - [`output`]: Message sink trait ([`MessageSink`])
//! - [`link`]: Board handshake and message flow ([`GateboardLink`])
//!
//! # Example
//!
//! ```rust
//! use gateboard_core::{Message, OutputMode, SetOutput};
//! use gbsp_proto::{parse, Serialize};
//!
//! let command = Message::from(SetOutput { output_id: 5, mode: OutputMode::Enabled });
//! let mut buf = [0u8; 64];
//! let len = command.serialize(&mut buf).unwrap();
//!
//! let packet = parse(&buf[..len]).unwrap();
//! assert_eq!(Message::from_packet(&packet), Ok(command));
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting (for embedded logging)
//! - **`embedded-io`**: Forwarded to `gbsp-proto`
//! - **`legacy-seed`**: Forwarded to `gbsp-proto`

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod input;
pub mod link;
pub mod messages;
pub mod output;

// Re-export main types at crate root
pub use input::{InputError, MessageSource};
pub use link::{
    GateboardLink, LinkConfig, LinkError, DEFAULT_REQUIRED_FIRMWARE_VERSION, STARTUP_PINGS,
};
pub use messages::{
    AuthToken, Field, Hello, Message, MessageError, OnewirePresence, OutputMode, OutputStatus,
    PresenceStatus, Ping, SetOutput, TypedMessage, MAX_FIELD_LEN,
};
pub use output::{MessageSink, OutputError};

//! Message source trait and error types.

use crate::messages::{Message, MessageError};
use core::future::Future;
use gbsp_proto::ParseError;

/// Error type for receiving messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputError {
    /// Serial/communication I/O error.
    Io,
    /// Frame rejected by the decoder (prefix, length, trailer, records).
    Parse(ParseError),
    /// Checksum mismatch.
    Checksum,
    /// Frame was valid but its records do not form the expected message.
    Message(MessageError),
    /// Connection lost / end of stream.
    Disconnected,
}

impl core::fmt::Display for InputError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io => write!(f, "i/o error"),
            Self::Parse(e) => write!(f, "bad frame: {e}"),
            Self::Checksum => write!(f, "checksum mismatch"),
            Self::Message(e) => write!(f, "bad message: {e}"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

impl From<ParseError> for InputError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Checksum => InputError::Checksum,
            other => InputError::Parse(other),
        }
    }
}

impl From<MessageError> for InputError {
    fn from(err: MessageError) -> Self {
        InputError::Message(err)
    }
}

/// Async trait for sources of board messages.
///
/// This trait abstracts the transport the board is reached over, so the
/// link can run on a serial port on the host or on a mock in tests.
///
/// # `no_std` Compatibility
///
/// Implementations in this crate's dependents may use `std`; the trait
/// itself needs no allocation.
pub trait MessageSource {
    /// Wait for and receive the next message from the board.
    fn receive(&mut self) -> impl Future<Output = Result<Message, InputError>>;

    /// Check if the source is connected.
    fn is_connected(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_error_is_kept_apart() {
        assert_eq!(InputError::from(ParseError::Checksum), InputError::Checksum);
        assert_eq!(
            InputError::from(ParseError::Trailer),
            InputError::Parse(ParseError::Trailer)
        );
    }

    #[test]
    fn test_message_error_converts() {
        let err = MessageError::MissingTag { tag: 0x02 };
        assert_eq!(InputError::from(err), InputError::Message(err));
    }
}

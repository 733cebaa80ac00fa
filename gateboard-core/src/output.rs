//! Message sink trait and error types.

use crate::messages::Message;
use core::future::Future;
use gbsp_proto::SerializeError;

/// Error type for sending messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputError {
    /// Serial/communication I/O error.
    Io,
    /// Transport not ready (e.g. port not open).
    NotReady,
    /// The message does not fit in a frame.
    Overflow,
}

impl core::fmt::Display for OutputError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io => write!(f, "i/o error"),
            Self::NotReady => write!(f, "not ready"),
            Self::Overflow => write!(f, "message too large"),
        }
    }
}

impl From<SerializeError> for OutputError {
    fn from(err: SerializeError) -> Self {
        match err {
            SerializeError::WriteError => OutputError::Io,
            SerializeError::BufferTooSmall | SerializeError::PayloadOverflow => {
                OutputError::Overflow
            }
        }
    }
}

/// Async trait for sinks of messages to the board.
pub trait MessageSink {
    /// Send one message to the board.
    ///
    /// May wait until the previous frame has been written.
    fn send(&mut self, message: &Message) -> impl Future<Output = Result<(), OutputError>>;

    /// Check if the sink is ready to accept data.
    fn is_ready(&self) -> bool;
}

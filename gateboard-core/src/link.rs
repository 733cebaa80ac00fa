//! GateboardLink: tracks the board handshake between a source and a sink.

use crate::input::{InputError, MessageSource};
use crate::messages::Message;
use crate::output::{MessageSink, OutputError};

/// Oldest firmware the link accepts by default.
pub const DEFAULT_REQUIRED_FIRMWARE_VERSION: u16 = 4;

/// PINGs sent by [`GateboardLink::start`] before listening.
pub const STARTUP_PINGS: usize = 2;

/// Link configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    /// HELLO messages reporting an older firmware are rejected.
    pub required_firmware_version: u16,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            required_firmware_version: DEFAULT_REQUIRED_FIRMWARE_VERSION,
        }
    }
}

/// A link to one board.
///
/// The board is not trusted until it sends a HELLO with a supported firmware
/// version. Until then every received message is dropped and the board is
/// pinged so it announces itself.
///
/// # Error Handling
///
/// A disconnected source or an outdated HELLO un-initializes the board.
/// Other input errors leave the link state alone.
pub struct GateboardLink<I, O> {
    input: I,
    output: O,
    config: LinkConfig,
    firmware_version: Option<u16>,
}

impl<I: MessageSource, O: MessageSink> GateboardLink<I, O> {
    /// Create a link with the default configuration.
    pub fn new(input: I, output: O) -> Self {
        Self::with_config(input, output, LinkConfig::default())
    }

    /// Create a link with a custom configuration.
    pub fn with_config(input: I, output: O, config: LinkConfig) -> Self {
        Self {
            input,
            output,
            config,
            firmware_version: None,
        }
    }

    /// Run the link, passing accepted messages to `handler` indefinitely.
    ///
    /// The board is pinged first (see [`start`](Self::start)). Errors are
    /// dropped; use [`process_one`](Self::process_one) to see them.
    pub async fn run<F: FnMut(&Message)>(&mut self, mut handler: F) -> ! {
        let _ = self.start().await;
        loop {
            if let Ok(Some(message)) = self.process_one().await {
                handler(&message);
            }
        }
    }

    /// Receive one message and update the link state.
    ///
    /// Returns `Ok(Some(message))` for a message the caller should act on
    /// (including the HELLO that initialized the board), or `Ok(None)` if the
    /// message was dropped because the board is not initialized yet.
    ///
    /// # Errors
    ///
    /// - [`LinkError::Input`] if receiving failed
    /// - [`LinkError::FirmwareTooOld`] for a HELLO from outdated firmware
    /// - [`LinkError::Output`] if pinging an uninitialized board failed
    pub async fn process_one(&mut self) -> Result<Option<Message>, LinkError> {
        let message = match self.input.receive().await {
            Ok(message) => message,
            Err(e) => {
                if e == InputError::Disconnected {
                    self.firmware_version = None;
                }
                return Err(LinkError::Input(e));
            }
        };

        if let Message::Hello(hello) = &message {
            let required = self.config.required_firmware_version;
            if hello.firmware_version < required {
                self.firmware_version = None;
                return Err(LinkError::FirmwareTooOld {
                    found: hello.firmware_version,
                    required,
                });
            }
            self.firmware_version = Some(hello.firmware_version);
            return Ok(Some(message));
        }

        if !self.is_initialized() {
            self.ping().await?;
            return Ok(None);
        }

        Ok(Some(message))
    }

    /// Send a message to the board.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::NotInitialized`] for anything but a PING before
    /// the board has said HELLO, or [`LinkError::Output`] if sending failed.
    pub async fn send(&mut self, message: &Message) -> Result<(), LinkError> {
        if !self.is_initialized() && *message != Message::Ping {
            return Err(LinkError::NotInitialized);
        }
        self.output.send(message).await.map_err(LinkError::Output)
    }

    /// Ping the board [`STARTUP_PINGS`] times.
    ///
    /// A board that booted before the host connected stays silent until
    /// asked, so this is sent before listening.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Output`] if sending failed.
    pub async fn start(&mut self) -> Result<(), LinkError> {
        for _ in 0..STARTUP_PINGS {
            self.ping().await?;
        }
        Ok(())
    }

    /// Ask the board to announce itself.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Output`] if sending failed.
    pub async fn ping(&mut self) -> Result<(), LinkError> {
        self.output
            .send(&Message::Ping)
            .await
            .map_err(LinkError::Output)
    }

    /// True once a supported HELLO has been received.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.firmware_version.is_some()
    }

    /// Firmware version from the last accepted HELLO.
    #[inline]
    pub fn firmware_version(&self) -> Option<u16> {
        self.firmware_version
    }

    /// Get the link configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Get a reference to the message source.
    pub fn input(&self) -> &I {
        &self.input
    }

    /// Get a mutable reference to the message source.
    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    /// Get a reference to the message sink.
    pub fn output(&self) -> &O {
        &self.output
    }

    /// Get a mutable reference to the message sink.
    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    /// Decompose the link into its source and sink.
    pub fn into_parts(self) -> (I, O) {
        (self.input, self.output)
    }
}

/// Error type for link operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Error from the message source.
    Input(InputError),
    /// Error from the message sink.
    Output(OutputError),
    /// The board has not sent a supported HELLO yet.
    NotInitialized,
    /// The board runs firmware older than required.
    FirmwareTooOld { found: u16, required: u16 },
}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Input(e) => write!(f, "input: {e}"),
            Self::Output(e) => write!(f, "output: {e}"),
            Self::NotInitialized => write!(f, "board not initialized"),
            Self::FirmwareTooOld { found, required } => {
                write!(f, "firmware version {found} is older than {required}")
            }
        }
    }
}

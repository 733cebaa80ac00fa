//! Board monitor: runs the link and reports what the board says.

use crate::DEFAULT_BOARD_NAME;
use gateboard_core::{
    GateboardLink, InputError, LinkConfig, LinkError, Message, MessageSink, MessageSource,
};
use log::{debug, info, warn};

/// Monitor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Name used as the log prefix for this board.
    pub board_name: String,
    /// Log every accepted message at info level.
    pub show_messages: bool,
    pub link: LinkConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            board_name: DEFAULT_BOARD_NAME.to_string(),
            show_messages: false,
            link: LinkConfig::default(),
        }
    }
}

/// Wraps a [`GateboardLink`] and logs board discovery, received messages and
/// rejected input.
pub struct Monitor<I, O> {
    link: GateboardLink<I, O>,
    config: MonitorConfig,
}

impl<I: MessageSource, O: MessageSink> Monitor<I, O> {
    /// Create a monitor with the default configuration.
    pub fn new(input: I, output: O) -> Self {
        Self::with_config(input, output, MonitorConfig::default())
    }

    /// Create a monitor with a custom configuration.
    pub fn with_config(input: I, output: O, config: MonitorConfig) -> Self {
        Self {
            link: GateboardLink::with_config(input, output, config.link),
            config,
        }
    }

    /// Run the monitor until the source disconnects.
    ///
    /// The board is pinged before listening. Every accepted message is
    /// passed to `handler`.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Input`] with [`InputError::Disconnected`] once the
    /// source is gone, or the first output error.
    pub async fn run<F: FnMut(&Message)>(&mut self, mut handler: F) -> Result<(), LinkError> {
        debug!("{}: pinging board", self.config.board_name);
        self.link.start().await?;
        loop {
            match self.step().await {
                Ok(Some(message)) => handler(&message),
                Ok(None) => {}
                Err(e @ LinkError::Input(InputError::Disconnected)) => return Err(e),
                Err(e @ LinkError::Output(_)) => return Err(e),
                Err(_) => {}
            }
        }
    }

    /// Receive and log one message.
    ///
    /// # Errors
    ///
    /// See [`GateboardLink::process_one`].
    pub async fn step(&mut self) -> Result<Option<Message>, LinkError> {
        let name = &self.config.board_name;
        let was_initialized = self.link.is_initialized();

        let result = self.link.process_one().await;
        match &result {
            Ok(Some(Message::Hello(hello))) if !was_initialized => {
                info!(
                    "{name}: found board, firmware version {}",
                    hello.firmware_version
                );
            }
            Ok(Some(_)) | Ok(None) => {}
            Err(LinkError::FirmwareTooOld { found, required }) => {
                warn!("{name}: firmware version {found} is too old, need {required}");
            }
            Err(LinkError::Input(InputError::Disconnected)) => {
                if was_initialized {
                    warn!("{name}: board disconnected");
                }
            }
            Err(e) => debug!("{name}: {e}"),
        }

        match &result {
            Ok(Some(message)) if self.config.show_messages => info!("{name}: RX {message:?}"),
            Ok(None) => debug!("{name}: not initialized, dropped message"),
            _ => {}
        }

        result
    }

    /// Send a message to the board.
    ///
    /// # Errors
    ///
    /// See [`GateboardLink::send`].
    pub async fn send(&mut self, message: &Message) -> Result<(), LinkError> {
        if self.config.show_messages {
            info!("{}: TX {message:?}", self.config.board_name);
        }
        self.link.send(message).await
    }

    /// Get the monitor configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Get a reference to the underlying link.
    pub fn link(&self) -> &GateboardLink<I, O> {
        &self.link
    }

    /// Get a mutable reference to the underlying link.
    pub fn link_mut(&mut self) -> &mut GateboardLink<I, O> {
        &mut self.link
    }

    /// Decompose the monitor into its link.
    pub fn into_link(self) -> GateboardLink<I, O> {
        self.link
    }
}

use gateboard_core::{Message, MessageSink, OutputError};
use gbsp_proto::{Serialize, MAX_FRAME_SIZE};
use log::{trace, warn};
use std::io::Write;

/// Serial-port message sink.
///
/// Serializes each message into one GBSP frame and writes it to any
/// [`Write`] implementation, flushing after every frame.
pub struct SerialSink<W> {
    port: W,
}

impl<W: Write> SerialSink<W> {
    /// Create a new sink writing to `port`.
    pub fn new(port: W) -> Self {
        Self { port }
    }

    /// Get a reference to the underlying port.
    pub fn port(&self) -> &W {
        &self.port
    }

    /// Consume the sink, returning the underlying port.
    pub fn into_inner(self) -> W {
        self.port
    }
}

impl<W: Write> MessageSink for SerialSink<W> {
    async fn send(&mut self, message: &Message) -> Result<(), OutputError> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let len = message.serialize(&mut buf)?;
        trace!("serial: writing {len} byte frame type={:#04x}", message.msg_type());

        self.port
            .write_all(&buf[..len])
            .and_then(|()| self.port.flush())
            .map_err(|e| {
                warn!("serial: write failed: {e}");
                OutputError::Io
            })
    }

    fn is_ready(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_on;
    use gateboard_core::{OutputMode, SetOutput};

    #[cfg(not(feature = "legacy-seed"))]
    #[test]
    fn test_writes_set_output_frame() {
        let mut sink = SerialSink::new(Vec::new());
        let message = Message::from(SetOutput {
            output_id: 5,
            mode: OutputMode::Enabled,
        });

        assert_eq!(block_on(sink.send(&message)), Ok(()));
        assert_eq!(
            sink.into_inner(),
            b"GBSP v1:\x83\x00\x06\x00\x01\x01\x05\x02\x01\x01\x0A\xB3\r\n"
        );
    }

    #[test]
    fn test_frames_are_appended() {
        let mut sink = SerialSink::new(Vec::new());
        block_on(sink.send(&Message::Ping)).unwrap();
        block_on(sink.send(&Message::Ping)).unwrap();
        assert_eq!(sink.port().len(), 32);
    }

    #[test]
    fn test_full_port_is_io_error() {
        let mut storage = [0u8; 10];
        let mut sink = SerialSink::new(&mut storage[..]);
        assert_eq!(block_on(sink.send(&Message::Ping)), Err(OutputError::Io));
    }
}

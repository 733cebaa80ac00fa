use gateboard_core::{InputError, Message, MessageSource};
use gbsp_proto::FrameReader;
use log::{debug, trace, warn};
use std::io::{ErrorKind, Read};

/// Size of the chunk pulled from the port per read call.
const READ_CHUNK: usize = 64;

/// Serial-port message source.
///
/// Reads raw bytes from any [`Read`] implementation (a serial port, a TCP
/// stream, a file replay) and decodes them with a [`FrameReader`]. Noise
/// between frames is skipped; a rejected frame is reported once and the
/// reader resynchronizes on the next prefix.
pub struct SerialSource<R> {
    port: R,
    reader: FrameReader,
    chunk: [u8; READ_CHUNK],
    pos: usize,
    filled: usize,
    connected: bool,
}

impl<R: Read> SerialSource<R> {
    /// Create a new source reading from `port`.
    pub fn new(port: R) -> Self {
        Self {
            port,
            reader: FrameReader::new(),
            chunk: [0u8; READ_CHUNK],
            pos: 0,
            filled: 0,
            connected: true,
        }
    }

    /// Number of noise bytes skipped so far.
    #[inline]
    #[must_use]
    pub fn dropped_bytes(&self) -> usize {
        self.reader.dropped_bytes()
    }

    /// Get a reference to the underlying port.
    pub fn port(&self) -> &R {
        &self.port
    }

    /// Consume the source, returning the underlying port.
    pub fn into_inner(self) -> R {
        self.port
    }

    /// Refill the chunk buffer from the port.
    fn fill(&mut self) -> Result<(), InputError> {
        loop {
            match self.port.read(&mut self.chunk) {
                Ok(0) => {
                    if self.connected {
                        debug!("serial: end of stream");
                    }
                    self.connected = false;
                    return Err(InputError::Disconnected);
                }
                Ok(n) => {
                    self.pos = 0;
                    self.filled = n;
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!("serial: read failed: {e}");
                    return Err(InputError::Io);
                }
            }
        }
    }
}

impl<R: Read> MessageSource for SerialSource<R> {
    async fn receive(&mut self) -> Result<Message, InputError> {
        loop {
            let event = if self.reader.has_backlog() {
                self.reader.poll()
            } else {
                if self.pos == self.filled {
                    self.fill()?;
                }
                let byte = self.chunk[self.pos];
                self.pos += 1;
                self.reader.push_byte(byte)
            };

            match event {
                Ok(Some(packet)) => {
                    trace!(
                        "serial: frame type={:#04x} len={}",
                        packet.msg_type(),
                        packet.len()
                    );
                    return Ok(Message::from_packet(&packet)?);
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("serial: dropping frame: {e}");
                    return Err(e.into());
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_on;
    use gateboard_core::{Hello, OutputMode, SetOutput};
    use gbsp_proto::{ParseError, Serialize, MAX_FRAME_SIZE};
    use std::io::Cursor;

    fn frame(message: &Message) -> Vec<u8> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let len = message.serialize(&mut buf).unwrap();
        buf[..len].to_vec()
    }

    fn hello() -> Message {
        Message::from(Hello {
            firmware_version: 4,
        })
    }

    #[test]
    fn test_reads_frames_across_chunks() {
        let mut stream = b"boot noise\r\n".to_vec();
        stream.extend(frame(&hello()));
        // Long enough to straddle a chunk boundary
        for id in 0..8 {
            stream.extend(frame(&Message::from(SetOutput {
                output_id: id,
                mode: OutputMode::Enabled,
            })));
        }

        let mut source = SerialSource::new(Cursor::new(stream));
        assert_eq!(block_on(source.receive()), Ok(hello()));
        for id in 0..8 {
            assert_eq!(
                block_on(source.receive()),
                Ok(Message::from(SetOutput {
                    output_id: id,
                    mode: OutputMode::Enabled,
                }))
            );
        }
        assert_eq!(source.dropped_bytes(), 12);
        assert!(source.is_connected());
    }

    #[test]
    fn test_end_of_stream_disconnects() {
        let mut source = SerialSource::new(Cursor::new(frame(&Message::Ping)));
        assert_eq!(block_on(source.receive()), Ok(Message::Ping));
        assert_eq!(block_on(source.receive()), Err(InputError::Disconnected));
        assert!(!source.is_connected());
    }

    #[test]
    fn test_bad_checksum_then_recovers() {
        let mut bad = frame(&hello());
        let crc_at = bad.len() - 4;
        bad[crc_at] ^= 0xFF;
        bad.extend(frame(&Message::Ping));

        let mut source = SerialSource::new(Cursor::new(bad));
        assert_eq!(block_on(source.receive()), Err(InputError::Checksum));
        assert_eq!(block_on(source.receive()), Ok(Message::Ping));
    }

    #[test]
    fn test_bad_trailer_is_parse_error() {
        let mut bad = frame(&Message::Ping);
        let end = bad.len() - 1;
        bad[end] = b'X';

        let mut source = SerialSource::new(Cursor::new(bad));
        assert_eq!(
            block_on(source.receive()),
            Err(InputError::Parse(ParseError::Trailer))
        );
    }

    #[test]
    fn test_board_reset_mid_frame() {
        let partial = frame(&hello());
        let mut stream = partial[..15].to_vec();
        stream.extend(frame(&hello()));

        let mut source = SerialSource::new(Cursor::new(stream));
        assert!(block_on(source.receive()).is_err());
        assert_eq!(block_on(source.receive()), Ok(hello()));
        assert_eq!(block_on(source.receive()), Err(InputError::Disconnected));
    }
}

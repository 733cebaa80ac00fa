//! Streaming frame reader.
//!
//! Bytes from the transport are fed one at a time. The reader hunts for the
//! frame prefix, reads the 12-byte header, then reads exactly as many bytes
//! as the header declares before handing the frame to [`parse`].
//!
//! A rejected frame may hide the start of the next one (a board that resets
//! mid-frame starts over with a fresh prefix). Everything after the first
//! byte of a rejected frame is kept in a backlog and scanned again, so the
//! reader resynchronizes on the next prefix wherever it appears.

use crate::frame::{GBSP_PREFIX, HEADER_LEN, MAX_FRAME_SIZE, PREFIX_LEN};
use crate::packet::Packet;
use crate::parser::{parse, parse_header, ParseError};
use heapless::Deque;

/// Bytes held for rescanning: a rejected frame plus input that arrived while
/// an earlier backlog was being drained.
const BACKLOG_CAPACITY: usize = 2 * MAX_FRAME_SIZE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReaderState {
    HuntingPrefix,
    ReadingHeader,
    ReadingBody { frame_len: usize },
}

/// Byte-at-a-time GBSP frame reader.
///
/// After [`push_byte`](Self::push_byte) reports an error, bytes of the
/// rejected frame may still hold a complete frame. Call
/// [`poll`](Self::poll) while [`has_backlog`](Self::has_backlog) is true to
/// drain them without waiting for more input.
///
/// # Example
///
/// ```
/// use gbsp_proto::{FrameReader, MessageType, Packet, Serialize};
///
/// let mut buf = [0u8; 16];
/// Packet::from(MessageType::Ping).serialize(&mut buf).unwrap();
///
/// let mut reader = FrameReader::new();
/// let mut received = None;
/// for &byte in b"noise".iter().chain(buf.iter()) {
///     if let Ok(Some(packet)) = reader.push_byte(byte) {
///         received = Some(packet);
///     }
/// }
///
/// assert_eq!(received.unwrap().message_type(), Some(MessageType::Ping));
/// assert_eq!(reader.dropped_bytes(), 5);
/// ```
pub struct FrameReader {
    buffer: [u8; MAX_FRAME_SIZE],
    pos: usize,
    state: ReaderState,
    backlog: Deque<u8, BACKLOG_CAPACITY>,
    dropped: usize,
}

impl FrameReader {
    /// Create a reader waiting for a frame prefix.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: [0u8; MAX_FRAME_SIZE],
            pos: 0,
            state: ReaderState::HuntingPrefix,
            backlog: Deque::new(),
            dropped: 0,
        }
    }

    /// Discard any partial frame and backlog, and wait for the next prefix.
    pub fn reset(&mut self) {
        self.restart();
        self.backlog.clear();
    }

    /// True while no partial frame or backlog is buffered.
    #[inline]
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == ReaderState::HuntingPrefix && self.pos == 0 && self.backlog.is_empty()
    }

    /// True while bytes of a rejected frame are waiting to be rescanned.
    #[inline]
    #[must_use]
    pub fn has_backlog(&self) -> bool {
        !self.backlog.is_empty()
    }

    /// Number of bytes skipped while hunting for a prefix.
    #[inline]
    #[must_use]
    pub const fn dropped_bytes(&self) -> usize {
        self.dropped
    }

    /// Feed one byte.
    ///
    /// Returns `Ok(Some(packet))` when the byte completes a valid frame.
    /// While a backlog is pending the byte is queued behind it and the
    /// backlog is drained first.
    ///
    /// # Errors
    ///
    /// Returns the [`ParseError`] of a rejected header or frame. The reader
    /// is ready for the next byte either way.
    pub fn push_byte(&mut self, byte: u8) -> Result<Option<Packet>, ParseError> {
        if self.backlog.is_empty() {
            return self.step(byte);
        }
        if self.backlog.push_back(byte).is_err() {
            self.dropped += 1;
        }
        self.poll()
    }

    /// Rescan backlog bytes until a frame completes, a frame is rejected or
    /// the backlog is empty.
    ///
    /// Returns `Ok(None)` once the backlog is drained.
    ///
    /// # Errors
    ///
    /// Returns the [`ParseError`] of a frame rejected during the rescan.
    pub fn poll(&mut self) -> Result<Option<Packet>, ParseError> {
        while let Some(byte) = self.backlog.pop_front() {
            if let Some(packet) = self.step(byte)? {
                return Ok(Some(packet));
            }
        }
        Ok(None)
    }

    fn restart(&mut self) {
        self.pos = 0;
        self.state = ReaderState::HuntingPrefix;
    }

    /// Drop the first buffered byte and queue the rest for rescanning ahead
    /// of any pending backlog.
    fn reject(&mut self, err: ParseError) -> ParseError {
        for &byte in self.buffer[1..self.pos].iter().rev() {
            if self.backlog.push_front(byte).is_err() {
                self.dropped += 1;
            }
        }
        self.restart();
        err
    }

    fn step(&mut self, byte: u8) -> Result<Option<Packet>, ParseError> {
        match self.state {
            ReaderState::HuntingPrefix => {
                if byte == GBSP_PREFIX[self.pos] {
                    self.buffer[self.pos] = byte;
                    self.pos += 1;
                    if self.pos == PREFIX_LEN {
                        self.state = ReaderState::ReadingHeader;
                    }
                } else {
                    // The prefix has no repeated leading byte, so a mismatch
                    // can only restart on the current byte
                    self.dropped += self.pos;
                    if byte == GBSP_PREFIX[0] {
                        self.buffer[0] = byte;
                        self.pos = 1;
                    } else {
                        self.dropped += 1;
                        self.pos = 0;
                    }
                }
                Ok(None)
            }
            ReaderState::ReadingHeader => {
                self.buffer[self.pos] = byte;
                self.pos += 1;

                if self.pos == HEADER_LEN {
                    match parse_header(&self.buffer[..HEADER_LEN]) {
                        Ok(header) => {
                            self.state = ReaderState::ReadingBody {
                                frame_len: header.frame_len(),
                            };
                        }
                        Err(e) => return Err(self.reject(e)),
                    }
                }
                Ok(None)
            }
            ReaderState::ReadingBody { frame_len } => {
                self.buffer[self.pos] = byte;
                self.pos += 1;

                if self.pos < frame_len {
                    return Ok(None);
                }
                match parse(&self.buffer[..frame_len]) {
                    Ok(packet) => {
                        self.restart();
                        Ok(Some(packet))
                    }
                    Err(e) => Err(self.reject(e)),
                }
            }
        }
    }

    /// Pull bytes from `reader` until one frame has been decoded.
    ///
    /// # Errors
    ///
    /// - [`ReadError::Io`] if the underlying read fails
    /// - [`ReadError::Eof`] if the reader returns no more bytes
    /// - [`ReadError::Parse`] if a frame is rejected
    #[cfg(feature = "embedded-io")]
    pub fn read_from<R: embedded_io::Read>(
        &mut self,
        reader: &mut R,
    ) -> Result<Packet, ReadError<R::Error>> {
        let mut byte = [0u8; 1];
        loop {
            let event = if self.has_backlog() {
                self.poll()
            } else {
                if reader.read(&mut byte).map_err(ReadError::Io)? == 0 {
                    return Err(ReadError::Eof);
                }
                self.step(byte[0])
            };
            if let Some(packet) = event.map_err(ReadError::Parse)? {
                return Ok(packet);
            }
        }
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Error from [`FrameReader::read_from`].
#[cfg(feature = "embedded-io")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReadError<E> {
    /// The transport failed.
    Io(E),
    /// The transport has no more bytes.
    Eof,
    /// A frame was rejected.
    Parse(ParseError),
}

#[cfg(feature = "embedded-io")]
impl<E: core::fmt::Debug> core::fmt::Display for ReadError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "read failed: {e:?}"),
            Self::Eof => write!(f, "end of stream"),
            Self::Parse(e) => write!(f, "bad frame: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::catalog::MessageType;
    use crate::serialize::Serialize;
    use std::vec::Vec;

    fn encode(packet: &Packet) -> Vec<u8> {
        let mut buf = [0u8; MAX_FRAME_SIZE];
        let len = packet.serialize(&mut buf).unwrap();
        buf[..len].to_vec()
    }

    fn set_output(id: u8) -> Packet {
        let mut packet = Packet::from(MessageType::SetOutput);
        packet.append_u8(0x01, id).unwrap();
        packet.append_u8(0x02, 1).unwrap();
        packet
    }

    fn feed(reader: &mut FrameReader, bytes: &[u8]) -> Vec<Result<Packet, ParseError>> {
        bytes
            .iter()
            .filter_map(|&b| reader.push_byte(b).transpose())
            .collect()
    }

    #[test]
    fn test_single_frame() {
        let mut reader = FrameReader::new();
        let out = feed(&mut reader, &encode(&set_output(5)));
        assert_eq!(out, std::vec![Ok(set_output(5))]);
        assert!(reader.is_idle());
        assert_eq!(reader.dropped_bytes(), 0);
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut stream = encode(&set_output(1));
        stream.extend(encode(&Packet::from(MessageType::Ping)));
        stream.extend(encode(&set_output(2)));

        let mut reader = FrameReader::new();
        let out = feed(&mut reader, &stream);
        assert_eq!(
            out,
            std::vec![
                Ok(set_output(1)),
                Ok(Packet::from(MessageType::Ping)),
                Ok(set_output(2)),
            ]
        );
    }

    #[test]
    fn test_skips_noise_and_partial_prefix() {
        let mut stream = Vec::new();
        stream.extend_from_slice(b"xxGBSGBSP v");
        stream.extend(encode(&set_output(3)));

        let mut reader = FrameReader::new();
        let out = feed(&mut reader, &stream);
        assert_eq!(out, std::vec![Ok(set_output(3))]);
        assert_eq!(reader.dropped_bytes(), 11);
    }

    #[test]
    fn test_resyncs_after_checksum_error() {
        let mut bad = encode(&set_output(1));
        bad[13] ^= 0x40;

        let mut stream = bad;
        stream.extend(encode(&set_output(2)));

        let mut reader = FrameReader::new();
        let out = feed(&mut reader, &stream);
        assert_eq!(out, std::vec![Err(ParseError::Checksum), Ok(set_output(2))]);
    }

    #[test]
    fn test_rejects_oversized_header() {
        let mut header = Vec::new();
        header.extend_from_slice(GBSP_PREFIX);
        header.extend_from_slice(&[0x12, 0x00, 0xFF, 0x00]);

        let mut reader = FrameReader::new();
        let out = feed(&mut reader, &header);
        assert_eq!(out, std::vec![Err(ParseError::PayloadTooLong)]);
        assert!(reader.has_backlog());
        assert_eq!(reader.poll(), Ok(None));
        assert!(reader.is_idle());

        let out = feed(&mut reader, &encode(&set_output(4)));
        assert_eq!(out, std::vec![Ok(set_output(4))]);
    }

    #[test]
    fn test_crlf_in_payload_does_not_split_frame() {
        let mut packet = Packet::from(MessageType::AuthToken);
        packet.append_tag(0x02, b"ab\r\ncd").unwrap();

        let mut reader = FrameReader::new();
        let out = feed(&mut reader, &encode(&packet));
        assert_eq!(out, std::vec![Ok(packet)]);
    }

    #[test]
    fn test_reset_discards_partial_frame() {
        let frame = encode(&set_output(9));
        let mut reader = FrameReader::new();
        assert!(feed(&mut reader, &frame[..10]).is_empty());
        assert!(!reader.is_idle());

        reader.reset();
        assert!(reader.is_idle());
        assert_eq!(feed(&mut reader, &frame), std::vec![Ok(set_output(9))]);
    }

    #[test]
    fn test_truncated_frame_does_not_swallow_next() {
        let truncated = encode(&set_output(1));
        let mut stream = truncated[..14].to_vec();
        stream.extend(encode(&set_output(7)));

        let mut reader = FrameReader::new();
        let out = feed(&mut reader, &stream);
        assert_eq!(out.len(), 2);
        assert!(out[0].is_err());
        assert_eq!(out[1], Ok(set_output(7)));
        assert!(reader.is_idle());
    }

    #[test]
    fn test_frame_inside_rejected_body_is_recovered() {
        // Header claims 40 payload bytes; a whole PING sits inside them
        let mut stream = Vec::new();
        stream.extend_from_slice(GBSP_PREFIX);
        stream.extend_from_slice(&[0x12, 0x00, 40, 0x00]);
        stream.extend(encode(&Packet::from(MessageType::Ping)));
        stream.extend_from_slice(&[0u8; 28]);

        let mut reader = FrameReader::new();
        let out = feed(&mut reader, &stream);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_err());

        assert!(reader.has_backlog());
        assert_eq!(reader.poll(), Ok(Some(Packet::from(MessageType::Ping))));
        assert_eq!(reader.poll(), Ok(None));
        assert!(reader.is_idle());
    }

    #[test]
    fn test_reset_clears_backlog() {
        let mut stream = encode(&set_output(1))[..14].to_vec();
        stream.extend_from_slice(&encode(&set_output(2))[..8]);

        let mut reader = FrameReader::new();
        let out = feed(&mut reader, &stream);
        assert_eq!(out.len(), 1);
        assert!(reader.has_backlog());

        reader.reset();
        assert!(reader.is_idle());
    }

    #[cfg(feature = "embedded-io")]
    #[test]
    fn test_read_from_slice() {
        let mut stream = b"noise".to_vec();
        stream.extend(encode(&set_output(3)));
        let mut input: &[u8] = &stream;

        let mut reader = FrameReader::new();
        assert_eq!(reader.read_from(&mut input), Ok(set_output(3)));
        assert_eq!(reader.read_from(&mut input), Err(ReadError::Eof));
    }

    #[cfg(feature = "embedded-io")]
    #[test]
    fn test_read_from_resyncs_after_truncated_frame() {
        let mut stream = encode(&set_output(1))[..14].to_vec();
        stream.extend(encode(&set_output(5)));
        let mut input: &[u8] = &stream;

        let mut reader = FrameReader::new();
        assert!(matches!(
            reader.read_from(&mut input),
            Err(ReadError::Parse(_))
        ));
        assert_eq!(reader.read_from(&mut input), Ok(set_output(5)));
    }

    #[cfg(feature = "embedded-io")]
    #[test]
    fn test_read_error_display() {
        use std::string::ToString;

        let err: ReadError<()> = ReadError::Parse(ParseError::Checksum);
        assert!(err.to_string().starts_with("bad frame"));
        assert_eq!(ReadError::<()>::Eof.to_string(), "end of stream");
    }
}

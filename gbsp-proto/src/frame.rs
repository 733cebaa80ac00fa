//! Wire layout of a GBSP v1 frame.
//!
//! ```text
//! offset  size  field
//! 0       8     prefix "GBSP v1:"
//! 8       2     message type, u16 little-endian (high byte reserved, 0)
//! 10      2     payload length, u16 little-endian
//! 12      N     payload (TLV records)
//! 12+N    2     checksum, u16 little-endian
//! 14+N    2     trailer "\r\n"
//! ```

/// Literal prefix that opens every frame.
pub const GBSP_PREFIX: &[u8; 8] = b"GBSP v1:";

/// Literal trailer that closes every frame.
pub const GBSP_TRAILER: &[u8; 2] = b"\r\n";

/// Length of the prefix.
pub const PREFIX_LEN: usize = 8;

/// Length of the header: prefix, type and payload length.
pub const HEADER_LEN: usize = PREFIX_LEN + 2 + 2;

/// Length of the footer: checksum and trailer.
pub const FOOTER_LEN: usize = 2 + 2;

/// Bytes every frame carries besides its payload.
pub const FRAME_OVERHEAD: usize = HEADER_LEN + FOOTER_LEN;

/// Maximum number of payload bytes in a packet.
pub const PAYLOAD_CAPACITY: usize = 112;

/// Size of the largest possible frame.
pub const MAX_FRAME_SIZE: usize = FRAME_OVERHEAD + PAYLOAD_CAPACITY;

/// Size of a frame carrying `payload_len` payload bytes.
#[inline]
#[must_use]
pub const fn frame_len(payload_len: usize) -> usize {
    FRAME_OVERHEAD + payload_len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        assert_eq!(HEADER_LEN, 12);
        assert_eq!(FOOTER_LEN, 4);
        assert_eq!(FRAME_OVERHEAD, 16);
        assert_eq!(MAX_FRAME_SIZE, 128);
        assert_eq!(frame_len(6), 22);
        assert_eq!(GBSP_PREFIX.len(), PREFIX_LEN);
    }
}

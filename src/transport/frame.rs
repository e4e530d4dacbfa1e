//! Frame encoding and decoding.
//!
//! Wire format:
//! ```text
//! +--------+---------------------+--------+--------+
//! | Kind   | Payload             | CRC lo | CRC hi |
//! | 1 byte | 0..=61 bytes        | 1 byte | 1 byte |
//! +--------+---------------------+--------+--------+
//! ```
//!
//! The CRC covers kind and payload. A frame that fails the check is
//! dropped, never repaired.

use crate::core::{
    CHECKSUM_SIZE, CRC_INIT, CRC_POLY_REFLECTED, FrameError, KIND_SIZE, MAX_FRAME_LEN,
    MIN_FRAME_LEN,
};
use crate::handshake::{Message, MessageKind};

/// Fold one byte into a running CRC-16.
///
/// Reflected CCITT update, as used by common radio libraries
/// (CRC-16/MCRF4XX when started from [`CRC_INIT`]).
pub fn crc16_update(crc: u16, byte: u8) -> u16 {
    let mut crc = crc ^ u16::from(byte);
    for _ in 0..8 {
        if crc & 0x0001 != 0 {
            crc = (crc >> 1) ^ CRC_POLY_REFLECTED;
        } else {
            crc >>= 1;
        }
    }
    crc
}

/// CRC-16 of `bytes` from the standard initial value.
pub fn crc16(bytes: &[u8]) -> u16 {
    bytes.iter().fold(CRC_INIT, |crc, &b| crc16_update(crc, b))
}

/// An encoded frame in a fixed-size buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    buf: [u8; MAX_FRAME_LEN],
    len: usize,
}

impl Frame {
    /// Encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Encoded length.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Frames always carry at least kind and checksum.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("kind", &self.buf[0])
            .field("len", &self.len)
            .finish()
    }
}

/// Encode a message kind and payload into a checksummed frame.
pub fn encode(kind: MessageKind, payload: &[u8]) -> Result<Frame, FrameError> {
    let body_len = KIND_SIZE + payload.len();
    let total = body_len + CHECKSUM_SIZE;
    if total > MAX_FRAME_LEN {
        return Err(FrameError::TooLong {
            max: MAX_FRAME_LEN,
            actual: total,
        });
    }

    let mut buf = [0u8; MAX_FRAME_LEN];
    buf[0] = kind.as_byte();
    buf[KIND_SIZE..body_len].copy_from_slice(payload);
    let crc = crc16(&buf[..body_len]).to_le_bytes();
    buf[body_len] = crc[0];
    buf[body_len + 1] = crc[1];

    Ok(Frame { buf, len: total })
}

/// Verify and split a received frame.
pub fn decode(bytes: &[u8]) -> Result<Message, FrameError> {
    if bytes.len() < MIN_FRAME_LEN {
        return Err(FrameError::TooShort {
            expected: MIN_FRAME_LEN,
            actual: bytes.len(),
        });
    }

    let (body, trailer) = bytes.split_at(bytes.len() - CHECKSUM_SIZE);
    let expected = crc16(body);
    let actual = u16::from_le_bytes([trailer[0], trailer[1]]);
    if expected != actual {
        return Err(FrameError::ChecksumMismatch { expected, actual });
    }

    let kind = MessageKind::from_byte(body[0]).ok_or(FrameError::UnknownKind(body[0]))?;
    Ok(Message::new(kind, body[KIND_SIZE..].to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MAX_PAYLOAD_LEN;

    #[test]
    fn test_crc16_check_value() {
        assert_eq!(crc16(b"123456789"), 0x6F91);
        assert_eq!(crc16(&[]), CRC_INIT);
    }

    #[test]
    fn test_encode_layout() {
        let frame = encode(MessageKind::NonceA, &[0xAA, 0xBB]).unwrap();
        let bytes = frame.as_bytes();
        assert_eq!(bytes.len(), 5);
        assert_eq!(bytes[0], MessageKind::NonceA.as_byte());
        assert_eq!(&bytes[1..3], &[0xAA, 0xBB]);

        let crc = crc16(&bytes[..3]);
        assert_eq!(bytes[3], crc as u8);
        assert_eq!(bytes[4], (crc >> 8) as u8);
    }

    #[test]
    fn test_decode_valid() {
        let frame = encode(MessageKind::PublicKeyB, &[7u8; 32]).unwrap();
        let msg = decode(frame.as_bytes()).unwrap();
        assert_eq!(msg.kind, MessageKind::PublicKeyB);
        assert_eq!(msg.payload, vec![7u8; 32]);
    }

    #[test]
    fn test_encode_too_long() {
        let payload = [0u8; MAX_PAYLOAD_LEN + 1];
        let err = encode(MessageKind::ConfirmA, &payload).unwrap_err();
        assert_eq!(
            err,
            FrameError::TooLong {
                max: MAX_FRAME_LEN,
                actual: MAX_FRAME_LEN + 1
            }
        );
        assert!(encode(MessageKind::ConfirmA, &payload[..MAX_PAYLOAD_LEN]).is_ok());
    }

    #[test]
    fn test_decode_too_short() {
        assert!(matches!(
            decode(&[0x01, 0xFF]),
            Err(FrameError::TooShort { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_corrupted_trailer_rejected_for_every_length() {
        for len in 1..=MAX_PAYLOAD_LEN {
            let payload: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let frame = encode(MessageKind::NonceB, &payload).unwrap();

            for flip in [0x01u8, 0x80] {
                let mut lo = frame.as_bytes().to_vec();
                let n = lo.len();
                lo[n - 2] ^= flip;
                assert!(matches!(
                    decode(&lo),
                    Err(FrameError::ChecksumMismatch { .. })
                ));

                let mut hi = frame.as_bytes().to_vec();
                hi[n - 1] ^= flip;
                assert!(matches!(
                    decode(&hi),
                    Err(FrameError::ChecksumMismatch { .. })
                ));
            }
        }
    }

    #[test]
    fn test_corrupted_body_rejected() {
        let frame = encode(MessageKind::PublicKeyA, &[1, 2, 3, 4]).unwrap();
        let mut bytes = frame.as_bytes().to_vec();
        bytes[2] ^= 0x10;
        assert!(matches!(
            decode(&bytes),
            Err(FrameError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_unknown_kind() {
        let mut bytes = vec![0x7E, 0x00];
        let crc = crc16(&bytes).to_le_bytes();
        bytes.extend_from_slice(&crc);
        assert_eq!(decode(&bytes), Err(FrameError::UnknownKind(0x7E)));
    }
}

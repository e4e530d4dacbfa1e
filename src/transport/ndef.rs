//! Single-record NDEF wrapping.
//!
//! A frame travels as the payload of the first record of the tag's NDEF
//! message. Writers emit one short record of TNF "unknown" with no type and
//! no ID; readers accept any first record.

use crate::core::{
    NDEF_FLAG_IL, NDEF_FLAG_MB, NDEF_FLAG_ME, NDEF_FLAG_SR, NDEF_TNF_UNKNOWN, NdefError,
};

/// Wrap `frame` into a one-record NDEF message.
///
/// Only the short-record form is written, so `frame` is at most 255 bytes.
pub fn wrap(frame: &[u8]) -> Result<Vec<u8>, NdefError> {
    let len = u8::try_from(frame.len()).map_err(|_| NdefError::PayloadTooLong(frame.len()))?;
    let mut out = Vec::with_capacity(frame.len() + 3);
    out.push(NDEF_FLAG_MB | NDEF_FLAG_ME | NDEF_FLAG_SR | NDEF_TNF_UNKNOWN);
    out.push(0); // type length
    out.push(len);
    out.extend_from_slice(frame);
    Ok(out)
}

/// Payload of the first record in an NDEF message.
pub fn first_record_payload(image: &[u8]) -> Result<&[u8], NdefError> {
    let (&header, rest) = image.split_first().ok_or(NdefError::Empty)?;
    let mut cursor = Cursor { buf: rest };

    let type_len = cursor.byte()? as usize;
    let payload_len = if header & NDEF_FLAG_SR != 0 {
        cursor.byte()? as usize
    } else {
        let b = cursor.take(4)?;
        u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize
    };
    let id_len = if header & NDEF_FLAG_IL != 0 {
        cursor.byte()? as usize
    } else {
        0
    };

    cursor.take(type_len)?;
    cursor.take(id_len)?;
    cursor.take(payload_len)
}

struct Cursor<'a> {
    buf: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn byte(&mut self) -> Result<u8, NdefError> {
        Ok(self.take(1)?[0])
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], NdefError> {
        if self.buf.len() < n {
            return Err(NdefError::Truncated);
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }
}

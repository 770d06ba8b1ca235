//! Minimal protobuf wire helpers for the two messages this crate exchanges.
//!
//! Only varint (0) and length-delimited (2) fields are produced; fixed-width
//! fields are skipped on decode, groups are rejected.

use crate::core::IdentityError;

pub(crate) const WIRE_VARINT: u64 = 0;
pub(crate) const WIRE_FIXED64: u64 = 1;
pub(crate) const WIRE_LEN: u64 = 2;
pub(crate) const WIRE_FIXED32: u64 = 5;

pub(crate) fn put_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

pub(crate) fn put_bytes_field(out: &mut Vec<u8>, field: u64, bytes: &[u8]) {
    put_varint(out, (field << 3) | WIRE_LEN);
    put_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

pub(crate) fn put_varint_field(out: &mut Vec<u8>, field: u64, value: u64) {
    put_varint(out, (field << 3) | WIRE_VARINT);
    put_varint(out, value);
}

/// One decoded field.
pub(crate) enum Field<'a> {
    Varint(u64),
    Bytes(&'a [u8]),
    Skipped,
}

/// Iterator-style reader over protobuf fields.
pub(crate) struct Reader<'a> {
    input: &'a [u8],
}

impl<'a> Reader<'a> {
    pub(crate) fn new(input: &'a [u8]) -> Self {
        Self { input }
    }

    /// Next `(field number, value)`, or `None` at the end of input.
    pub(crate) fn next_field(&mut self) -> Result<Option<(u64, Field<'a>)>, IdentityError> {
        if self.input.is_empty() {
            return Ok(None);
        }
        let key = self.varint()?;
        let field = key >> 3;
        let value = match key & 0x07 {
            WIRE_VARINT => Field::Varint(self.varint()?),
            WIRE_LEN => {
                let len = usize::try_from(self.varint()?)
                    .map_err(|_| malformed("length overflows usize"))?;
                Field::Bytes(self.take(len)?)
            }
            WIRE_FIXED64 => {
                self.take(8)?;
                Field::Skipped
            }
            WIRE_FIXED32 => {
                self.take(4)?;
                Field::Skipped
            }
            other => return Err(malformed(&format!("unsupported wire type {other}"))),
        };
        Ok(Some((field, value)))
    }

    fn varint(&mut self) -> Result<u64, IdentityError> {
        let mut value = 0u64;
        for (i, byte) in self.input.iter().enumerate().take(10) {
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                self.input = &self.input[i + 1..];
                return Ok(value);
            }
        }
        Err(malformed("truncated or overlong varint"))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], IdentityError> {
        if self.input.len() < len {
            return Err(malformed("field runs past end of input"));
        }
        let (head, tail) = self.input.split_at(len);
        self.input = tail;
        Ok(head)
    }
}

pub(crate) fn malformed(reason: &str) -> IdentityError {
    IdentityError::MalformedPayload(reason.to_string())
}

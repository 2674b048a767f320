//! Incremental UTF-8 decoding and encoding.
//!
//! The decoder is fed one byte at a time by the reader so that multi-byte
//! sequences arriving across separate `read` calls still come out as whole
//! code points.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid UTF-8 lead byte 0x{byte:02x}")]
pub struct DecodeError {
    pub byte: u8,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("scalar value 0x{scalar:x} is outside the Unicode range")]
pub struct EncodeError {
    pub scalar: u32,
}

/// True for bytes of the form `10xxxxxx`.
pub fn is_continuation_byte(byte: u8) -> bool {
    byte & 0b1100_0000 == 0b1000_0000
}

/// Byte-at-a-time UTF-8 decoder.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: u32,
    bytes_required: u8,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte; yields a scalar exactly when it completes a sequence.
    ///
    /// An orphaned non-continuation byte inside a sequence resets the decoder
    /// and is re-fed as a fresh lead byte, so a torn sequence cannot stall
    /// later input.
    pub fn feed(&mut self, byte: u8) -> Result<Option<u32>, DecodeError> {
        if self.bytes_required == 0 {
            if byte & 0b1000_0000 == 0 {
                return Ok(Some(u32::from(byte)));
            } else if byte & 0b1110_0000 == 0b1100_0000 {
                self.pending = u32::from(byte & 0b0001_1111);
                self.bytes_required = 1;
            } else if byte & 0b1111_0000 == 0b1110_0000 {
                self.pending = u32::from(byte & 0b0000_1111);
                self.bytes_required = 2;
            } else if byte & 0b1111_1000 == 0b1111_0000 {
                self.pending = u32::from(byte & 0b0000_0111);
                self.bytes_required = 3;
            } else {
                return Err(DecodeError { byte });
            }

            return Ok(None);
        }

        if !is_continuation_byte(byte) {
            self.pending = 0;
            self.bytes_required = 0;
            return self.feed(byte);
        }

        self.pending = (self.pending << 6) | u32::from(byte & 0b0011_1111);
        self.bytes_required -= 1;
        if self.bytes_required == 0 {
            return Ok(Some(self.pending));
        }

        Ok(None)
    }
}

/// Decode a byte slice, dropping bytes that do not form valid scalars.
pub fn decode_utf8(bytes: &[u8]) -> String {
    let mut decoder = Utf8Decoder::new();
    let mut out = String::with_capacity(bytes.len());
    for &byte in bytes {
        if let Ok(Some(scalar)) = decoder.feed(byte) {
            if let Some(ch) = char::from_u32(scalar) {
                out.push(ch);
            }
        }
    }
    out
}

/// Encode a code-point slice as UTF-8 bytes.
pub fn encode_utf8(chars: &[char]) -> Vec<u8> {
    let mut out = Vec::with_capacity(chars.len());
    for &ch in chars {
        // A `char` is always a valid scalar, so this cannot fail.
        let _ = encode_scalar(u32::from(ch), &mut out);
    }
    out
}

/// Encode one scalar, appending its UTF-8 bytes to `out`.
pub fn encode_scalar(scalar: u32, out: &mut Vec<u8>) -> Result<(), EncodeError> {
    if scalar < 0x80 {
        out.push(scalar as u8);
    } else if scalar < 0x0800 {
        out.push(0b1100_0000 | ((scalar >> 6) & 0b0001_1111) as u8);
        out.push(0b1000_0000 | (scalar & 0b0011_1111) as u8);
    } else if scalar < 0x01_0000 {
        out.push(0b1110_0000 | ((scalar >> 12) & 0b0000_1111) as u8);
        out.push(0b1000_0000 | ((scalar >> 6) & 0b0011_1111) as u8);
        out.push(0b1000_0000 | (scalar & 0b0011_1111) as u8);
    } else if scalar <= 0x10_FFFF {
        out.push(0b1111_0000 | ((scalar >> 18) & 0b0000_0111) as u8);
        out.push(0b1000_0000 | ((scalar >> 12) & 0b0011_1111) as u8);
        out.push(0b1000_0000 | ((scalar >> 6) & 0b0011_1111) as u8);
        out.push(0b1000_0000 | (scalar & 0b0011_1111) as u8);
    } else {
        return Err(EncodeError { scalar });
    }

    Ok(())
}

//! Binary codecs for the resolution record stream.
//!
//! ## Primitive Encoding
//!
//! | Value | Encoding |
//! |-------|----------|
//! | byte, tag | 1 byte |
//! | bool | 1 byte, `0` or `1` |
//! | small int (`u32`) | unsigned LEB128 |
//! | long (`i64`) | zig-zag LEB128, so `-1` costs a single byte |
//! | string | small int byte length + UTF-8 bytes |
//! | nullable string | bool presence flag + string |
//!
//! Entity codecs build on these primitives. Every tagged entity writes a
//! one-byte discriminant first and fails fast on an unknown tag.

pub mod identifier;
pub mod reason;
pub mod dedup;
pub mod variant;

use std::io::{self, Read, Write};

pub use dedup::{DedupReader, DedupWriter, Reference};
pub use variant::{ResolvedVariantReader, ResolvedVariantWriter};

/// Error raised while encoding or decoding.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The stream ended in the middle of a value.
    #[error("Unexpected end of stream at offset {0}")]
    Truncated(u64),
    /// A discriminant tag is not known to this codec.
    #[error("Unknown {kind} tag {tag}")]
    UnknownTag {
        /// What was being decoded.
        kind: &'static str,
        /// The offending tag.
        tag: u8,
    },
    /// The value cannot be represented by the current encoding.
    #[error("Unsupported encoding: {0}")]
    Unsupported(String),
    /// The bytes decode to an impossible value.
    #[error("Malformed stream: {0}")]
    Malformed(String),
}

/// Writes primitive values.
#[derive(Debug)]
pub struct Encoder<W: Write> {
    inner: W,
}

impl<W: Write> Encoder<W> {
    /// Wrap a byte sink.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Unwrap the byte sink.
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Write a raw byte.
    pub fn write_byte(&mut self, value: u8) -> Result<(), CodecError> {
        self.inner.write_all(&[value])?;
        Ok(())
    }

    /// Write a boolean.
    pub fn write_bool(&mut self, value: bool) -> Result<(), CodecError> {
        self.write_byte(value as u8)
    }

    /// Write an unsigned LEB128 integer.
    pub fn write_small_int(&mut self, value: u32) -> Result<(), CodecError> {
        self.write_varint(u64::from(value))
    }

    /// Write a length as a small int.
    pub fn write_len(&mut self, len: usize) -> Result<(), CodecError> {
        let len = u32::try_from(len)
            .map_err(|_| CodecError::Unsupported(format!("length {} exceeds u32", len)))?;
        self.write_small_int(len)
    }

    /// Write a zig-zag LEB128 long.
    pub fn write_long(&mut self, value: i64) -> Result<(), CodecError> {
        self.write_varint(((value << 1) ^ (value >> 63)) as u64)
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
        self.write_len(value.len())?;
        self.inner.write_all(value.as_bytes())?;
        Ok(())
    }

    /// Write an optional string.
    pub fn write_nullable_string(&mut self, value: Option<&str>) -> Result<(), CodecError> {
        match value {
            Some(value) => {
                self.write_bool(true)?;
                self.write_string(value)
            }
            None => self.write_bool(false),
        }
    }

    fn write_varint(&mut self, mut value: u64) -> Result<(), CodecError> {
        let mut buf = [0u8; 10];
        let mut len = 0;
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                buf[len] = byte;
                len += 1;
                break;
            }
            buf[len] = byte | 0x80;
            len += 1;
        }
        self.inner.write_all(&buf[..len])?;
        Ok(())
    }
}

/// Reads primitive values, tracking the offset for diagnostics.
#[derive(Debug)]
pub struct Decoder<R: Read> {
    inner: R,
    offset: u64,
}

impl<R: Read> Decoder<R> {
    /// Wrap a byte source.
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), CodecError> {
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.offset += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(CodecError::Truncated(self.offset))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read a raw byte.
    pub fn read_byte(&mut self) -> Result<u8, CodecError> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Read a raw byte, or `None` at a clean end of stream.
    pub fn read_byte_or_eof(&mut self) -> Result<Option<u8>, CodecError> {
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.offset += 1;
                    return Ok(Some(buf[0]));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Read a boolean.
    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        match self.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::Malformed(format!(
                "invalid boolean byte {} at offset {}",
                other,
                self.offset - 1
            ))),
        }
    }

    /// Read an unsigned LEB128 integer.
    pub fn read_small_int(&mut self) -> Result<u32, CodecError> {
        let value = self.read_varint()?;
        u32::try_from(value)
            .map_err(|_| CodecError::Malformed(format!("small int {} out of range", value)))
    }

    /// Read a length written by [`Encoder::write_len`].
    pub fn read_len(&mut self) -> Result<usize, CodecError> {
        Ok(self.read_small_int()? as usize)
    }

    /// Read a zig-zag LEB128 long.
    pub fn read_long(&mut self) -> Result<i64, CodecError> {
        let raw = self.read_varint()?;
        Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let len = self.read_len()?;
        // A corrupt length must not drive the allocation.
        let mut bytes = Vec::with_capacity(len.min(4096));
        let read = (&mut self.inner).take(len as u64).read_to_end(&mut bytes)?;
        if read < len {
            return Err(CodecError::Truncated(self.offset));
        }
        self.offset += len as u64;
        String::from_utf8(bytes)
            .map_err(|e| CodecError::Malformed(format!("invalid UTF-8 string: {}", e)))
    }

    /// Read an optional string.
    pub fn read_nullable_string(&mut self) -> Result<Option<String>, CodecError> {
        if self.read_bool()? {
            Ok(Some(self.read_string()?))
        } else {
            Ok(None)
        }
    }

    fn read_varint(&mut self) -> Result<u64, CodecError> {
        let mut value = 0u64;
        for shift in (0..70).step_by(7) {
            let byte = self.read_byte()?;
            if shift == 63 && byte > 1 {
                break;
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(CodecError::Malformed(format!(
            "varint overflow at offset {}",
            self.offset
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(f: impl FnOnce(&mut Encoder<&mut Vec<u8>>) -> Result<(), CodecError>) -> Vec<u8> {
        let mut bytes = Vec::new();
        f(&mut Encoder::new(&mut bytes)).unwrap();
        bytes
    }

    #[test]
    fn test_long_encoding_sizes() {
        assert_eq!(encode(|e| e.write_long(-1)), vec![0x01]);
        assert_eq!(encode(|e| e.write_long(0)), vec![0x00]);
        assert_eq!(encode(|e| e.write_long(63)).len(), 1);
        assert_eq!(encode(|e| e.write_long(64)).len(), 2);
        assert_eq!(encode(|e| e.write_long(i64::MIN)).len(), 10);
    }

    #[test]
    fn test_primitive_round_trip() {
        let bytes = encode(|e| {
            e.write_byte(7)?;
            e.write_bool(true)?;
            e.write_small_int(300)?;
            e.write_long(i64::MAX)?;
            e.write_long(i64::MIN)?;
            e.write_string("ünïcode")?;
            e.write_nullable_string(None)?;
            e.write_nullable_string(Some(""))
        });

        let mut d = Decoder::new(Cursor::new(bytes));
        assert_eq!(d.read_byte().unwrap(), 7);
        assert!(d.read_bool().unwrap());
        assert_eq!(d.read_small_int().unwrap(), 300);
        assert_eq!(d.read_long().unwrap(), i64::MAX);
        assert_eq!(d.read_long().unwrap(), i64::MIN);
        assert_eq!(d.read_string().unwrap(), "ünïcode");
        assert_eq!(d.read_nullable_string().unwrap(), None);
        assert_eq!(d.read_nullable_string().unwrap(), Some(String::new()));
        assert_eq!(d.read_byte_or_eof().unwrap(), None);
    }

    #[test]
    fn test_truncated_string_reports_offset() {
        let mut bytes = encode(|e| e.write_string("truncated"));
        bytes.truncate(4);

        let mut d = Decoder::new(Cursor::new(bytes));
        match d.read_string() {
            Err(CodecError::Truncated(offset)) => assert_eq!(offset, 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_bool_is_malformed() {
        let mut d = Decoder::new(Cursor::new(vec![2u8]));
        assert!(matches!(d.read_bool(), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_varint_overflow_is_malformed() {
        let mut d = Decoder::new(Cursor::new(vec![0xffu8; 11]));
        assert!(matches!(d.read_long(), Err(CodecError::Malformed(_))));
    }
}

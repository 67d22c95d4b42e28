//! Byte Writer / Reader
//!
//! Primitive encoders for the chain's binary ABI: fixed-width little-endian
//! integers, LEB128-style variable-length unsigned integers and
//! length-prefixed byte sequences.

use crate::error::{ErrorCode, YxError};

/// Low-level codec failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Value {value} does not fit in {field}")]
    OutOfRange { field: &'static str, value: u128 },

    #[error("Unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("Varint overflows 64 bits")]
    VarintOverflow,

    #[error("Invalid UTF-8 in string field")]
    InvalidUtf8,

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Invalid asset: {0}")]
    InvalidAsset(String),
}

pub type CodecResult<T> = Result<T, CodecError>;

impl From<CodecError> for YxError {
    fn from(e: CodecError) -> Self {
        let code = match e {
            CodecError::InvalidName(_) => ErrorCode::InvalidName,
            CodecError::InvalidSymbol(_) | CodecError::InvalidAsset(_) => ErrorCode::InvalidAsset,
            _ => ErrorCode::EncodingError,
        };
        YxError::new(code, e.to_string())
    }
}

/// Growable output buffer
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i8(&mut self, v: i8) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Variable-length unsigned integer: 7 bits per byte, low group first,
    /// continuation bit on every byte but the last.
    pub fn put_varint(&mut self, mut v: u64) {
        loop {
            let mut byte = (v & 0x7f) as u8;
            v >>= 7;
            if v != 0 {
                byte |= 0x80;
            }
            self.buf.push(byte);
            if v == 0 {
                break;
            }
        }
    }

    /// `varuint32` fields reject values that do not fit 32 bits
    pub fn put_varuint32(&mut self, v: u64) -> CodecResult<()> {
        if v > u32::MAX as u64 {
            return Err(CodecError::OutOfRange {
                field: "varuint32",
                value: v as u128,
            });
        }
        self.put_varint(v);
        Ok(())
    }

    /// Length-prefixed raw bytes
    pub fn put_bytes(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.put_varuint32(bytes.len() as u64)?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    pub fn put_string(&mut self, s: &str) -> CodecResult<()> {
        self.put_bytes(s.as_bytes())
    }

    /// Raw bytes with no length prefix
    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}

/// Cursor over encoded bytes
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEof {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut arr = [0u8; N];
        arr.copy_from_slice(self.take(N)?);
        Ok(arr)
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> CodecResult<u16> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> CodecResult<u32> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn read_u64(&mut self) -> CodecResult<u64> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    pub fn read_i64(&mut self) -> CodecResult<i64> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    pub fn read_varint(&mut self) -> CodecResult<u64> {
        let mut value: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            let group = (byte & 0x7f) as u64;
            if shift >= 64 || (shift == 63 && group > 1) {
                return Err(CodecError::VarintOverflow);
            }
            value |= group << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    pub fn read_bytes(&mut self) -> CodecResult<&'a [u8]> {
        let len = self.read_varint()? as usize;
        self.take(len)
    }

    pub fn read_string(&mut self) -> CodecResult<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }
}

/// Encode a single varint into a fresh buffer
pub fn encode_varint(v: u64) -> Vec<u8> {
    let mut writer = ByteWriter::with_capacity(10);
    writer.put_varint(v);
    writer.into_bytes()
}

/// Decode a varint from the front of `bytes`
pub fn decode_varint(bytes: &[u8]) -> CodecResult<u64> {
    ByteReader::new(bytes).read_varint()
}

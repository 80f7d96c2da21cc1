//! Byte buffer codec
//!
//! Primitive encoding of fixed-width scalars and length-prefixed strings
//! into a contiguous byte sequence, and cursor-based decoding back out.
//!
//! Writing and reading are separate types: a [`ByteWriter`] can only
//! append and a [`ByteReader`] can only consume, so a mode mismatch is a
//! compile error rather than a runtime assertion.
//!
//! All scalars are little-endian with no alignment padding. The format
//! carries no byte-order tag, so files are portable between little- and
//! big-endian hosts only because the encoding is pinned here.

use thiserror::Error;

/// Errors produced while decoding a byte buffer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A read would run past the end of the buffer
    #[error("read of {wanted} bytes at offset {offset} is out of range (buffer is {len} bytes)")]
    OutOfRange {
        offset: usize,
        wanted: usize,
        len: usize,
    },

    /// A boolean byte held something other than 0 or 1
    #[error("invalid boolean byte {0:#04x}")]
    InvalidBool(u8),

    /// A length-prefixed string was not valid UTF-8
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
}

/// A fixed-width value with a stable binary representation
pub trait Scalar: Sized {
    /// Encoded width in bytes
    const SIZE: usize;

    /// Append the encoded value to `out`
    fn put(self, out: &mut Vec<u8>);

    /// Decode from exactly [`Self::SIZE`] bytes
    fn take(bytes: &[u8]) -> Result<Self, CodecError>;
}

macro_rules! impl_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn put(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn take(bytes: &[u8]) -> Result<Self, CodecError> {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    Ok(<$ty>::from_le_bytes(buf))
                }
            }
        )*
    };
}

impl_scalar!(u8, u16, u32, u64, i32, i64, f32, f64);

impl Scalar for bool {
    const SIZE: usize = 1;

    fn put(self, out: &mut Vec<u8>) {
        out.push(u8::from(self));
    }

    fn take(bytes: &[u8]) -> Result<Self, CodecError> {
        match bytes[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidBool(other)),
        }
    }
}

/// Append-only encoder
#[derive(Debug, Default)]
pub struct ByteWriter {
    data: Vec<u8>,
}

impl ByteWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty writer with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Append a scalar value
    pub fn write<T: Scalar>(&mut self, value: T) -> &mut Self {
        value.put(&mut self.data);
        self
    }

    /// Append a string as a u64 byte length followed by the raw bytes
    pub fn write_str(&mut self, value: &str) -> &mut Self {
        self.write(value.len() as u64);
        self.data.extend_from_slice(value.as_bytes());
        self
    }

    /// Number of bytes written so far
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Take ownership of the encoded bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Cursor over a previously loaded byte sequence
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    /// Start reading at the beginning of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Current cursor position
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left after the cursor
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn take_bytes(&mut self, wanted: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .offset
            .checked_add(wanted)
            .filter(|end| *end <= self.data.len())
            .ok_or(CodecError::OutOfRange {
                offset: self.offset,
                wanted,
                len: self.data.len(),
            })?;
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    /// Decode the next scalar value
    pub fn read<T: Scalar>(&mut self) -> Result<T, CodecError> {
        let bytes = self.take_bytes(T::SIZE)?;
        T::take(bytes)
    }

    /// Decode the next length-prefixed string
    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let offset = self.offset;
        let len = self.read::<u64>()?;
        let len = usize::try_from(len).map_err(|_| CodecError::OutOfRange {
            offset,
            wanted: usize::MAX,
            len: self.data.len(),
        })?;
        let bytes = self.take_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    /// Advance the cursor without decoding
    pub fn skip(&mut self, count: usize) -> Result<(), CodecError> {
        self.take_bytes(count).map(|_| ())
    }
}

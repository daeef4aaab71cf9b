//! Little-endian wire primitives and encoded sizes

use std::io::{self, Read, Write};

use crate::error::{Error, Result};
use crate::tensor::TensorDescriptor;
use crate::value::{Array, Value, ValueKind};

/// Upper bound on speculative preallocation for counts read from a stream
const PREALLOC_LIMIT: u64 = 4096;

/// Encoded size of a length-prefixed string
pub(crate) fn string_len(s: &str) -> u64 {
    8 + s.len() as u64
}

/// Encoded size of a value payload, excluding its kind tag
pub(crate) fn value_len(value: &Value) -> u64 {
    match value {
        Value::String(s) => string_len(s),
        // element tag + element count + elements
        Value::Array(array) => 4 + 8 + array_items_len(array),
        scalar => scalar.kind().scalar_width().unwrap_or(0),
    }
}

fn array_items_len(array: &Array) -> u64 {
    match array {
        Array::String(items) => items.iter().map(|s| string_len(s)).sum(),
        other => other.len() as u64 * other.element_kind().scalar_width().unwrap_or(0),
    }
}

/// Encoded size of one metadata entry
pub(crate) fn metadata_entry_len(key: &str, value: &Value) -> u64 {
    string_len(key) + 4 + value_len(value)
}

/// Encoded size of one tensor descriptor
pub(crate) fn descriptor_len(descriptor: &TensorDescriptor) -> u64 {
    // name + rank + dims + element type + offset
    string_len(&descriptor.name) + 4 + 8 * descriptor.rank() as u64 + 4 + 8
}

/// Byte sink that tracks how much has been written
pub(crate) struct WireWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> WireWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub(crate) fn position(&self) -> u64 {
        self.written
    }

    pub(crate) fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(Error::Io)
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes).map_err(Error::Io)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    pub(crate) fn write_zeros(&mut self, mut count: u64) -> Result<()> {
        const ZEROS: [u8; 64] = [0u8; 64];
        while count > 0 {
            let n = count.min(ZEROS.len() as u64);
            self.write_bytes(&ZEROS[..n as usize])?;
            count -= n;
        }
        Ok(())
    }

    pub(crate) fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub(crate) fn write_u64(&mut self, v: u64) -> Result<()> {
        self.write_bytes(&v.to_le_bytes())
    }

    pub(crate) fn write_string(&mut self, s: &str) -> Result<()> {
        self.write_u64(s.len() as u64)?;
        self.write_bytes(s.as_bytes())
    }

    /// Write a value payload (the caller writes the kind tag)
    pub(crate) fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::UInt8(v) => self.write_bytes(&v.to_le_bytes()),
            Value::Int8(v) => self.write_bytes(&v.to_le_bytes()),
            Value::UInt16(v) => self.write_bytes(&v.to_le_bytes()),
            Value::Int16(v) => self.write_bytes(&v.to_le_bytes()),
            Value::UInt32(v) => self.write_bytes(&v.to_le_bytes()),
            Value::Int32(v) => self.write_bytes(&v.to_le_bytes()),
            Value::Float32(v) => self.write_bytes(&v.to_le_bytes()),
            Value::Bool(v) => self.write_bytes(&[u8::from(*v)]),
            Value::String(s) => self.write_string(s),
            Value::UInt64(v) => self.write_bytes(&v.to_le_bytes()),
            Value::Int64(v) => self.write_bytes(&v.to_le_bytes()),
            Value::Float64(v) => self.write_bytes(&v.to_le_bytes()),
            Value::Array(array) => {
                self.write_u32(array.element_kind().tag())?;
                self.write_u64(array.len() as u64)?;
                self.write_array_items(array)
            }
        }
    }

    fn write_array_items(&mut self, array: &Array) -> Result<()> {
        match array {
            Array::UInt8(items) => self.write_bytes(items),
            Array::Int8(items) => self.write_le(items, i8::to_le_bytes),
            Array::UInt16(items) => self.write_le(items, u16::to_le_bytes),
            Array::Int16(items) => self.write_le(items, i16::to_le_bytes),
            Array::UInt32(items) => self.write_le(items, u32::to_le_bytes),
            Array::Int32(items) => self.write_le(items, i32::to_le_bytes),
            Array::Float32(items) => self.write_le(items, f32::to_le_bytes),
            Array::Bool(items) => items.iter().try_for_each(|v| self.write_bytes(&[u8::from(*v)])),
            Array::String(items) => items.iter().try_for_each(|s| self.write_string(s)),
            Array::UInt64(items) => self.write_le(items, u64::to_le_bytes),
            Array::Int64(items) => self.write_le(items, i64::to_le_bytes),
            Array::Float64(items) => self.write_le(items, f64::to_le_bytes),
        }
    }

    fn write_le<T: Copy, const N: usize>(
        &mut self,
        items: &[T],
        to_le: fn(T) -> [u8; N],
    ) -> Result<()> {
        items.iter().try_for_each(|&v| self.write_bytes(&to_le(v)))
    }
}

/// Byte source that tracks how much has been consumed
pub(crate) struct WireReader<R> {
    inner: R,
    pos: u64,
}

macro_rules! read_le {
    ($($fn_name:ident => $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name(&mut self, what: &str) -> Result<$ty> {
                Ok(<$ty>::from_le_bytes(self.read_array(what)?))
            }
        )*
    };
}

impl<R: Read> WireReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self { inner, pos: 0 }
    }

    pub(crate) fn position(&self) -> u64 {
        self.pos
    }

    fn eof(&self, err: io::Error, what: &str) -> Error {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof(format!("reading {what} at offset {}", self.pos))
        } else {
            Error::Io(err)
        }
    }

    pub(crate) fn read_array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner
            .read_exact(&mut buf)
            .map_err(|e| self.eof(e, what))?;
        self.pos += N as u64;
        Ok(buf)
    }

    read_le! {
        read_u8 => u8,
        read_i8 => i8,
        read_u16 => u16,
        read_i16 => i16,
        read_u32 => u32,
        read_i32 => i32,
        read_f32 => f32,
        read_u64 => u64,
        read_i64 => i64,
        read_f64 => f64,
    }

    pub(crate) fn read_bool(&mut self, what: &str) -> Result<bool> {
        match self.read_u8(what)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::CorruptHeader(format!(
                "invalid bool byte {other} in {what} at offset {}",
                self.pos - 1
            ))),
        }
    }

    /// Read a length-prefixed UTF-8 string
    ///
    /// The declared length is never preallocated, so a corrupt length runs
    /// into the end of the stream instead of exhausting memory.
    pub(crate) fn read_string(&mut self, what: &str) -> Result<String> {
        let len = self.read_u64(what)?;
        let mut buf = Vec::with_capacity(len.min(PREALLOC_LIMIT) as usize);
        let read = Read::take(&mut self.inner, len).read_to_end(&mut buf);
        let got = read.map_err(|e| self.eof(e, what))?;
        self.pos += got as u64;
        if (got as u64) < len {
            return Err(Error::UnexpectedEof(format!(
                "reading {what}: declared {len} bytes, stream ended after {got}"
            )));
        }
        String::from_utf8(buf)
            .map_err(|_| Error::CorruptHeader(format!("{what} is not valid UTF-8")))
    }

    /// Read a value payload of the given kind
    pub(crate) fn read_value(&mut self, kind: ValueKind) -> Result<Value> {
        const WHAT: &str = "metadata value";
        Ok(match kind {
            ValueKind::UInt8 => Value::UInt8(self.read_u8(WHAT)?),
            ValueKind::Int8 => Value::Int8(self.read_i8(WHAT)?),
            ValueKind::UInt16 => Value::UInt16(self.read_u16(WHAT)?),
            ValueKind::Int16 => Value::Int16(self.read_i16(WHAT)?),
            ValueKind::UInt32 => Value::UInt32(self.read_u32(WHAT)?),
            ValueKind::Int32 => Value::Int32(self.read_i32(WHAT)?),
            ValueKind::Float32 => Value::Float32(self.read_f32(WHAT)?),
            ValueKind::Bool => Value::Bool(self.read_bool(WHAT)?),
            ValueKind::String => Value::String(self.read_string(WHAT)?),
            ValueKind::UInt64 => Value::UInt64(self.read_u64(WHAT)?),
            ValueKind::Int64 => Value::Int64(self.read_i64(WHAT)?),
            ValueKind::Float64 => Value::Float64(self.read_f64(WHAT)?),
            ValueKind::Array => Value::Array(self.read_array_value()?),
        })
    }

    fn read_array_value(&mut self) -> Result<Array> {
        const WHAT: &str = "array element";
        let tag = self.read_u32("array element kind")?;
        let count = self.read_u64("array length")?;
        Ok(match ValueKind::from_tag(tag)? {
            ValueKind::UInt8 => Array::UInt8(self.read_items(count, |r| r.read_u8(WHAT))?),
            ValueKind::Int8 => Array::Int8(self.read_items(count, |r| r.read_i8(WHAT))?),
            ValueKind::UInt16 => Array::UInt16(self.read_items(count, |r| r.read_u16(WHAT))?),
            ValueKind::Int16 => Array::Int16(self.read_items(count, |r| r.read_i16(WHAT))?),
            ValueKind::UInt32 => Array::UInt32(self.read_items(count, |r| r.read_u32(WHAT))?),
            ValueKind::Int32 => Array::Int32(self.read_items(count, |r| r.read_i32(WHAT))?),
            ValueKind::Float32 => Array::Float32(self.read_items(count, |r| r.read_f32(WHAT))?),
            ValueKind::Bool => Array::Bool(self.read_items(count, |r| r.read_bool(WHAT))?),
            ValueKind::String => Array::String(self.read_items(count, |r| r.read_string(WHAT))?),
            ValueKind::UInt64 => Array::UInt64(self.read_items(count, |r| r.read_u64(WHAT))?),
            ValueKind::Int64 => Array::Int64(self.read_items(count, |r| r.read_i64(WHAT))?),
            ValueKind::Float64 => Array::Float64(self.read_items(count, |r| r.read_f64(WHAT))?),
            // nested arrays are not part of the format
            ValueKind::Array => return Err(Error::UnknownValueKind(tag)),
        })
    }

    fn read_items<T>(
        &mut self,
        count: u64,
        mut read: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::with_capacity(count.min(PREALLOC_LIMIT) as usize);
        for _ in 0..count {
            items.push(read(self)?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::ElementType;
    use std::io::Cursor;

    fn encode(value: &Value) -> Vec<u8> {
        let mut w = WireWriter::new(Vec::new());
        w.write_value(value).unwrap();
        assert_eq!(w.position(), value_len(value));
        w.inner
    }

    #[test]
    fn test_value_lengths_match_encoding() {
        for value in [
            Value::UInt8(1),
            Value::Int16(-2),
            Value::Float64(0.5),
            Value::Bool(true),
            Value::from("hello world"),
            Value::from(vec![1i16, 2, 3, 4]),
            Value::from(vec!["hello", "world", "!"]),
            Value::from(Vec::<u64>::new()),
        ] {
            let bytes = encode(&value);
            let mut r = WireReader::new(Cursor::new(&bytes));
            assert_eq!(r.read_value(value.kind()).unwrap(), value);
            assert_eq!(r.position(), bytes.len() as u64);
        }
    }

    #[test]
    fn test_string_encoding() {
        let mut w = WireWriter::new(Vec::new());
        w.write_string("abc").unwrap();
        assert_eq!(w.inner, vec![3, 0, 0, 0, 0, 0, 0, 0, b'a', b'b', b'c']);
    }

    #[test]
    fn test_truncated_string_is_eof() {
        let mut bytes = 100u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"short");
        let mut r = WireReader::new(Cursor::new(bytes));
        assert!(matches!(r.read_string("key"), Err(Error::UnexpectedEof(_))));
    }

    #[test]
    fn test_invalid_utf8_is_corrupt() {
        let mut bytes = 2u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        let mut r = WireReader::new(Cursor::new(bytes));
        assert!(matches!(r.read_string("key"), Err(Error::CorruptHeader(_))));
    }

    #[test]
    fn test_bad_bool_is_corrupt() {
        let mut r = WireReader::new(Cursor::new(vec![2u8]));
        assert!(matches!(r.read_value(ValueKind::Bool), Err(Error::CorruptHeader(_))));
    }

    #[test]
    fn test_nested_array_rejected() {
        let mut bytes = ValueKind::Array.tag().to_le_bytes().to_vec();
        bytes.extend_from_slice(&1u64.to_le_bytes());
        let mut r = WireReader::new(Cursor::new(bytes));
        assert!(matches!(
            r.read_value(ValueKind::Array),
            Err(Error::UnknownValueKind(9))
        ));
    }

    #[test]
    fn test_huge_array_count_hits_eof() {
        let mut bytes = ValueKind::UInt32.tag().to_le_bytes().to_vec();
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend_from_slice(&[1, 0, 0, 0]);
        let mut r = WireReader::new(Cursor::new(bytes));
        assert!(matches!(
            r.read_value(ValueKind::Array),
            Err(Error::UnexpectedEof(_))
        ));
    }

    #[test]
    fn test_descriptor_len() {
        let desc = TensorDescriptor::new("t0", ElementType::F32, &[3, 2]);
        // 8 + 2 name, 4 rank, 16 dims, 4 type, 8 offset
        assert_eq!(descriptor_len(&desc), 42);
    }

    #[test]
    fn test_write_zeros() {
        let mut w = WireWriter::new(Vec::new());
        w.write_zeros(150).unwrap();
        assert_eq!(w.position(), 150);
        assert!(w.inner.iter().all(|&b| b == 0));
    }
}

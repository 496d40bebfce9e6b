//! Primitive wire formats: booleans, integers, strings, blobs, and the length headers composites
//! use.

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::{Error, Result};
use crate::marker::Marker;

/// Write a boolean as exactly one byte.
pub fn write_bool(buf: &mut Vec<u8>, v: bool) {
    buf.push(v as u8);
}

/// Write the 64-bit two's-complement pattern `bits` as an integer unit.
///
/// The magnitude is the big-endian representation with redundant leading sign-extension bytes
/// stripped, so `0` and `-1` take a single byte and the 64-bit extremes take nine.
pub fn write_int(buf: &mut Vec<u8>, bits: u64) {
    let negative = (bits as i64) < 0;
    let pad = if negative { 0xFF } else { 0x00 };
    let bytes = bits.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == pad).count();
    let magnitude = &bytes[skip..];
    buf.push(
        Marker::Int {
            negative,
            len: magnitude.len() as u8,
        }
        .into(),
    );
    buf.extend_from_slice(magnitude);
}

pub fn write_i64(buf: &mut Vec<u8>, v: i64) {
    write_int(buf, v as u64)
}

/// Write a length header. `None` marks an absent blob or composite and is written as `-1`.
pub fn write_len(buf: &mut Vec<u8>, len: Option<usize>) {
    match len {
        Some(len) => write_i64(buf, len as i64),
        None => write_i64(buf, -1),
    }
}

pub fn write_str(buf: &mut Vec<u8>, v: &str) {
    write_len(buf, Some(v.len()));
    buf.extend_from_slice(v.as_bytes());
}

pub fn write_blob(buf: &mut Vec<u8>, v: Option<&[u8]>) {
    write_len(buf, v.map(|v| v.len()));
    if let Some(v) = v {
        buf.extend_from_slice(v);
    }
}

/// A cursor over a fully available byte buffer, counting every byte it consumes.
#[derive(Clone, Copy, Debug)]
pub struct Parser<'a> {
    data: &'a [u8],
    consumed: usize,
}

impl<'a> Parser<'a> {
    pub fn new(data: &'a [u8]) -> Parser<'a> {
        Self { data, consumed: 0 }
    }

    /// Bytes consumed since this parser was created.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn peek_marker(&self) -> Option<Marker> {
        self.data.first().map(|n| Marker::from_u8(*n))
    }

    pub fn read_u8(&mut self, step: &'static str) -> Result<u8> {
        let v = self.data.read_u8().map_err(|_| Error::UnexpectedEof {
            step,
            actual: 0,
            expected: 1,
        })?;
        self.consumed += 1;
        Ok(v)
    }

    /// Split off the next `len` bytes.
    pub fn take(&mut self, len: usize, step: &'static str) -> Result<&'a [u8]> {
        if len > self.data.len() {
            return Err(Error::UnexpectedEof {
                step,
                actual: self.data.len(),
                expected: len,
            });
        }
        let (bytes, data) = self.data.split_at(len);
        self.data = data;
        self.consumed += len;
        Ok(bytes)
    }

    /// Split off a window of the next `len` bytes as its own parser. The window counts its own
    /// consumed bytes from zero.
    pub fn window(&mut self, len: usize, step: &'static str) -> Result<Parser<'a>> {
        Ok(Parser::new(self.take(len, step)?))
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8("decode bool")? {
            0x00 => Ok(false),
            0x01 => Ok(true),
            v => Err(Error::InvalidType(format!(
                "expected bool byte 0x00 or 0x01, got 0x{:02x}",
                v
            ))),
        }
    }

    /// Read an integer unit and return its 64-bit two's-complement pattern.
    pub fn read_int(&mut self) -> Result<u64> {
        let (negative, len) = match Marker::from_u8(self.read_u8("decode integer marker")?) {
            Marker::Int { negative, len } => (negative, len as usize),
            Marker::Nil { .. } => {
                return Err(Error::InvalidType(
                    "expected integer, found nil marker".to_string(),
                ))
            }
            Marker::Reserved(n) => {
                return Err(Error::InvalidType(format!(
                    "expected integer, found reserved marker 0x{:02x}",
                    n
                )))
            }
        };
        let pad = if negative { 0xFF } else { 0x00 };
        if len == 0 {
            return Ok(if negative { u64::MAX } else { 0 });
        }
        let mut bytes = self.take(len, "decode integer magnitude")?;
        if bytes[0] == pad {
            return Err(Error::MalformedData(format!(
                "Got integer with {} magnitude bytes. This is not the shortest encoding.",
                len
            )));
        }
        let mut v = bytes
            .read_uint::<BigEndian>(len)
            .map_err(|_| Error::UnexpectedEof {
                step: "decode integer magnitude",
                actual: 0,
                expected: len,
            })?;
        if negative && len < 8 {
            v |= u64::MAX << (8 * len);
        }
        Ok(v)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_int()? as i64)
    }

    /// Read a length header. `-1` gives `None`; any other negative value is malformed.
    pub fn read_len(&mut self, step: &'static str) -> Result<Option<usize>> {
        match self.read_i64()? {
            -1 => Ok(None),
            len if len < 0 => Err(Error::MalformedData(format!(
                "negative length {} on step [{}]",
                len, step
            ))),
            len => Ok(Some(len as usize)),
        }
    }

    pub fn read_str(&mut self) -> Result<&'a str> {
        let len = self.read_len("decode string length")?.ok_or_else(|| {
            Error::MalformedData("string length can't be negative".to_string())
        })?;
        let bytes = self.take(len, "get string content")?;
        std::str::from_utf8(bytes).map_err(|e| Error::MalformedData(format!("{}", e)))
    }

    pub fn read_blob(&mut self) -> Result<Option<&'a [u8]>> {
        match self.read_len("decode blob length")? {
            Some(len) => Ok(Some(self.take(len, "get blob content")?)),
            None => Ok(None),
        }
    }
}

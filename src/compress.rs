//! Optional zstd compression around encoded values.
//!
//! A compressed frame is a single marker byte followed by the payload: `0` for raw bytes, `1` for a
//! magicless zstd frame that always records its decompressed size. Decompression checks that size
//! against a limit before allocating anything.

use std::{cell::RefCell, fmt};

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

thread_local! {
    static ZSTD_CCTX: RefCell<zstd_safe::CCtx<'static>> = RefCell::new(zstd_safe::CCtx::create());
    static ZSTD_DCTX: RefCell<zstd_safe::DCtx<'static>> = RefCell::new(zstd_safe::DCtx::create());
}

const MARKER_RAW: u8 = 0;
const MARKER_ZSTD: u8 = 1;
const WINDOW_LOG: u32 = 21;

#[derive(Debug, Clone)]
pub enum CompressionError {
    ExceededSize { max: usize, actual: usize },
    ZstdInner(usize),
    Parsing(&'static str),
}

impl fmt::Display for CompressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionError::ExceededSize { max, actual } => write!(
                f,
                "Decompressed size is {} bytes, larger than max of {} bytes",
                actual, max
            ),
            CompressionError::ZstdInner(v) => write!(
                f,
                "zstd failure, code {} ({})",
                v,
                zstd_safe::get_error_name(*v)
            ),
            CompressionError::Parsing(s) => f.write_str(s),
        }
    }
}

impl std::error::Error for CompressionError {}

impl From<zstd_safe::ErrorCode> for CompressionError {
    fn from(value: zstd_safe::ErrorCode) -> Self {
        CompressionError::ZstdInner(value)
    }
}

/// Compression setting used when writing values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compress {
    /// Store encoded bytes as-is.
    None,
    /// Compress with zstd at the given level.
    General { level: u8 },
}

impl Default for Compress {
    fn default() -> Self {
        Compress::General { level: 3 }
    }
}

impl Compress {
    /// Wrap `raw` in a compression frame. Falls back to storing the bytes raw when compression is
    /// off or doesn't make them any smaller.
    pub fn compress(&self, raw: &[u8]) -> Result<Vec<u8>, CompressionError> {
        if let Compress::General { level } = self {
            let frame = zstd_compress(raw, *level as i32)?;
            tracing::debug!(raw = raw.len(), compressed = frame.len(), "zstd compressed value");
            if frame.len() < raw.len() + 1 {
                return Ok(frame);
            }
        }
        let mut frame = Vec::with_capacity(raw.len() + 1);
        frame.push(MARKER_RAW);
        frame.extend_from_slice(raw);
        Ok(frame)
    }
}

/// Undo [`Compress::compress`], failing if the result would be larger than `max_size`.
pub fn decompress(frame: &[u8], max_size: usize) -> Result<Vec<u8>> {
    let (marker, payload) = frame
        .split_first()
        .ok_or(CompressionError::Parsing("missing compression marker"))?;
    match *marker {
        MARKER_RAW => {
            if payload.len() > max_size {
                return Err(Error::LengthTooLong {
                    max: max_size,
                    actual: payload.len(),
                });
            }
            Ok(payload.to_vec())
        }
        MARKER_ZSTD => Ok(zstd_decompress(payload, max_size)?),
        _ => Err(CompressionError::Parsing("unrecognized compression marker").into()),
    }
}

/// Read the content size out of a magicless zstd frame header.
fn content_size(header: &[u8]) -> Result<usize, CompressionError> {
    let descriptor = *header
        .first()
        .ok_or(CompressionError::Parsing("not enough bytes in header"))?;
    if descriptor & 0x07 != 0 {
        return Err(CompressionError::Parsing(
            "zstd frame header uses a checksum or dictionary",
        ));
    }
    let single_segment = descriptor & 0x20 != 0;
    let field_len = match (descriptor >> 6, single_segment) {
        (0, false) => return Err(CompressionError::Parsing("Missing frame content size")),
        (0, true) => 1,
        (1, _) => 2,
        (2, _) => 4,
        _ => 8,
    };
    let start = if single_segment { 1 } else { 2 };
    let field = header
        .get(start..start + field_len)
        .ok_or(CompressionError::Parsing("Header isn't large enough"))?;
    let mut size = LittleEndian::read_uint(field, field_len);
    if field_len == 2 {
        size += 256;
    }
    usize::try_from(size).map_err(|_| CompressionError::Parsing("frame content size overflows"))
}

fn zstd_compress(input: &[u8], level: i32) -> Result<Vec<u8>, CompressionError> {
    use zstd_safe::*;
    ZSTD_CCTX.with_borrow_mut(|ctx| {
        ctx.reset(ResetDirective::SessionAndParameters)?;
        ctx.set_parameter(CParameter::CompressionLevel(level))?;
        ctx.set_parameter(CParameter::DictIdFlag(false))?;
        ctx.set_parameter(CParameter::ChecksumFlag(false))?;
        ctx.set_parameter(CParameter::Format(FrameFormat::Magicless))?;
        ctx.set_parameter(CParameter::ContentSizeFlag(true))?;
        ctx.set_parameter(CParameter::WindowLog(WINDOW_LOG))?;
        ctx.set_pledged_src_size(Some(input.len() as u64))?;

        let mut frame = vec![0u8; 1 + compress_bound(input.len())];
        frame[0] = MARKER_ZSTD;
        let used = ctx.compress2(&mut frame[1..], input)?;
        frame.truncate(1 + used);
        Ok(frame)
    })
}

fn zstd_decompress(input: &[u8], max_size: usize) -> Result<Vec<u8>, CompressionError> {
    use zstd_safe::*;

    let size = content_size(input)?;
    if size > max_size {
        return Err(CompressionError::ExceededSize {
            max: max_size,
            actual: size,
        });
    }

    ZSTD_DCTX.with_borrow_mut(|dtx| {
        dtx.reset(ResetDirective::SessionAndParameters)?;
        dtx.set_parameter(DParameter::Format(FrameFormat::Magicless))?;
        dtx.set_parameter(DParameter::WindowLogMax(WINDOW_LOG))?;

        let mut output = vec![0u8; size];
        let used = dtx.decompress(&mut output[..], input)?;
        if used != size {
            return Err(CompressionError::Parsing(
                "Decompressed size doesn't match promised size",
            ));
        }
        Ok(output)
    })
}

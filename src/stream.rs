//! Back-to-back values over byte streams.
//!
//! Values are self-delimiting, so a stream is nothing more than encoded values written one after
//! another. Readers decode from whatever bytes they have buffered and pull more from the source
//! only when a value runs past the end of the buffer. Errors carry the value's absolute position in
//! the stream.

use std::io::{self, Read, Write};
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::{ready, FusedStream, Stream};
use pin_project_lite::pin_project;
use serde::{de::DeserializeOwned, Serialize};

use crate::codec::{decode_typed, decode_with, Codec, Config};
use crate::error::{Error, Location, Result};
use crate::shape::Shape;
use crate::value::Value;

const CHUNK_SIZE: usize = 8192;

/// Bytes received but not yet decoded.
#[derive(Debug, Default)]
struct Pending {
    buf: Vec<u8>,
    start: usize,
    /// Stream position of `buf[start]`.
    offset: u64,
    /// Values decoded so far.
    count: u64,
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.start == self.buf.len()
    }

    fn len(&self) -> usize {
        self.buf.len() - self.start
    }

    fn extend(&mut self, chunk: &[u8]) {
        if self.start > 0 && self.start >= self.buf.len() / 2 {
            self.buf.drain(..self.start);
            self.start = 0;
        }
        self.buf.extend_from_slice(chunk);
    }

    /// Try to decode the next value from the buffered bytes.
    fn decode<V>(&mut self, f: impl FnOnce(&[u8]) -> Result<(V, usize)>) -> Result<V> {
        let (v, used) = f(&self.buf[self.start..])
            .map_err(|e| e.nested(self.offset as usize, Location::Stream(self.count)))?;
        self.start += used;
        self.offset += used as u64;
        self.count += 1;
        tracing::trace!(count = self.count, offset = self.offset, "decoded stream value");
        Ok(v)
    }

    /// A value still incomplete after `max_size` buffered bytes is too large to ever finish.
    fn check_limit(&self, max_size: usize) -> Result<()> {
        if self.len() > max_size {
            tracing::warn!(
                offset = self.offset,
                buffered = self.len(),
                max_size,
                "stream value exceeds size limit"
            );
            return Err(Error::LengthTooLong {
                max: max_size,
                actual: self.len(),
            }
            .nested(self.offset as usize, Location::Stream(self.count)));
        }
        Ok(())
    }
}

/// Writes values back to back into an [`io::Write`].
#[derive(Debug)]
pub struct Writer<W> {
    inner: W,
    codec: Codec,
    offset: u64,
    count: u64,
}

impl<W: Write> Writer<W> {
    pub fn new(inner: W) -> Self {
        Self::with_codec(inner, Codec::new())
    }

    pub fn with_codec(inner: W, codec: Codec) -> Self {
        Self {
            inner,
            codec,
            offset: 0,
            count: 0,
        }
    }

    /// Encode and write one value, returning how many bytes it took.
    pub fn write<T: Serialize + DeserializeOwned + 'static>(&mut self, value: &T) -> Result<usize> {
        let buf = self.codec.encode(value)?;
        self.write_raw(&buf)
    }

    pub fn write_value(&mut self, value: &Value, shape: &Shape) -> Result<usize> {
        let buf = self.codec.encode_value(value, shape)?;
        self.write_raw(&buf)
    }

    fn write_raw(&mut self, buf: &[u8]) -> Result<usize> {
        self.inner.write_all(buf)?;
        self.offset += buf.len() as u64;
        self.count += 1;
        tracing::trace!(count = self.count, len = buf.len(), "wrote stream value");
        Ok(buf.len())
    }

    pub fn flush(&mut self) -> Result<()> {
        Ok(self.inner.flush()?)
    }

    /// Total bytes written so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Reads values back to back out of an [`io::Read`].
#[derive(Debug)]
pub struct Reader<R> {
    inner: R,
    codec: Codec,
    pending: Pending,
    eof: bool,
}

impl<R: Read> Reader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_codec(inner, Codec::new())
    }

    pub fn with_codec(inner: R, codec: Codec) -> Self {
        Self {
            inner,
            codec,
            pending: Pending::default(),
            eof: false,
        }
    }

    /// Read the next value. Returns `Ok(None)` once the source ends cleanly between values; a
    /// source that ends partway through a value is an [`Error::UnexpectedEof`].
    pub fn read<T: DeserializeOwned + 'static>(&mut self) -> Result<Option<T>> {
        let shape = self.codec.shape_of::<T>()?;
        let config = self.codec.config().clone();
        self.next_with(|data| decode_typed::<T>(data, &shape, &config))
    }

    pub fn read_value(&mut self, shape: &Shape) -> Result<Option<Value>> {
        let config = self.codec.config().clone();
        self.next_with(|data| {
            let mut value = Value::Nil;
            let used = decode_with(data, shape, &mut value, &config)?;
            Ok((value, used))
        })
    }

    /// Stream position of the next value.
    pub fn offset(&self) -> u64 {
        self.pending.offset
    }

    pub fn count(&self) -> u64 {
        self.pending.count
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn next_with<V>(&mut self, mut f: impl FnMut(&[u8]) -> Result<(V, usize)>) -> Result<Option<V>> {
        loop {
            if self.pending.is_empty() {
                if self.eof {
                    return Ok(None);
                }
                self.fill()?;
                continue;
            }
            match self.pending.decode(&mut f) {
                Ok(v) => return Ok(Some(v)),
                Err(e) if e.is_incomplete() && !self.eof => {
                    self.pending.check_limit(self.codec.config().max_size)?;
                    self.fill()?;
                }
                Err(e) => {
                    if e.is_incomplete() {
                        tracing::warn!(offset = self.pending.offset, "stream ended partway through a value");
                    }
                    return Err(e);
                }
            }
        }
    }

    fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; CHUNK_SIZE];
        let n = loop {
            match self.inner.read(&mut chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        if n == 0 {
            tracing::debug!(count = self.pending.count, "stream source ended");
            self.eof = true;
        } else {
            self.pending.extend(&chunk[..n]);
        }
        Ok(())
    }
}

pin_project! {
    /// Decodes values of type `T` out of a stream of byte chunks.
    ///
    /// Chunk boundaries don't need to line up with value boundaries: a value may be split across
    /// any number of chunks, and one chunk may hold many values. The stream ends after the first
    /// error.
    #[must_use = "streams do nothing unless polled"]
    pub struct DecodeStream<St, T> {
        #[pin]
        stream: St,
        pending: Pending,
        shape: Arc<Shape>,
        config: Config,
        done: bool,
        _marker: PhantomData<fn() -> T>,
    }
}

impl<St, T> DecodeStream<St, T>
where
    St: Stream,
    St::Item: AsRef<[u8]>,
    T: DeserializeOwned + 'static,
{
    pub fn new(stream: St) -> Result<Self> {
        Self::with_codec(stream, &mut Codec::new())
    }

    /// Decode using the codec's settings and its cached shape for `T`.
    pub fn with_codec(stream: St, codec: &mut Codec) -> Result<Self> {
        Ok(Self {
            stream,
            pending: Pending::default(),
            shape: codec.shape_of::<T>()?,
            config: codec.config().clone(),
            done: false,
            _marker: PhantomData,
        })
    }
}

impl<St, T> FusedStream for DecodeStream<St, T>
where
    St: Stream,
    St::Item: AsRef<[u8]>,
    T: DeserializeOwned + 'static,
{
    fn is_terminated(&self) -> bool {
        self.done
    }
}

impl<St, T> Stream for DecodeStream<St, T>
where
    St: Stream,
    St::Item: AsRef<[u8]>,
    T: DeserializeOwned + 'static,
{
    type Item = Result<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<T>>> {
        let mut this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }
        let shape: &Shape = this.shape;
        let config: &Config = this.config;
        Poll::Ready(loop {
            if !this.pending.is_empty() {
                match this.pending.decode(|data| decode_typed::<T>(data, shape, config)) {
                    Ok(v) => break Some(Ok(v)),
                    Err(e) if e.is_incomplete() => {
                        if let Err(e) = this.pending.check_limit(config.max_size) {
                            *this.done = true;
                            break Some(Err(e));
                        }
                    }
                    Err(e) => {
                        *this.done = true;
                        break Some(Err(e));
                    }
                }
            }
            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(chunk) => this.pending.extend(chunk.as_ref()),
                None => {
                    *this.done = true;
                    if this.pending.is_empty() {
                        break None;
                    }
                    // Whatever is left is an incomplete value.
                    break Some(this.pending.decode(|data| decode_typed::<T>(data, shape, config)));
                }
            }
        })
    }
}

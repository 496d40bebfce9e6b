//! The encode side of the type-directed dispatcher.

use std::mem;

use crate::depth_tracking::DepthTracker;
use crate::element::{write_blob, write_bool, write_int, write_len, write_str};
use crate::envelope::write_nil;
use crate::error::{Error, Result};
use crate::shape::Shape;
use crate::value::Value;

pub(crate) fn mismatch(shape: &Shape, value: &Value) -> Error {
    Error::InvalidType(format!("can't encode {} as {}", value.name(), shape))
}

/// Walks a [`Value`] alongside its [`Shape`], appending units to an output buffer.
pub(crate) struct Encoder {
    pub(crate) buf: Vec<u8>,
    depth: DepthTracker,
}

impl Encoder {
    pub fn new(max_depth: usize) -> Self {
        Self {
            buf: Vec::new(),
            depth: DepthTracker::new(max_depth),
        }
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub fn encode(&mut self, value: &Value, shape: &Shape) -> Result<()> {
        match shape {
            Shape::Optional(inner) => match value {
                Value::Nil => {
                    write_nil(&mut self.buf, shape.indirection_depth());
                    Ok(())
                }
                Value::Some(v) => self.nested(|enc| enc.encode(v, inner)),
                other => Err(Error::InvalidType(format!(
                    "reference layer of {} needs Some or Nil, found {}",
                    shape,
                    other.name()
                ))),
            },
            Shape::Bool => match value {
                Value::Bool(v) => {
                    write_bool(&mut self.buf, *v);
                    Ok(())
                }
                other => Err(mismatch(shape, other)),
            },
            Shape::Int(kind) => match value {
                Value::Int(v) if kind.contains(v) => {
                    write_int(&mut self.buf, v.as_bits());
                    Ok(())
                }
                Value::Int(v) => Err(Error::InvalidType(format!(
                    "integer {} is out of range for {}",
                    v, kind
                ))),
                other => Err(mismatch(shape, other)),
            },
            Shape::Str => match value {
                Value::Str(v) => {
                    write_str(&mut self.buf, v);
                    Ok(())
                }
                other => Err(mismatch(shape, other)),
            },
            Shape::Blob => match value {
                Value::Blob(v) => {
                    write_blob(&mut self.buf, v.as_deref());
                    Ok(())
                }
                Value::Nil => {
                    write_blob(&mut self.buf, None);
                    Ok(())
                }
                other => Err(mismatch(shape, other)),
            },
            Shape::Seq(elem) => self.encode_seq(value, elem),
            Shape::Map(key, val) => self.encode_map(value, key, val),
            Shape::Record(fields) => self.encode_record(value, fields),
        }
    }

    /// Run `f` one nesting level deeper.
    pub(crate) fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.depth.enter()?;
        let result = f(self);
        self.depth.leave();
        result
    }

    /// Write an absent composite.
    pub(crate) fn absent(&mut self) -> Result<()> {
        write_len(&mut self.buf, None);
        Ok(())
    }

    /// Encode a composite payload with `f`, then prefix it with its byte count. Inside `f`, the
    /// buffer only holds the payload, so offsets taken from it are relative to the payload start.
    pub(crate) fn counted(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        let outer = mem::take(&mut self.buf);
        let result = self.nested(f);
        let payload = mem::replace(&mut self.buf, outer);
        result?;
        write_len(&mut self.buf, Some(payload.len()));
        self.buf.extend_from_slice(&payload);
        Ok(())
    }
}

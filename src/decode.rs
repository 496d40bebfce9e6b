//! The decode side of the type-directed dispatcher.

use crate::depth_tracking::DepthTracker;
use crate::element::Parser;
use crate::envelope::{peek_nil, read_nil};
use crate::error::{Error, Result};
use crate::shape::Shape;
use crate::value::Value;

/// Reads units out of a [`Parser`] according to a [`Shape`], producing [`Value`]s.
pub(crate) struct Decoder {
    depth: DepthTracker,
}

impl Decoder {
    pub fn new(max_depth: usize) -> Self {
        Self {
            depth: DepthTracker::new(max_depth),
        }
    }

    /// Decode one unit into `dst`.
    ///
    /// Records merge into an existing record in `dst`, and present reference layers decode
    /// through to whatever they already point to. Everything else overwrites.
    pub fn decode_into(&mut self, parser: &mut Parser, shape: &Shape, dst: &mut Value) -> Result<()> {
        match shape {
            Shape::Optional(inner) => {
                let layers = shape.indirection_depth();
                match peek_nil(parser)? {
                    Some(depth) if depth == layers => {
                        read_nil(parser)?;
                        *dst = Value::Nil;
                        Ok(())
                    }
                    Some(depth) if depth > layers => Err(Error::MalformedData(format!(
                        "nil depth {} exceeds the {} reference layers of {}",
                        depth, layers, shape
                    ))),
                    // Not nil, or a nil that belongs to a deeper layer
                    _ => self.nested(|dec| match dst {
                        Value::Some(target) => dec.decode_into(parser, inner, target),
                        _ => {
                            let mut target = Value::Nil;
                            dec.decode_into(parser, inner, &mut target)?;
                            *dst = Value::Some(Box::new(target));
                            Ok(())
                        }
                    }),
                }
            }
            Shape::Bool => {
                *dst = Value::Bool(parser.read_bool()?);
                Ok(())
            }
            Shape::Int(kind) => {
                let bits = parser.read_int()?;
                let v = kind.from_bits(bits).ok_or_else(|| {
                    Error::InvalidType(format!(
                        "integer {} is out of range for {}",
                        bits as i64, kind
                    ))
                })?;
                *dst = Value::Int(v);
                Ok(())
            }
            Shape::Str => {
                *dst = Value::Str(parser.read_str()?.to_string());
                Ok(())
            }
            Shape::Blob => {
                *dst = if self.read_absent(parser)? {
                    Value::Blob(None)
                } else {
                    Value::Blob(parser.read_blob()?.map(|b| b.to_vec()))
                };
                Ok(())
            }
            Shape::Seq(elem) => {
                *dst = self.decode_seq(parser, elem)?;
                Ok(())
            }
            Shape::Map(key, val) => {
                *dst = self.decode_map(parser, key, val)?;
                Ok(())
            }
            Shape::Record(fields) => self.decode_record(parser, fields, dst),
        }
    }

    /// Run `f` one nesting level deeper.
    pub(crate) fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.depth.enter()?;
        let result = f(self);
        self.depth.leave();
        result
    }

    /// Consume a single-layer nil envelope in a position that has no reference layer of its own.
    /// Blobs and composites accept it as an alternate spelling of "absent".
    fn read_absent(&mut self, parser: &mut Parser) -> Result<bool> {
        match read_nil(parser)? {
            None => Ok(false),
            Some(1) => Ok(true),
            Some(depth) => Err(Error::MalformedData(format!(
                "nil depth {} where no reference layers are expected",
                depth
            ))),
        }
    }

    /// Read a composite's byte-count header and split off its payload.
    ///
    /// Returns `None` for an absent composite, otherwise the header length and the payload window.
    pub(crate) fn open<'a>(
        &mut self,
        parser: &mut Parser<'a>,
        step: &'static str,
    ) -> Result<Option<(usize, Parser<'a>)>> {
        let start = parser.consumed();
        if self.read_absent(parser)? {
            return Ok(None);
        }
        let len = match parser.read_len(step)? {
            Some(len) => len,
            None => return Ok(None),
        };
        let header = parser.consumed() - start;
        let window = parser.window(len, step)?;
        Ok(Some((header, window)))
    }
}

/// Within a composite payload, running out of bytes means the declared byte count and the
/// elements inside it disagree.
pub(crate) fn misaligned(err: Error, what: &str) -> Error {
    if err.is_incomplete() {
        Error::MalformedData(format!("{} payload ends partway through a unit: {}", what, err))
    } else {
        err
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;
    use crate::integer::IntKind;

    fn dec(data: &[u8], shape: &Shape) -> Result<(Value, usize)> {
        let mut parser = Parser::new(data);
        let mut v = Value::Nil;
        Decoder::new(crate::MAX_DEPTH).decode_into(&mut parser, shape, &mut v)?;
        Ok((v, parser.consumed()))
    }

    #[test]
    fn primitives() {
        assert_eq!(dec(&[0x01], &Shape::Bool).unwrap(), (Value::from(true), 1));
        assert_eq!(
            dec(&[0x02, 0x01, 0x9d, 0xff], &Shape::Int(IntKind::U16)).unwrap(),
            (Value::from(413u16), 3)
        );
        assert_eq!(
            dec(&[0x01, 0x01, b'x'], &Shape::Str).unwrap(),
            (Value::from("x"), 3)
        );
        assert_eq!(dec(&[0x80], &Shape::Blob).unwrap(), (Value::Blob(None), 1));
        assert_eq!(dec(&[0x40], &Shape::Blob).unwrap(), (Value::Blob(None), 1));
        assert_eq!(
            dec(&[0x00], &Shape::Blob).unwrap(),
            (Value::Blob(Some(Vec::new())), 1)
        );
    }

    #[test]
    fn out_of_range() {
        let err = dec(&[0x02, 0x01, 0x00], &Shape::Int(IntKind::U8)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);
        let err = dec(&[0x80], &Shape::Int(IntKind::U32)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);
    }

    #[test]
    fn reference_layers() {
        let shape = Shape::optional_n(Shape::Int(IntKind::I64), 2);
        assert_eq!(dec(&[0x50, 0x01, 0x02], &shape).unwrap(), (Value::Nil, 3));
        assert_eq!(
            dec(&[0x40], &shape).unwrap(),
            (Value::some(Value::Nil), 1)
        );
        assert_eq!(
            dec(&[0x01, 0x07], &shape).unwrap(),
            (Value::some(Value::some(7)), 2)
        );
        let err = dec(&[0x50, 0x01, 0x03], &shape).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedData);
    }

    #[test]
    fn nil_where_no_layers_expected() {
        let err = dec(&[0x40], &Shape::Int(IntKind::I64)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);
        let err = dec(&[0x40], &Shape::Str).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);
        let err = dec(&[0x50, 0x01, 0x02], &Shape::Blob).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedData);
    }

    #[test]
    fn present_layer_decodes_through() {
        let shape = Shape::optional(Shape::record([("a", Shape::Bool), ("b", Shape::Bool)]));
        let mut dst = Value::some(Value::record([("a", true), ("b", true)]));
        // {b: false}
        let data = [0x01, 0x04, 0x01, 0x01, b'b', 0x00];
        let mut parser = Parser::new(&data);
        Decoder::new(crate::MAX_DEPTH)
            .decode_into(&mut parser, &shape, &mut dst)
            .unwrap();
        assert_eq!(
            dst,
            Value::some(Value::record([("a", true), ("b", false)]))
        );
    }
}

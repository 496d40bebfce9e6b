//! Sequences: a byte-count header followed by the elements, each encoded with the element shape.
//!
//! The header counts bytes, not elements, so a reader can skip a whole sequence without
//! understanding what's inside it.

use crate::decode::{misaligned, Decoder};
use crate::element::Parser;
use crate::encode::{mismatch, Encoder};
use crate::error::{Location, Result};
use crate::shape::Shape;
use crate::value::Value;

impl Encoder {
    pub(crate) fn encode_seq(&mut self, value: &Value, elem: &Shape) -> Result<()> {
        let items = match value {
            Value::Nil => return self.absent(),
            Value::Seq(items) => items,
            other => return Err(mismatch(&Shape::seq(elem.clone()), other)),
        };
        self.counted(|enc| {
            for (i, item) in items.iter().enumerate() {
                let start = enc.buf.len();
                enc.encode(item, elem)
                    .map_err(|e| e.nested(start, Location::Element(i)))?;
            }
            Ok(())
        })
    }
}

impl Decoder {
    pub(crate) fn decode_seq(&mut self, parser: &mut Parser, elem: &Shape) -> Result<Value> {
        let (header, mut window) = match self.open(parser, "get sequence content")? {
            Some(open) => open,
            None => return Ok(Value::Nil),
        };
        self.nested(|dec| {
            let mut items = Vec::new();
            while !window.is_empty() {
                let start = window.consumed();
                let mut item = Value::Nil;
                dec.decode_into(&mut window, elem, &mut item).map_err(|e| {
                    misaligned(e, "sequence").nested(header + start, Location::Element(items.len()))
                })?;
                items.push(item);
            }
            Ok(Value::Seq(items))
        })
    }
}

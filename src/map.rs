//! Maps: a byte-count header followed by alternating keys and values.
//!
//! Encoding always emits pairs in ascending key order, so equal maps produce identical bytes.
//! Decoding accepts pairs in any order; when a key repeats, the last occurrence wins.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::decode::{misaligned, Decoder};
use crate::element::Parser;
use crate::encode::{mismatch, Encoder};
use crate::error::{Error, Location, Result};
use crate::shape::Shape;
use crate::value::Value;

impl Encoder {
    pub(crate) fn encode_map(&mut self, value: &Value, key: &Shape, val: &Shape) -> Result<()> {
        Shape::check_key(key)?;
        let pairs = match value {
            Value::Nil => return self.absent(),
            Value::Map(pairs) => pairs,
            other => {
                return Err(mismatch(
                    &Shape::map(key.clone(), val.clone()),
                    other,
                ))
            }
        };
        for (i, (k, _)) in pairs.iter().enumerate() {
            if !k.is_key_of(key) {
                return Err(mismatch(key, k).nested(0, Location::MapKey(i)));
            }
        }

        let mut sorted: Vec<&(Value, Value)> = pairs.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp_key(&b.0).unwrap_or(Ordering::Equal));
        if let Some(dup) = sorted
            .windows(2)
            .find(|w| w[0].0.cmp_key(&w[1].0) == Some(Ordering::Equal))
        {
            return Err(Error::InvalidType(format!(
                "map contains the key {} more than once",
                dup[0].0
            )));
        }

        self.counted(|enc| {
            for (i, (k, v)) in sorted.into_iter().enumerate() {
                let start = enc.buf.len();
                enc.encode(k, key)
                    .map_err(|e| e.nested(start, Location::MapKey(i)))?;
                let start = enc.buf.len();
                enc.encode(v, val)
                    .map_err(|e| e.nested(start, Location::MapValue(i)))?;
            }
            Ok(())
        })
    }
}

impl Decoder {
    pub(crate) fn decode_map(&mut self, parser: &mut Parser, key: &Shape, val: &Shape) -> Result<Value> {
        Shape::check_key(key)?;
        let (header, mut window) = match self.open(parser, "get map content")? {
            Some(open) => open,
            None => return Ok(Value::Nil),
        };
        self.nested(|dec| {
            let mut pairs: Vec<(Value, Value)> = Vec::new();
            let mut index: HashMap<Value, usize> = HashMap::new();
            let mut i = 0;
            while !window.is_empty() {
                let start = window.consumed();
                let mut k = Value::Nil;
                dec.decode_into(&mut window, key, &mut k).map_err(|e| {
                    misaligned(e, "map").nested(header + start, Location::MapKey(i))
                })?;
                let start = window.consumed();
                let mut v = Value::Nil;
                dec.decode_into(&mut window, val, &mut v).map_err(|e| {
                    misaligned(e, "map").nested(header + start, Location::MapValue(i))
                })?;
                match index.get(&k) {
                    Some(&slot) => pairs[slot].1 = v,
                    None => {
                        index.insert(k.clone(), pairs.len());
                        pairs.push((k, v));
                    }
                }
                i += 1;
            }
            Ok(Value::Map(pairs))
        })
    }
}

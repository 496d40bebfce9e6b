//! Records: a byte-count header followed by `(name, value)` pairs.
//!
//! Field names are encoded as strings and fields go out in declaration order. Decoding accepts any
//! order and any subset of the fields, and updates an existing record in place: fields absent from
//! the input keep whatever the destination already held.

use crate::decode::{misaligned, Decoder};
use crate::element::{write_str, Parser};
use crate::encode::{mismatch, Encoder};
use crate::error::{Error, Location, Result};
use crate::shape::{Field, Shape};
use crate::value::Value;

impl Encoder {
    pub(crate) fn encode_record(&mut self, value: &Value, fields: &[Field]) -> Result<()> {
        let pairs = match value {
            Value::Nil => return self.absent(),
            Value::Record(pairs) => pairs,
            other => return Err(mismatch(&Shape::Record(fields.to_vec()), other)),
        };
        for (i, (name, _)) in pairs.iter().enumerate() {
            if !fields.iter().any(|f| &f.name == name) {
                return Err(Error::InvalidType(format!(
                    "record has no field named `{}`",
                    name
                )));
            }
            if pairs[..i].iter().any(|(n, _)| n == name) {
                return Err(Error::InvalidType(format!(
                    "record contains the field `{}` more than once",
                    name
                )));
            }
        }
        self.counted(|enc| {
            for field in fields {
                let v = match pairs.iter().find(|(name, _)| *name == field.name) {
                    Some((_, v)) => v,
                    None => continue,
                };
                write_str(&mut enc.buf, &field.name);
                let start = enc.buf.len();
                enc.encode(v, &field.shape)
                    .map_err(|e| e.nested(start, Location::Field(field.name.clone())))?;
            }
            Ok(())
        })
    }
}

impl Decoder {
    pub(crate) fn decode_record(&mut self, parser: &mut Parser, fields: &[Field], dst: &mut Value) -> Result<()> {
        let (header, mut window) = match self.open(parser, "get record content")? {
            Some(open) => open,
            None => {
                *dst = Value::Nil;
                return Ok(());
            }
        };
        // Merge into a copy so a failure part way through leaves `dst` untouched.
        let mut pairs = match dst {
            Value::Record(pairs) => pairs.clone(),
            _ => Vec::new(),
        };
        self.nested(|dec| {
            let mut i = 0;
            while !window.is_empty() {
                let start = window.consumed();
                let name = window.read_str().map_err(|e| {
                    misaligned(e, "record").nested(header + start, Location::FieldName(i))
                })?;
                let field = fields.iter().find(|f| f.name == name).ok_or_else(|| {
                    Error::MalformedData(format!("record has no field named `{}`", name))
                        .nested(header + start, Location::FieldName(i))
                })?;
                let slot = match pairs.iter().position(|(n, _)| n == name) {
                    Some(slot) => slot,
                    None => {
                        pairs.push((field.name.clone(), Value::Nil));
                        pairs.len() - 1
                    }
                };
                let start = window.consumed();
                dec.decode_into(&mut window, &field.shape, &mut pairs[slot].1)
                    .map_err(|e| {
                        misaligned(e, "record")
                            .nested(header + start, Location::Field(field.name.clone()))
                    })?;
                i += 1;
            }
            Ok(())
        })?;
        *dst = Value::Record(pairs);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::error::{ErrorKind, Location};
    use crate::integer::IntKind;
    use crate::{decode_value, decode_value_into, encode_value, Error, Shape, Value};

    fn point() -> Shape {
        Shape::record([
            ("x", Shape::Int(IntKind::I32)),
            ("y", Shape::Int(IntKind::I32)),
            ("tag", Shape::optional(Shape::Str)),
        ])
    }

    #[test]
    fn declaration_order() {
        let value = Value::record([
            ("tag", Value::Nil),
            ("y", Value::from(-1)),
            ("x", Value::from(2)),
        ]);
        let enc = encode_value(&value, &point()).unwrap();
        let expected = [
            0x01, 0x0f, // 15 payload bytes
            0x01, 0x01, b'x', 0x01, 0x02, // x: 2
            0x01, 0x01, b'y', 0x80, // y: -1
            0x01, 0x03, b't', b'a', b'g', 0x40, // tag: nil
        ];
        assert_eq!(enc, expected);
        let (decoded, used) = decode_value(&enc, &point()).unwrap();
        assert_eq!(used, enc.len());
        assert_eq!(
            decoded,
            Value::record([
                ("x", Value::from(2)),
                ("y", Value::from(-1)),
                ("tag", Value::Nil),
            ])
        );
    }

    #[test]
    fn omitted_fields_are_skipped() {
        let value = Value::record([("y", 1)]);
        let enc = encode_value(&value, &point()).unwrap();
        assert_eq!(enc, &[0x01, 0x05, 0x01, 0x01, b'y', 0x01, 0x01]);
    }

    #[test]
    fn partial_update() {
        let mut dst = Value::record([
            ("x", Value::from(10)),
            ("y", Value::from(20)),
            ("tag", Value::some("keep")),
        ]);
        // {y: 5}
        let data = [0x01, 0x05, 0x01, 0x01, b'y', 0x01, 0x05, 0xaa];
        let used = decode_value_into(&data, &point(), &mut dst).unwrap();
        assert_eq!(used, 7);
        assert_eq!(dst.field("x"), Some(&Value::from(10)));
        assert_eq!(dst.field("y"), Some(&Value::from(5)));
        assert_eq!(dst.field("tag"), Some(&Value::some("keep")));
    }

    #[test]
    fn nested_records_merge() {
        let shape = Shape::record([("inner", point()), ("n", Shape::Bool)]);
        let mut dst = Value::record([
            ("inner", Value::record([("x", 1), ("y", 2)])),
            ("n", Value::from(true)),
        ]);
        let update = Value::record([("inner", Value::record([("y", 3)]))]);
        let enc = encode_value(&update, &shape).unwrap();
        decode_value_into(&enc, &shape, &mut dst).unwrap();
        assert_eq!(
            dst,
            Value::record([
                ("inner", Value::record([("x", 1), ("y", 3)])),
                ("n", Value::from(true)),
            ])
        );
    }

    #[test]
    fn unknown_field() {
        let data = [0x01, 0x05, 0x01, 0x01, b'z', 0x01, 0x05];
        let err = decode_value(&data, &point()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedData);
        assert_eq!(err.offset(), 2);
        match err {
            Error::Nested { location, .. } => assert_eq!(location, Location::FieldName(0)),
            e => panic!("expected nested error, got {:?}", e),
        }

        let value = Value::record([("z", 1)]);
        let err = encode_value(&value, &point()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);
    }

    #[test]
    fn field_error_location() {
        // x: nil
        let data = [0x01, 0x04, 0x01, 0x01, b'x', 0x40];
        let err = decode_value(&data, &point()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);
        assert_eq!(err.offset(), 5);
        match err {
            Error::Nested { location, .. } => {
                assert_eq!(location, Location::Field("x".to_string()))
            }
            e => panic!("expected nested error, got {:?}", e),
        }
    }

    #[test]
    fn repeated_field_name() {
        let value = Value::record([("x", 1), ("x", 2)]);
        let err = encode_value(&value, &point()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);
    }

    #[test]
    fn failed_update_leaves_destination() {
        let shape = Shape::record([("a", Shape::Int(IntKind::I32)), ("b", Shape::Bool)]);
        let before = Value::record([("a", Value::from(1)), ("b", Value::from(true))]);
        let mut dst = before.clone();
        // {a: 5, b: 0x07}
        let data = [0x01, 0x09, 0x01, 0x01, b'a', 0x01, 0x05, 0x01, 0x01, b'b', 0x07];
        let err = decode_value_into(&data, &shape, &mut dst).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);
        assert_eq!(dst, before);

        let nested = Shape::record([("inner", shape.clone()), ("n", Shape::Bool)]);
        let before = Value::record([("inner", before), ("n", Value::from(false))]);
        let mut dst = before.clone();
        // {n: true, inner: {a: 5, b: 0x07}}
        let mut data = vec![0x01, 0x16, 0x01, 0x01, b'n', 0x01];
        data.extend_from_slice(&[0x01, 0x05, b'i', b'n', b'n', b'e', b'r']);
        data.extend_from_slice(&[0x01, 0x09, 0x01, 0x01, b'a', 0x01, 0x05, 0x01, 0x01, b'b', 0x07]);
        let err = decode_value_into(&data, &nested, &mut dst).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidType);
        assert_eq!(dst, before);
    }

    #[test]
    fn absent_record() {
        let mut dst = Value::record([("x", 1)]);
        decode_value_into(&[0x80], &point(), &mut dst).unwrap();
        assert_eq!(dst, Value::Nil);
        assert_eq!(encode_value(&Value::Nil, &point()).unwrap(), &[0x80]);
    }
}

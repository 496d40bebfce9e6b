use std::collections::{BTreeMap, HashMap};

use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use shape_pack::{
    decode_value, decode_value_into, encode_value, from_slice, from_slice_into, to_vec, ErrorKind,
    IntKind, Location, Shape, Value,
};

fn int64() -> Shape {
    Shape::Int(IntKind::I64)
}

#[test]
fn small_integers() {
    let enc = encode_value(&Value::from(413), &int64()).unwrap();
    assert_eq!(enc, &[0x02, 0x01, 0x9D]);
    let (dec, used) = decode_value(&enc, &int64()).unwrap();
    assert_eq!(dec.as_i64(), Some(413));
    assert_eq!(used, 3);

    let enc = encode_value(&Value::from(-1), &int64()).unwrap();
    assert_eq!(enc, &[0x80]);
    let (dec, used) = decode_value(&enc, &int64()).unwrap();
    assert_eq!(dec.as_i64(), Some(-1));
    assert_eq!(used, 1);

    assert_eq!(encode_value(&Value::from(0), &int64()).unwrap(), &[0x00]);
}

#[test]
fn integer_extremes_take_nine_bytes() {
    for v in [i64::MIN, i64::MAX] {
        let enc = encode_value(&Value::from(v), &int64()).unwrap();
        assert_eq!(enc.len(), 9, "{}", v);
        let (dec, used) = decode_value(&enc, &int64()).unwrap();
        assert_eq!(dec.as_i64(), Some(v));
        assert_eq!(used, 9);
    }
}

#[test]
fn random_integers() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(413);
    for _ in 0..1000 {
        let v: i64 = rng.gen::<i64>() >> rng.gen_range(0..64);
        let enc = encode_value(&Value::from(v), &int64()).unwrap();
        assert!(enc.len() <= 9);
        let (dec, used) = decode_value(&enc, &int64()).unwrap();
        assert_eq!(dec.as_i64(), Some(v));
        assert_eq!(used, enc.len());
    }
}

#[test]
fn truncated_integer() {
    let err = decode_value(&[0x01], &int64()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
}

#[test]
fn string() {
    let enc = encode_value(&Value::from("hi"), &Shape::Str).unwrap();
    assert_eq!(enc, &[0x01, 0x02, 0x68, 0x69]);
    let (dec, used) = decode_value(&enc, &Shape::Str).unwrap();
    assert_eq!(dec.as_str(), Some("hi"));
    assert_eq!(used, enc.len());
}

#[test]
fn invalid_utf8() {
    let err = decode_value(&[0x01, 0x02, 0xc3, 0x28], &Shape::Str).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);
}

#[test]
fn empty_is_not_absent() {
    let seq = Shape::seq(Shape::Bool);
    let (dec, _) = decode_value(&[0x00], &seq).unwrap();
    assert_eq!(dec, Value::Seq(Vec::new()));
    let (dec, _) = decode_value(&[0x80], &seq).unwrap();
    assert_eq!(dec, Value::Nil);

    let (dec, _) = decode_value(&[0x00], &Shape::Blob).unwrap();
    assert_eq!(dec, Value::Blob(Some(Vec::new())));
    let (dec, _) = decode_value(&[0x80], &Shape::Blob).unwrap();
    assert_eq!(dec, Value::Blob(None));

    let (dec, _) = decode_value(&[0x00], &Shape::Str).unwrap();
    assert_eq!(dec.as_str(), Some(""));
}

#[test]
fn canonical_map_order() {
    let mut a = HashMap::new();
    a.insert("ONE".to_string(), 1u8);
    a.insert("EIGHT".to_string(), 8u8);
    let b: BTreeMap<String, u8> = a.clone().into_iter().collect();

    let enc_a = to_vec(&a).unwrap();
    let enc_b = to_vec(&b).unwrap();
    assert_eq!(enc_a, enc_b);

    let eight = enc_a.windows(5).position(|w| w == b"EIGHT").unwrap();
    let one = enc_a.windows(3).position(|w| w == b"ONE").unwrap();
    assert!(eight < one);

    let shape = Shape::map(Shape::Str, Shape::Int(IntKind::U8));
    let forward = Value::map([("ONE", 1u8), ("EIGHT", 8u8)]);
    let reverse = Value::map([("EIGHT", 8u8), ("ONE", 1u8)]);
    assert_eq!(
        encode_value(&forward, &shape).unwrap(),
        encode_value(&reverse, &shape).unwrap()
    );
    assert_eq!(encode_value(&forward, &shape).unwrap(), enc_a);
}

#[test]
fn double_reference() {
    let shape = Shape::optional_n(int64(), 2);

    // Outer present, inner absent: a nil unit of depth 1
    let inner_absent = Value::some(Value::Nil);
    let enc = encode_value(&inner_absent, &shape).unwrap();
    assert_eq!(enc, &[0x40]);
    let (dec, used) = decode_value(&enc, &shape).unwrap();
    assert_eq!(dec, inner_absent);
    assert_eq!(used, 1);

    // Both absent: depth carried as an integer
    let enc = encode_value(&Value::Nil, &shape).unwrap();
    assert_eq!(enc, &[0x50, 0x01, 0x02]);
    assert_eq!(decode_value(&enc, &shape).unwrap().0, Value::Nil);

    // Both present: no cost over the plain value
    let present = Value::some(Value::some(7));
    let enc = encode_value(&present, &shape).unwrap();
    assert_eq!(enc, &[0x01, 0x07]);
    assert_eq!(decode_value(&enc, &shape).unwrap().0, present);
}

fn layers(inner: Value, count: usize) -> Value {
    (0..count).fold(inner, |v, _| Value::some(v))
}

#[test]
fn absence_at_every_layer() {
    for depth in 0..8 {
        let shape = Shape::optional_n(int64(), depth);

        let present = layers(Value::from(-7), depth);
        let enc = encode_value(&present, &shape).unwrap();
        assert_eq!(enc, &[0x81, 0xf9], "depth {}", depth);
        assert_eq!(decode_value(&enc, &shape).unwrap(), (present, 2));

        for layer in 0..depth {
            let value = layers(Value::Nil, layer);
            let enc = encode_value(&value, &shape).unwrap();
            let absent = (depth - layer) as u8;
            if absent == 1 {
                assert_eq!(enc, &[0x40]);
            } else {
                assert_eq!(enc, &[0x50, 0x01, absent]);
            }
            let (dec, used) = decode_value(&enc, &shape).unwrap();
            assert_eq!(dec, value, "depth {} layer {}", depth, layer);
            assert_eq!(used, enc.len());
        }
    }
}

#[test]
fn truncated_nil_headers() {
    let shape = Shape::optional_n(Shape::Bool, 3);
    for data in [&[0x60][..], &[0x50], &[0x50, 0x01]] {
        let err = decode_value(data, &shape).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedData, "header {:x?}", data);
    }
}

#[test]
fn typed_references() {
    let cases: [Option<Option<Box<i32>>>; 3] = [None, Some(None), Some(Some(Box::new(-5)))];
    for case in cases {
        let enc = to_vec(&case).unwrap();
        let (dec, used) = from_slice::<Option<Option<Box<i32>>>>(&enc).unwrap();
        assert_eq!(dec, case);
        assert_eq!(used, enc.len());
    }
}

#[test]
fn suffix_is_ignored() {
    let shape = Shape::record([("name", Shape::Str), ("tags", Shape::seq(Shape::Str))]);
    let value = Value::record([
        ("name", Value::from("a")),
        ("tags", Value::from(vec!["x", "y"])),
    ]);
    let enc = encode_value(&value, &shape).unwrap();
    let mut data = enc.clone();
    data.extend_from_slice(&[0xff, 0x00, 0x12]);
    let (dec, used) = decode_value(&data, &shape).unwrap();
    assert_eq!(used, enc.len());
    assert_eq!(dec, value);
}

#[test]
fn concatenated_values() {
    let mut data = Vec::new();
    for v in [1i64, -300, 0, 1 << 40] {
        data.extend(encode_value(&Value::from(v), &int64()).unwrap());
    }
    let mut rest = &data[..];
    let mut out = Vec::new();
    while !rest.is_empty() {
        let (v, used) = decode_value(rest, &int64()).unwrap();
        out.push(v.as_i64().unwrap());
        rest = &rest[used..];
    }
    assert_eq!(out, [1, -300, 0, 1 << 40]);
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
struct Account {
    name: String,
    balance: i64,
    email: Option<String>,
    history: Vec<i64>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct BalanceOnly {
    balance: i64,
}

#[test]
fn partial_record_update() {
    let mut account = Account {
        name: "sam".to_string(),
        balance: 10,
        email: Some("sam@example.com".to_string()),
        history: vec![5, 5],
    };
    let enc = to_vec(&BalanceOnly { balance: 25 }).unwrap();
    let used = from_slice_into(&enc, &mut account).unwrap();
    assert_eq!(used, enc.len());
    assert_eq!(
        account,
        Account {
            name: "sam".to_string(),
            balance: 25,
            email: Some("sam@example.com".to_string()),
            history: vec![5, 5],
        }
    );
}

#[test]
fn partial_update_with_values() {
    let shape = Shape::record([("a", int64()), ("b", Shape::Str)]);
    let mut dst = Value::record([("a", Value::from(1)), ("b", Value::from("keep"))]);
    let only_a = Shape::record([("a", int64())]);
    let enc = encode_value(&Value::record([("a", 2)]), &only_a).unwrap();
    decode_value_into(&enc, &shape, &mut dst).unwrap();
    assert_eq!(dst.field("a").and_then(Value::as_i64), Some(2));
    assert_eq!(dst.field("b").and_then(Value::as_str), Some("keep"));
}

#[test]
fn field_order_does_not_matter() {
    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Reordered {
        history: Vec<i64>,
        email: Option<String>,
        balance: i64,
        name: String,
    }
    let enc = to_vec(&Reordered {
        history: vec![1],
        email: None,
        balance: -2,
        name: "n".to_string(),
    })
    .unwrap();
    let (dec, _) = from_slice::<Account>(&enc).unwrap();
    assert_eq!(
        dec,
        Account {
            name: "n".to_string(),
            balance: -2,
            email: None,
            history: vec![1],
        }
    );
}

#[test]
fn unknown_field_is_rejected() {
    #[derive(Serialize, Deserialize)]
    struct Extra {
        balance: i64,
        surprise: bool,
    }
    let enc = to_vec(&Extra {
        balance: 1,
        surprise: true,
    })
    .unwrap();
    let err = from_slice::<BalanceOnly>(&enc).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedData);
}

#[test]
fn nested_error_offset() {
    let shape = Shape::record([("list", Shape::seq(Shape::Bool))]);
    // list = [true, 0x07]
    let data = [
        0x01, 0x0a, // record, 10 bytes
        0x01, 0x04, b'l', b'i', b's', b't', // name
        0x01, 0x02, 0x01, 0x07, // seq, 2 bytes
    ];
    let err = decode_value(&data, &shape).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidType);
    assert_eq!(err.offset(), 11);
    match &err {
        shape_pack::Error::Nested { location, source, .. } => {
            assert_eq!(location, &Location::Field("list".to_string()));
            match source.as_ref() {
                shape_pack::Error::Nested { location, .. } => {
                    assert_eq!(location, &Location::Element(1))
                }
                e => panic!("expected nested element error, got {:?}", e),
            }
        }
        e => panic!("expected nested field error, got {:?}", e),
    }
}

#[test]
fn deep_input_is_limited() {
    // Each layer is a sequence whose only element is the next layer.
    let mut data = vec![0x00];
    while data.len() < 0xff {
        let mut outer = vec![0x01, data.len() as u8];
        outer.extend_from_slice(&data);
        data = outer;
    }
    let mut shape = Shape::Bool;
    for _ in 0..200 {
        shape = Shape::seq(shape);
    }
    let err = decode_value(&data, &shape).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ParseLimit);
}

fn entry_shape() -> Shape {
    Shape::record([
        ("id", Shape::Int(IntKind::U32)),
        ("scores", Shape::seq(Shape::Int(IntKind::I16))),
        ("flags", Shape::map(Shape::Str, Shape::optional(Shape::Bool))),
        ("parent", Shape::optional(Shape::record([("name", Shape::Str), ("raw", Shape::Blob)]))),
    ])
}

fn random_entry(rng: &mut rand::rngs::StdRng) -> Value {
    let mut fields = Vec::new();
    if rng.gen_bool(0.8) {
        fields.push(("id", Value::from(rng.gen::<u32>())));
    }
    if rng.gen_bool(0.8) {
        let scores = if rng.gen_bool(0.1) {
            Value::Nil
        } else {
            let len = rng.gen_range(0..6);
            Value::Seq((0..len).map(|_| Value::from(rng.gen::<i16>())).collect())
        };
        fields.push(("scores", scores));
    }
    if rng.gen_bool(0.8) {
        // Sorted and unique, the order decoding hands back
        let flags: BTreeMap<String, Value> = (0..rng.gen_range(0..5))
            .map(|i| {
                let flag = match rng.gen_range(0..3) {
                    0 => Value::Nil,
                    1 => Value::some(true),
                    _ => Value::some(false),
                };
                (format!("f{}", i * rng.gen_range(1..4)), flag)
            })
            .collect();
        fields.push(("flags", Value::map(flags)));
    }
    if rng.gen_bool(0.8) {
        let parent = if rng.gen_bool(0.3) {
            Value::Nil
        } else {
            let raw = match rng.gen_range(0..3) {
                0 => None,
                1 => Some(Vec::new()),
                _ => Some((0..rng.gen_range(1..16)).map(|_| rng.gen()).collect()),
            };
            Value::some(Value::record([
                ("name", Value::from(format!("p{}", rng.gen::<u8>()))),
                ("raw", Value::Blob(raw)),
            ]))
        };
        fields.push(("parent", parent));
    }
    Value::record(fields)
}

#[test]
fn random_composites() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
    let shape = entry_shape();
    for _ in 0..500 {
        let value = random_entry(&mut rng);
        let enc = encode_value(&value, &shape).unwrap();
        let (dec, used) = decode_value(&enc, &shape).unwrap();
        assert_eq!(used, enc.len());
        assert_eq!(dec, value);
        assert_eq!(encode_value(&dec, &shape).unwrap(), enc);
    }
}

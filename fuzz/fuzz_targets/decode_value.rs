#![no_main]
use libfuzzer_sys::fuzz_target;
use shape_pack::{decode_value, encode_value, IntKind, Shape};

fuzz_target!(|data: &[u8]| {
    let shape = Shape::record([
        ("id", Shape::Int(IntKind::I64)),
        ("name", Shape::optional_n(Shape::Str, 2)),
        ("tags", Shape::map(Shape::Str, Shape::seq(Shape::Bool))),
        ("raw", Shape::Blob),
    ]);
    // Anything that decodes must re-encode, and decode back to the same value.
    if let Ok((value, _)) = decode_value(data, &shape) {
        let enc = encode_value(&value, &shape).unwrap();
        let (again, used) = decode_value(&enc, &shape).unwrap();
        assert_eq!(used, enc.len());
        assert_eq!(again, value);
    }
});

//! shape-pack is a compact, self-delimiting binary format whose encoding is driven by the *shape*
//! of a value's type rather than by tags written next to every value.
//!
//! Every value is encoded as a sequence of units. Each unit starts with an info byte:
//!
//! ```text
//! bit  7 6 5 4 3 2 1 0
//!      S N E I L L L L
//! ```
//!
//! - `S` (0x80): the integer that follows is negative.
//! - `N` (0x40): this unit is nil, an absent reference.
//! - `E` (0x20): on a nil unit, extension bytes follow the header. Decoders skip them.
//! - `I` (0x10): on a nil unit, an integer depth follows.
//! - `LLLL`: number of magnitude bytes in an integer, 0 to 8.
//!
//! On top of that:
//!
//! - Integers store their big-endian two's-complement bytes with redundant sign-extension bytes
//!     stripped, so `0` is `[0x00]`, `-1` is `[0x80]`, and `413` is `[0x02, 0x01, 0x9D]`.
//! - Booleans are a single `0x00` or `0x01` byte.
//! - Strings and blobs are a length integer followed by that many bytes. A blob length of `-1`
//!     marks an absent blob.
//! - Sequences, maps, and records are a byte-count integer followed by their contents, so any of
//!     them can be skipped without understanding it. A byte count of `-1` marks an absent one.
//! - Maps are written in ascending key order, making the encoding of equal maps identical.
//! - Records are `(name, value)` pairs. Any subset of fields in any order may appear, and decoding
//!     into an existing record only touches the fields present.
//! - A run of absent optional-reference layers is a single nil unit carrying the number of absent
//!     layers. Present layers cost nothing.
//!
//! Types are described by a [`Shape`], which is usually traced from a type's serde
//! `Deserialize` implementation:
//!
//! ```
//! # use serde::{Serialize, Deserialize};
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Point {
//!     x: i32,
//!     y: i32,
//!     label: Option<String>,
//! }
//!
//! let point = Point { x: 1, y: -1, label: None };
//! let enc = shape_pack::to_vec(&point).unwrap();
//! let (dec, used) = shape_pack::from_slice::<Point>(&enc).unwrap();
//! assert_eq!(dec, point);
//! assert_eq!(used, enc.len());
//! ```
//!
//! Or built by hand and used with the dynamic [`Value`] type:
//!
//! ```
//! use shape_pack::{IntKind, Shape, Value};
//!
//! let shape = Shape::map(Shape::Str, Shape::Int(IntKind::U8));
//! let value = Value::map([("ONE", 1u8), ("EIGHT", 8u8)]);
//! let enc = shape_pack::encode_value(&value, &shape).unwrap();
//! // Keys come out sorted
//! assert_eq!(&enc[4..9], b"EIGHT");
//! ```
//!
//! Floats, enums, and unit types have no encoding.

pub mod blob;
mod codec;
pub mod compress;
mod de;
mod decode;
mod depth_tracking;
mod element;
mod encode;
mod envelope;
mod error;
mod integer;
mod map;
mod marker;
mod record;
mod ser;
mod seq;
mod shape;
pub mod stream;
pub mod trace;
mod value;

use serde::{de::DeserializeOwned, Serialize};

pub use blob::Blob;
pub use codec::{Codec, Config};
pub use compress::{Compress, CompressionError};
pub use de::from_value;
pub use error::{CapabilityError, Error, ErrorKind, Location, Result};
pub use integer::{IntKind, Integer};
pub use ser::to_value;
pub use shape::{Field, Shape, ShapeCache};
pub use stream::{DecodeStream, Reader, Writer};
pub use value::Value;

/// Default limit on nesting: sequences, maps, records, and optional-reference layers each count
/// as one level.
pub const MAX_DEPTH: usize = 64;

/// Default limit on the size of one encoded value, 16 MiB.
pub const MAX_SIZE: usize = 1usize << 24;

/// Encode a dynamic value with an explicit shape.
pub fn encode_value(value: &Value, shape: &Shape) -> Result<Vec<u8>> {
    codec::encode_with(value, shape, &Config::default())
}

/// Decode one value from the front of `data`. Returns the value and how many bytes it used;
/// anything after it is ignored.
pub fn decode_value(data: &[u8], shape: &Shape) -> Result<(Value, usize)> {
    let mut value = Value::Nil;
    let used = codec::decode_with(data, shape, &mut value, &Config::default())?;
    Ok((value, used))
}

/// Decode one value from the front of `data` on top of `dst`, returning how many bytes it used.
/// Record fields missing from the input keep their current values.
pub fn decode_value_into(data: &[u8], shape: &Shape, dst: &mut Value) -> Result<usize> {
    codec::decode_with(data, shape, dst, &Config::default())
}

/// Encode a value using the shape traced from its type.
///
/// The shape comes from `T`'s `Deserialize` implementation, so `T` needs both directions.
pub fn to_vec<T: Serialize + DeserializeOwned>(value: &T) -> Result<Vec<u8>> {
    let shape = trace::trace::<T>()?;
    codec::encode_with(&to_value(value)?, &shape, &Config::default())
}

/// Decode a value from the front of `data`, returning it and how many bytes it used.
pub fn from_slice<T: DeserializeOwned>(data: &[u8]) -> Result<(T, usize)> {
    let shape = trace::trace::<T>()?;
    codec::decode_typed(data, &shape, &Config::default())
}

/// Decode on top of an existing value: struct fields missing from the input keep their current
/// values. Returns how many bytes were used.
pub fn from_slice_into<T: Serialize + DeserializeOwned>(data: &[u8], dst: &mut T) -> Result<usize> {
    let shape = trace::trace::<T>()?;
    codec::decode_typed_into(data, &shape, dst, &Config::default())
}

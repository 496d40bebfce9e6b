//! Blob capability: types that supply their own byte representation.
//!
//! A type implementing [`Blob`] is written as an opaque length-prefixed byte payload. The codec
//! never looks inside it, and failures from the type's own conversion come back as
//! [`Error::Capability`] with the original error untouched.
//!
//! Use this module with serde's `with` attribute to mark a field as a blob:
//!
//! ```
//! # use serde::{Serialize, Deserialize};
//! # use shape_pack::{Blob, CapabilityError};
//! #[derive(Clone, Debug, PartialEq)]
//! struct Rgb(u8, u8, u8);
//!
//! impl Blob for Rgb {
//!     fn to_blob(&self) -> Result<Option<Vec<u8>>, CapabilityError> {
//!         Ok(Some(vec![self.0, self.1, self.2]))
//!     }
//!
//!     fn from_blob(data: Option<&[u8]>) -> Result<Self, CapabilityError> {
//!         match data {
//!             Some(&[r, g, b]) => Ok(Rgb(r, g, b)),
//!             Some(&[]) | None => Ok(Rgb(0, 0, 0)),
//!             _ => Err("expected 3 color bytes".into()),
//!         }
//!     }
//! }
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq)]
//! struct Pixel {
//!     #[serde(with = "shape_pack::blob")]
//!     color: Rgb,
//! }
//!
//! let pixel = Pixel { color: Rgb(1, 2, 3) };
//! let enc = shape_pack::to_vec(&pixel).unwrap();
//! let (dec, _) = shape_pack::from_slice::<Pixel>(&enc).unwrap();
//! assert_eq!(dec, pixel);
//! ```

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserializer, Visitor};
use serde::ser::{self, Serializer};

use crate::error::{CapabilityError, Error, Result};
use crate::value::Value;

/// A type that converts itself to and from an opaque byte payload.
///
/// `None` is an absent blob, distinct from an empty one. Shape tracing hands `from_blob` an empty
/// payload to learn the field's shape, so implementations should accept `Some(&[])`.
pub trait Blob: Sized {
    fn to_blob(&self) -> Result<Option<Vec<u8>>, CapabilityError>;
    fn from_blob(data: Option<&[u8]>) -> Result<Self, CapabilityError>;
}

impl Blob for Vec<u8> {
    fn to_blob(&self) -> Result<Option<Vec<u8>>, CapabilityError> {
        Ok(Some(self.clone()))
    }

    fn from_blob(data: Option<&[u8]>) -> Result<Self, CapabilityError> {
        Ok(data.map(|d| d.to_vec()).unwrap_or_default())
    }
}

impl Blob for Option<Vec<u8>> {
    fn to_blob(&self) -> Result<Option<Vec<u8>>, CapabilityError> {
        Ok(self.clone())
    }

    fn from_blob(data: Option<&[u8]>) -> Result<Self, CapabilityError> {
        Ok(data.map(|d| d.to_vec()))
    }
}

impl Value {
    /// Build a blob value through the type's own capability.
    pub fn from_blob<B: Blob>(v: &B) -> Result<Value> {
        Ok(Value::Blob(v.to_blob().map_err(Error::Capability)?))
    }

    /// Reconstruct a capability type from a blob value. An absent value (`Nil`) counts as an
    /// absent blob.
    pub fn to_blob<B: Blob>(&self) -> Result<B> {
        let data = match self {
            Value::Blob(b) => b.as_deref(),
            Value::Nil => None,
            other => {
                return Err(Error::InvalidType(format!(
                    "expected blob, found {}",
                    other.name()
                )))
            }
        };
        B::from_blob(data).map_err(Error::Capability)
    }
}

pub fn serialize<B: Blob, S: Serializer>(v: &B, serializer: S) -> Result<S::Ok, S::Error> {
    match v.to_blob().map_err(ser::Error::custom)? {
        Some(data) => serializer.serialize_bytes(&data),
        None => serializer.serialize_none(),
    }
}

pub fn deserialize<'de, B: Blob, D: Deserializer<'de>>(deserializer: D) -> Result<B, D::Error> {
    deserializer.deserialize_byte_buf(BlobVisitor(PhantomData))
}

struct BlobVisitor<B>(PhantomData<B>);

impl<'de, B: Blob> Visitor<'de> for BlobVisitor<B> {
    type Value = B;

    fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str("blob bytes")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<B, E> {
        B::from_blob(Some(v)).map_err(E::custom)
    }

    fn visit_none<E: de::Error>(self) -> Result<B, E> {
        B::from_blob(None).map_err(E::custom)
    }

    fn visit_unit<E: de::Error>(self) -> Result<B, E> {
        self.visit_none()
    }
}

//! Deserialization out of [`Value`].
//!
//! The reverse of [`to_value`][crate::ser::to_value]. An absent sequence, map, or record comes
//! back as an empty one when the destination type has no reference layer to hold the absence.

use serde::de::value::{MapDeserializer, SeqDeserializer};
use serde::de::*;
use serde::forward_to_deserialize_any;

use crate::error::{Error, Result};
use crate::integer::{get_int_internal, IntPriv};
use crate::value::Value;

/// Convert a [`Value`] into any deserializable type.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    T::deserialize(value)
}

fn visit_seq<'de, V: Visitor<'de>>(items: Vec<Value>, visitor: V) -> Result<V::Value> {
    let mut seq = SeqDeserializer::<_, Error>::new(items.into_iter());
    let v = visitor.visit_seq(&mut seq)?;
    seq.end()?;
    Ok(v)
}

fn visit_map<'de, K, V>(pairs: Vec<(K, Value)>, visitor: V) -> Result<V::Value>
where
    K: IntoDeserializer<'de, Error>,
    V: Visitor<'de>,
{
    let mut map = MapDeserializer::<_, Error>::new(pairs.into_iter());
    let v = visitor.visit_map(&mut map)?;
    map.end()?;
    Ok(v)
}

impl<'de> IntoDeserializer<'de, Error> for Value {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

impl<'de> Deserializer<'de> for Value {
    type Error = Error;

    fn is_human_readable(&self) -> bool {
        false
    }

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Nil => visitor.visit_unit(),
            Value::Some(v) => visitor.visit_some(*v),
            Value::Bool(v) => visitor.visit_bool(v),
            Value::Int(v) => match get_int_internal(&v) {
                IntPriv::PosInt(v) => visitor.visit_u64(v),
                IntPriv::NegInt(v) => visitor.visit_i64(v),
            },
            Value::Str(v) => visitor.visit_string(v),
            Value::Blob(None) => visitor.visit_none(),
            Value::Blob(Some(v)) => visitor.visit_byte_buf(v),
            Value::Seq(v) => visit_seq(v, visitor),
            Value::Map(v) => visit_map(v, visitor),
            Value::Record(v) => visit_map(v, visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Nil | Value::Blob(None) => visitor.visit_none(),
            Value::Some(v) => visitor.visit_some(*v),
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Nil => visit_seq(Vec::new(), visitor),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Nil => visit_map(Vec::<(Value, Value)>::new(), visitor),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_map(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self {
            Value::Nil => visitor.visit_none(),
            other => other.deserialize_any(visitor),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value> {
        Err(Error::InvalidType(format!(
            "enum {} values can't be decoded",
            name
        )))
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        unit unit_struct identifier ignored_any
    }
}

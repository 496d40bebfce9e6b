use std::cmp::Ordering;
use std::fmt;

use serde::de::{self, Deserialize, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};

use crate::integer::{get_int_internal, IntPriv, Integer};
use crate::shape::Shape;

/// A dynamically typed value, paired with a [`Shape`] for encoding and decoding.
///
/// Reference layers are explicit: `Nil` is an absent layer and `Some` a present one, so a
/// `Some(Nil)` under a doubly-optional shape is a present outer reference holding an absent inner
/// one. Each reference layer of the shape needs its own `Some` or `Nil`: a bare value under a
/// reference layer is rejected when encoding. `Nil` also stands for an absent sequence, map,
/// record, or blob.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Nil,
    Some(Box<Value>),
    Bool(bool),
    Int(Integer),
    Str(String),
    Blob(Option<Vec<u8>>),
    Seq(Vec<Value>),
    /// Key/value pairs in any order. Encoding sorts them.
    Map(Vec<(Value, Value)>),
    /// Named fields in any order.
    Record(Vec<(String, Value)>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Nil
    }
}

impl Value {
    pub fn some(v: impl Into<Value>) -> Value {
        Value::Some(Box::new(v.into()))
    }

    /// Build a record from `(name, value)` pairs.
    pub fn record<N: Into<String>, V: Into<Value>>(
        fields: impl IntoIterator<Item = (N, V)>,
    ) -> Value {
        Value::Record(
            fields
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        )
    }

    pub fn map<K: Into<Value>, V: Into<Value>>(pairs: impl IntoIterator<Item = (K, V)>) -> Value {
        Value::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Some(_) => "reference",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Str(_) => "string",
            Value::Blob(_) => "blob",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Bool(val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_int(&self) -> Option<Integer> {
        if let Value::Int(val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(ref n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Int(ref n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match *self {
            Value::Str(ref s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The blob payload. The outer option is `None` if this isn't a blob at all; the inner one
    /// is `None` for an absent blob.
    pub fn as_blob(&self) -> Option<Option<&[u8]>> {
        match *self {
            Value::Blob(ref b) => Some(b.as_deref()),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match *self {
            Value::Seq(ref v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match *self {
            Value::Map(ref v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Look up a map value by key.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.as_map()?
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Look up a record field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match *self {
            Value::Record(ref fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        match *self {
            Value::Record(ref mut fields) => fields
                .iter_mut()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Strip all present reference layers. Returns `None` if any layer is absent.
    pub fn deref_all(&self) -> Option<&Value> {
        let mut v = self;
        loop {
            match v {
                Value::Nil => return None,
                Value::Some(inner) => v = inner,
                other => return Some(other),
            }
        }
    }

    /// Check if this value could be a map key of the given shape.
    pub(crate) fn is_key_of(&self, key: &Shape) -> bool {
        matches!(
            (self, key),
            (Value::Bool(_), Shape::Bool) | (Value::Int(_), Shape::Int(_)) | (Value::Str(_), Shape::Str)
        )
    }

    /// Total order over map keys of one primitive kind: `false < true`, numeric order for
    /// integers, code-point order for strings. `None` for values that aren't comparable keys.
    pub fn cmp_key(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Some(v) => write!(f, "&{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{:?}", v),
            Value::Blob(None) => f.write_str("blob(nil)"),
            Value::Blob(Some(v)) => write!(f, "blob({} bytes)", v.len()),
            Value::Seq(v) => {
                f.write_str("[")?;
                for (i, item) in v.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(v) => {
                f.write_str("map[")?;
                for (i, (k, item)) in v.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, item)?;
                }
                f.write_str("]")
            }
            Value::Record(v) => {
                f.write_str("{")?;
                for (i, (k, item)) in v.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, item)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Integer> for Value {
    fn from(v: Integer) -> Self {
        Value::Int(v)
    }
}

macro_rules! impl_value_from_integer {
    ($t: ty) => {
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(Integer::from(v))
            }
        }
    };
}

impl_value_from_integer!(u8);
impl_value_from_integer!(u16);
impl_value_from_integer!(u32);
impl_value_from_integer!(u64);
impl_value_from_integer!(usize);
impl_value_from_integer!(i8);
impl_value_from_integer!(i16);
impl_value_from_integer!(i32);
impl_value_from_integer!(i64);
impl_value_from_integer!(isize);

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(v: &'a str) -> Self {
        Value::Str(v.to_string())
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(v: Vec<V>) -> Self {
        Value::Seq(v.into_iter().map(|i| i.into()).collect())
    }
}

impl<V: Into<Value>> From<Option<V>> for Value {
    fn from(v: Option<V>) -> Self {
        match v {
            None => Value::Nil,
            Some(v) => Value::some(v),
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Nil => serializer.serialize_none(),
            Value::Some(v) => serializer.serialize_some(v.as_ref()),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => match get_int_internal(v) {
                IntPriv::PosInt(v) => serializer.serialize_u64(v),
                IntPriv::NegInt(v) => serializer.serialize_i64(v),
            },
            Value::Str(v) => serializer.serialize_str(v),
            Value::Blob(None) => serializer.serialize_none(),
            Value::Blob(Some(v)) => serializer.serialize_bytes(v),
            Value::Seq(v) => serializer.collect_seq(v),
            Value::Map(v) => {
                let mut map = serializer.serialize_map(Some(v.len()))?;
                for (k, item) in v {
                    map.serialize_entry(k, item)?;
                }
                map.end()
            }
            Value::Record(v) => {
                let mut map = serializer.serialize_map(Some(v.len()))?;
                for (k, item) in v {
                    map.serialize_entry(k, item)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> serde::Deserialize<'de> for Value {
    fn deserialize<D: de::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt.write_str("any valid shape-pack value")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
                Ok(Value::Bool(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
                Ok(Value::from(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
                Ok(Value::from(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
                Ok(Value::from(v))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
                Ok(Value::Str(v))
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Value, E> {
                Ok(Value::Blob(Some(v.to_vec())))
            }

            fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Value, E> {
                Ok(Value::Blob(Some(v)))
            }

            fn visit_none<E: de::Error>(self) -> Result<Value, E> {
                Ok(Value::Nil)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
                Ok(Value::Nil)
            }

            fn visit_some<D: de::Deserializer<'de>>(self, d: D) -> Result<Value, D::Error> {
                Ok(Value::Some(Box::new(Value::deserialize(d)?)))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
                let mut v = Vec::with_capacity(access.size_hint().unwrap_or(0).min(4096));
                while let Some(item) = access.next_element()? {
                    v.push(item);
                }
                Ok(Value::Seq(v))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
                let mut v = Vec::with_capacity(access.size_hint().unwrap_or(0).min(4096));
                while let Some((k, item)) = access.next_entry()? {
                    v.push((k, item));
                }
                Ok(Value::Map(v))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

//! Shape tracing: derives a [`Shape`] from a type's `Deserialize` implementation.
//!
//! The tracer plays the part of a deserializer that never reads any data. Every request the
//! type's visitor makes is recorded as a shape, and answered with a throwaway placeholder value
//! (zero, empty string, a single sequence element, each struct field once). Types that can only be
//! deserialized through `deserialize_any` have no static shape and are rejected, as are floats,
//! enums, and unit types.

use serde::de::value::StrDeserializer;
use serde::de::{self, DeserializeOwned, DeserializeSeed, IntoDeserializer, Visitor};

use crate::depth_tracking::DepthTracker;
use crate::error::{Error, Result};
use crate::integer::IntKind;
use crate::shape::{Field, Shape};

/// Trace the shape of `T` with the default nesting limit.
pub fn trace<T: DeserializeOwned>() -> Result<Shape> {
    trace_with_limit::<T>(crate::MAX_DEPTH)
}

/// Trace the shape of `T`, failing with [`Error::ParseLimit`] past `max_depth` nested levels.
/// Recursive types always hit this limit.
pub fn trace_with_limit<T: DeserializeOwned>(max_depth: usize) -> Result<Shape> {
    let mut depth = DepthTracker::new(max_depth);
    let mut out = None;
    T::deserialize(Tracer {
        out: &mut out,
        depth: &mut depth,
    })?;
    finish(out)
}

fn finish(slot: Option<Shape>) -> Result<Shape> {
    slot.ok_or_else(|| Error::InvalidType("type never requested a value".to_string()))
}

fn unsupported(what: &str) -> Error {
    Error::InvalidType(format!("{} values have no shape in this format", what))
}

struct Tracer<'a> {
    out: &'a mut Option<Shape>,
    depth: &'a mut DepthTracker,
}

impl<'a> Tracer<'a> {
    fn int(self, kind: IntKind) {
        *self.out = Some(Shape::Int(kind));
    }

    fn trace_tuple<'de, V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value> {
        if len == 0 {
            return Err(unsupported("empty tuple"));
        }
        self.depth.enter()?;
        let mut access = TupleAccess {
            remaining: len,
            shapes: Vec::with_capacity(len),
            depth: &mut *self.depth,
        };
        let result = visitor.visit_seq(&mut access);
        let shapes = access.shapes;
        self.depth.leave();
        let value = result?;
        let first = shapes
            .first()
            .cloned()
            .ok_or_else(|| unsupported("empty tuple"))?;
        if shapes.iter().any(|s| *s != first) {
            return Err(Error::InvalidType(
                "tuples must hold a single element shape to be encoded as a sequence".to_string(),
            ));
        }
        *self.out = Some(Shape::seq(first));
        Ok(value)
    }
}

impl<'de, 'a> de::Deserializer<'de> for Tracer<'a> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::InvalidType(
            "self-describing types have no static shape".to_string(),
        ))
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        *self.out = Some(Shape::Bool);
        visitor.visit_bool(false)
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.int(IntKind::I8);
        visitor.visit_i8(0)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.int(IntKind::I16);
        visitor.visit_i16(0)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.int(IntKind::I32);
        visitor.visit_i32(0)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.int(IntKind::I64);
        visitor.visit_i64(0)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.int(IntKind::U8);
        visitor.visit_u8(0)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.int(IntKind::U16);
        visitor.visit_u16(0)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.int(IntKind::U32);
        visitor.visit_u32(0)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.int(IntKind::U64);
        visitor.visit_u64(0)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(unsupported("floating point"))
    }

    fn deserialize_f64<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(unsupported("floating point"))
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        *self.out = Some(Shape::Str);
        visitor.visit_char('\0')
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        *self.out = Some(Shape::Str);
        visitor.visit_borrowed_str("")
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        *self.out = Some(Shape::Str);
        visitor.visit_string(String::new())
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        *self.out = Some(Shape::Blob);
        visitor.visit_borrowed_bytes(&[])
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        *self.out = Some(Shape::Blob);
        visitor.visit_byte_buf(Vec::new())
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let Tracer { out, depth } = self;
        depth.enter()?;
        let mut inner = None;
        let result = visitor.visit_some(Tracer {
            out: &mut inner,
            depth: &mut *depth,
        });
        depth.leave();
        let value = result?;
        *out = Some(Shape::optional(finish(inner)?));
        Ok(value)
    }

    fn deserialize_unit<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(unsupported("unit"))
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _visitor: V,
    ) -> Result<V::Value> {
        Err(unsupported(name))
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let Tracer { out, depth } = self;
        depth.enter()?;
        let mut elem = None;
        let result = visitor.visit_seq(SeqAccess {
            remaining: 1,
            elem: &mut elem,
            depth: &mut *depth,
        });
        depth.leave();
        let value = result?;
        *out = Some(Shape::seq(finish(elem)?));
        Ok(value)
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value> {
        self.trace_tuple(len, visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.trace_tuple(len, visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let Tracer { out, depth } = self;
        depth.enter()?;
        let mut key = None;
        let mut val = None;
        let result = visitor.visit_map(MapAccess {
            key_given: false,
            key: &mut key,
            value: &mut val,
            depth: &mut *depth,
        });
        depth.leave();
        let value = result?;
        let key = finish(key)?;
        Shape::check_key(&key)?;
        *out = Some(Shape::map(key, finish(val)?));
        Ok(value)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        let Tracer { out, depth } = self;
        depth.enter()?;
        let mut access = StructAccess {
            names: fields,
            traced: Vec::with_capacity(fields.len()),
            depth: &mut *depth,
        };
        let result = visitor.visit_map(&mut access);
        let traced = access.traced;
        depth.leave();
        let value = result?;
        *out = Some(Shape::Record(traced));
        Ok(value)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value> {
        Err(Error::InvalidType(format!(
            "enum {} has no shape in this format",
            name
        )))
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::InvalidType(
            "ignored values have no static shape".to_string(),
        ))
    }

    fn is_human_readable(&self) -> bool {
        false
    }
}

struct SeqAccess<'a> {
    remaining: usize,
    elem: &'a mut Option<Shape>,
    depth: &'a mut DepthTracker,
}

impl<'de, 'a> de::SeqAccess<'de> for SeqAccess<'a> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        let val = seed.deserialize(Tracer {
            out: &mut *self.elem,
            depth: &mut *self.depth,
        })?;
        Ok(Some(val))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

struct TupleAccess<'a> {
    remaining: usize,
    shapes: Vec<Shape>,
    depth: &'a mut DepthTracker,
}

impl<'de, 'a, 'b> de::SeqAccess<'de> for &'b mut TupleAccess<'a> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        let mut slot = None;
        let val = seed.deserialize(Tracer {
            out: &mut slot,
            depth: &mut *self.depth,
        })?;
        self.shapes.push(finish(slot)?);
        Ok(Some(val))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

struct MapAccess<'a> {
    key_given: bool,
    key: &'a mut Option<Shape>,
    value: &'a mut Option<Shape>,
    depth: &'a mut DepthTracker,
}

impl<'de, 'a> de::MapAccess<'de> for MapAccess<'a> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        if self.key_given {
            return Ok(None);
        }
        self.key_given = true;
        let key = seed.deserialize(Tracer {
            out: &mut *self.key,
            depth: &mut *self.depth,
        })?;
        Ok(Some(key))
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        seed.deserialize(Tracer {
            out: &mut *self.value,
            depth: &mut *self.depth,
        })
    }

    fn size_hint(&self) -> Option<usize> {
        Some(!self.key_given as usize)
    }
}

struct StructAccess<'a> {
    names: &'static [&'static str],
    traced: Vec<Field>,
    depth: &'a mut DepthTracker,
}

impl<'de, 'a, 'b> de::MapAccess<'de> for &'b mut StructAccess<'a> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        let Some(name) = self.names.get(self.traced.len()) else {
            return Ok(None);
        };
        let name: StrDeserializer<Error> = (*name).into_deserializer();
        seed.deserialize(name).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let name = self
            .names
            .get(self.traced.len())
            .ok_or_else(|| Error::SerdeFail("value requested before its field name".to_string()))?;
        let mut slot = None;
        let val = seed.deserialize(Tracer {
            out: &mut slot,
            depth: &mut *self.depth,
        })?;
        self.traced.push(Field::new(*name, finish(slot)?));
        Ok(val)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.names.len() - self.traced.len())
    }
}

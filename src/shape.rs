//! Shape descriptors: the closed set of type classifications the codec dispatches on.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::integer::IntKind;

/// Classification of a value's type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Bool,
    Int(IntKind),
    Str,
    /// Opaque bytes produced and consumed by the value's own capability.
    Blob,
    Seq(Box<Shape>),
    /// Keys must be an orderable primitive shape: `Bool`, `Int`, or `Str`.
    Map(Box<Shape>, Box<Shape>),
    Record(Vec<Field>),
    /// One optional-reference layer around the inner shape.
    Optional(Box<Shape>),
}

/// A named record field. The name doubles as the wire key; the storage location is the field's
/// index in its record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub shape: Shape,
}

impl Field {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }
}

impl Shape {
    pub fn seq(elem: Shape) -> Shape {
        Shape::Seq(Box::new(elem))
    }

    pub fn map(key: Shape, value: Shape) -> Shape {
        Shape::Map(Box::new(key), Box::new(value))
    }

    pub fn optional(inner: Shape) -> Shape {
        Shape::Optional(Box::new(inner))
    }

    /// Wrap `inner` in `depth` optional-reference layers.
    pub fn optional_n(inner: Shape, depth: usize) -> Shape {
        (0..depth).fold(inner, |acc, _| Shape::optional(acc))
    }

    pub fn record<N: Into<String>>(fields: impl IntoIterator<Item = (N, Shape)>) -> Shape {
        Shape::Record(
            fields
                .into_iter()
                .map(|(name, shape)| Field::new(name, shape))
                .collect(),
        )
    }

    /// Number of stacked optional-reference layers starting at this shape.
    pub fn indirection_depth(&self) -> usize {
        let mut depth = 0;
        let mut shape = self;
        while let Shape::Optional(inner) = shape {
            depth += 1;
            shape = inner;
        }
        depth
    }

    /// The shape underneath all optional-reference layers.
    pub fn base(&self) -> &Shape {
        let mut shape = self;
        while let Shape::Optional(inner) = shape {
            shape = inner;
        }
        shape
    }

    /// Check if this shape may be used as a map key.
    pub fn is_orderable(&self) -> bool {
        matches!(self, Shape::Bool | Shape::Int(_) | Shape::Str)
    }

    /// Look up a record field by its wire name.
    pub fn field(&self, name: &str) -> Option<(usize, &Field)> {
        match self {
            Shape::Record(fields) => fields.iter().enumerate().find(|(_, f)| f.name == name),
            _ => None,
        }
    }

    pub(crate) fn check_key(key: &Shape) -> Result<()> {
        if key.is_orderable() {
            Ok(())
        } else {
            Err(Error::InvalidType(format!(
                "map keys must be bool, integer, or string, not {}",
                key
            )))
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Shape::Bool => f.write_str("bool"),
            Shape::Int(kind) => write!(f, "{}", kind),
            Shape::Str => f.write_str("string"),
            Shape::Blob => f.write_str("blob"),
            Shape::Seq(elem) => write!(f, "[{}]", elem),
            Shape::Map(k, v) => write!(f, "map[{}]{}", k, v),
            Shape::Record(fields) => {
                f.write_str("{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.shape)?;
                }
                f.write_str("}")
            }
            Shape::Optional(inner) => write!(f, "?{}", inner),
        }
    }
}

/// Memoizes traced shapes per type.
///
/// Purely an optimization: every lookup returns the same shape [`trace`][crate::trace::trace]
/// would. Each [`Codec`][crate::Codec] owns one; they're never shared implicitly.
#[derive(Clone, Debug, Default)]
pub struct ShapeCache {
    max_depth: Option<usize>,
    shapes: HashMap<TypeId, Arc<Shape>>,
}

impl ShapeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trace with a custom nesting limit instead of [`MAX_DEPTH`][crate::MAX_DEPTH].
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth: Some(max_depth),
            shapes: HashMap::new(),
        }
    }

    /// Get the shape of `T`, tracing it on first use.
    pub fn shape_of<T: DeserializeOwned + 'static>(&mut self) -> Result<Arc<Shape>> {
        let id = TypeId::of::<T>();
        if let Some(shape) = self.shapes.get(&id) {
            return Ok(shape.clone());
        }
        let max_depth = self.max_depth.unwrap_or(crate::MAX_DEPTH);
        let shape = Arc::new(crate::trace::trace_with_limit::<T>(max_depth)?);
        self.shapes.insert(id, shape.clone());
        Ok(shape)
    }

    /// Register a shape for `T` by hand, overriding tracing.
    pub fn insert<T: 'static>(&mut self, shape: Shape) {
        self.shapes.insert(TypeId::of::<T>(), Arc::new(shape));
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
    }
}

//! Native value model.
//!
//! [`Value`] is what handlers consume and produce: every value knows its
//! runtime [`Type`], which is all the dispatcher has to go on when it picks
//! an overload.

mod exception;
mod object;
mod types;

pub use exception::Exception;
pub use object::{NativeObject, Object};
pub use types::{Prim, Type};

use std::collections::BTreeMap;

/// An absent value that still names the type it stands in for.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedNone {
    pub target: Type,
}

impl TypedNone {
    pub fn new(target: Type) -> Self {
        Self { target }
    }

    /// Typed none for a canonical type name as sent on the wire.
    pub fn of_name(name: &str) -> Self {
        Self::new(Type::parse(name))
    }
}

/// Width-preserving primitive array. Byte arrays are [`Value::Binary`].
#[derive(Debug, Clone, PartialEq)]
pub enum PrimArray {
    Bool(Vec<bool>),
    Char(Vec<char>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Long(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl PrimArray {
    pub fn prim(&self) -> Prim {
        match self {
            PrimArray::Bool(_) => Prim::Bool,
            PrimArray::Char(_) => Prim::Char,
            PrimArray::Short(_) => Prim::Short,
            PrimArray::Int(_) => Prim::Int,
            PrimArray::Long(_) => Prim::Long,
            PrimArray::Float(_) => Prim::Float,
            PrimArray::Double(_) => Prim::Double,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PrimArray::Bool(v) => v.len(),
            PrimArray::Char(v) => v.len(),
            PrimArray::Short(v) => v.len(),
            PrimArray::Int(v) => v.len(),
            PrimArray::Long(v) => v.len(),
            PrimArray::Float(v) => v.len(),
            PrimArray::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Widen numeric elements to `f64`. `None` for boolean and char arrays.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        let widened = match self {
            PrimArray::Bool(_) | PrimArray::Char(_) => return None,
            PrimArray::Short(v) => v.iter().map(|x| f64::from(*x)).collect(),
            PrimArray::Int(v) => v.iter().map(|x| f64::from(*x)).collect(),
            PrimArray::Long(v) => v.iter().map(|x| *x as f64).collect(),
            PrimArray::Float(v) => v.iter().map(|x| f64::from(*x)).collect(),
            PrimArray::Double(v) => v.clone(),
        };
        Some(widened)
    }
}

/// Reference array with a declared element type.
///
/// The declared type is local: on the wire an array is a plain sequence, and
/// the receiver re-infers the element type from the items (see
/// [`ObjectArray::infer`]). An empty `String[]`, or a `Number[]` holding only
/// integers, comes back as `Object[]` or `Integer[]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectArray {
    pub elem: Type,
    pub items: Vec<Value>,
}

impl ObjectArray {
    pub fn new(elem: Type, items: Vec<Value>) -> Self {
        Self { elem, items }
    }

    /// Build an array typed by the common runtime type of `items`.
    ///
    /// Mixed, empty, or null-containing input yields `Object[]`.
    pub fn infer(items: Vec<Value>) -> Self {
        let mut common: Option<Type> = None;
        let mut mixed = items.is_empty();
        for item in &items {
            match (item.runtime_type(), &common) {
                (None, _) => mixed = true,
                (Some(t), None) => common = Some(t),
                (Some(t), Some(c)) if &t != c => mixed = true,
                _ => {}
            }
            if mixed {
                break;
            }
        }
        let elem = if mixed {
            Type::Object
        } else {
            common.unwrap_or(Type::Object)
        };
        Self::new(elem, items)
    }
}

/// Runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    TypedNone(TypedNone),
    Bool(bool),
    Char(char),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Binary(Vec<u8>),
    PrimArray(PrimArray),
    Array(ObjectArray),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Uuid(uuid::Uuid),
    Exception(Exception),
    Object(Object),
}

impl Value {
    pub fn object<T: NativeObject>(inner: T) -> Value {
        Value::Object(Object::new(inner))
    }

    pub fn typed_none(target: Type) -> Value {
        Value::TypedNone(TypedNone::new(target))
    }

    /// Runtime type, or `None` for null and typed none.
    ///
    /// Scalars report their boxed type since they arrive as objects.
    pub fn runtime_type(&self) -> Option<Type> {
        let t = match self {
            Value::Null | Value::TypedNone(_) => return None,
            Value::Bool(_) => Type::Boxed(Prim::Bool),
            Value::Char(_) => Type::Boxed(Prim::Char),
            Value::Byte(_) => Type::Boxed(Prim::Byte),
            Value::Short(_) => Type::Boxed(Prim::Short),
            Value::Int(_) => Type::Boxed(Prim::Int),
            Value::Long(_) => Type::Boxed(Prim::Long),
            Value::Float(_) => Type::Boxed(Prim::Float),
            Value::Double(_) => Type::Boxed(Prim::Double),
            Value::Str(_) => Type::String,
            Value::Binary(_) => Type::array_of(Type::Primitive(Prim::Byte)),
            Value::PrimArray(a) => Type::array_of(Type::Primitive(a.prim())),
            Value::Array(a) => Type::array_of(a.elem.clone()),
            Value::List(_) => Type::List,
            Value::Map(_) => Type::Map,
            Value::Uuid(_) => Type::Uuid,
            Value::Exception(_) => Type::Exception,
            Value::Object(o) => Type::named(o.type_name()),
        };
        Some(t)
    }

    /// Label for diagnostics, e.g. `java.lang.Integer` or `null`.
    pub fn type_label(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::TypedNone(t) => format!("None({})", t.target),
            other => other
                .runtime_type()
                .map(|t| t.canonical_name())
                .unwrap_or_else(|| "null".to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null | Value::TypedNone(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Any integer value widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(i) => Some(i64::from(*i)),
            Value::Short(i) => Some(i64::from(*i)),
            Value::Int(i) => Some(i64::from(*i)),
            Value::Long(i) => Some(*i),
            _ => None,
        }
    }

    /// Any numeric value widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(f64::from(*f)),
            Value::Double(f) => Some(*f),
            other => other.as_i64().map(|i| i as f64),
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn downcast_ref<T: NativeObject>(&self) -> Option<&T> {
        self.as_object().and_then(Object::downcast_ref)
    }

    /// Numeric vector from a numeric primitive array, or a reference array
    /// or list whose elements are all numeric.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            Value::PrimArray(a) => a.to_f64_vec(),
            Value::Array(a) => a.items.iter().map(Value::as_f64).collect(),
            Value::List(items) => items.iter().map(Value::as_f64).collect(),
            _ => None,
        }
    }
}

impl Type {
    /// Whether `value` can be passed where `self` is declared.
    ///
    /// Null goes to any reference type. A typed none goes only where its
    /// target type is assignable. Objects also match their declared
    /// supertypes, and reference arrays match element-wise.
    pub fn accepts(&self, value: &Value) -> bool {
        match value {
            Value::Null => self.is_reference(),
            Value::TypedNone(t) => self.is_reference() && self.is_assignable_from(&t.target),
            Value::Object(o) => match self {
                Type::Object => true,
                Type::Named(name) => o.is_instance_of(name),
                _ => false,
            },
            Value::Array(a) => match self {
                Type::Object => true,
                Type::Array(elem) if !elem.is_primitive() => {
                    elem.is_assignable_from(&a.elem) || a.items.iter().all(|v| elem.accepts(v))
                }
                _ => false,
            },
            other => other
                .runtime_type()
                .is_some_and(|t| self.is_assignable_from(&t)),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    char => Char,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    String => Str,
    Vec<u8> => Binary,
    PrimArray => PrimArray,
    ObjectArray => Array,
    BTreeMap<String, Value> => Map,
    uuid::Uuid => Uuid,
    Exception => Exception,
    Object => Object,
    TypedNone => TypedNone,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

macro_rules! impl_from_prim_vec {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for Value {
                fn from(v: Vec<$ty>) -> Self {
                    Value::PrimArray(PrimArray::$variant(v))
                }
            }
        )*
    };
}

impl_from_prim_vec! {
    bool => Bool,
    char => Char,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::Array(ObjectArray::new(
            Type::String,
            v.into_iter().map(Value::Str).collect(),
        ))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

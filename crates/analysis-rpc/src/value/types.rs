//! Runtime type descriptors and assignability.
//!
//! Types are named with the canonical names the remote side uses
//! (`int`, `java.lang.Integer`, `double[]`, ...), so a typed none can name
//! its intended type on the wire and a dispatcher can match it.

use std::fmt;

/// Primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prim {
    Bool,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl Prim {
    pub const ALL: [Prim; 8] = [
        Prim::Bool,
        Prim::Char,
        Prim::Byte,
        Prim::Short,
        Prim::Int,
        Prim::Long,
        Prim::Float,
        Prim::Double,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Prim::Bool => "boolean",
            Prim::Char => "char",
            Prim::Byte => "byte",
            Prim::Short => "short",
            Prim::Int => "int",
            Prim::Long => "long",
            Prim::Float => "float",
            Prim::Double => "double",
        }
    }

    pub fn boxed_name(&self) -> &'static str {
        match self {
            Prim::Bool => "java.lang.Boolean",
            Prim::Char => "java.lang.Character",
            Prim::Byte => "java.lang.Byte",
            Prim::Short => "java.lang.Short",
            Prim::Int => "java.lang.Integer",
            Prim::Long => "java.lang.Long",
            Prim::Float => "java.lang.Float",
            Prim::Double => "java.lang.Double",
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Prim::Bool | Prim::Char)
    }

    fn from_name(name: &str) -> Option<Prim> {
        Prim::ALL.into_iter().find(|p| p.name() == name)
    }

    fn from_boxed_name(name: &str) -> Option<Prim> {
        Prim::ALL.into_iter().find(|p| p.boxed_name() == name)
    }
}

/// Declared or runtime type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Top type; every non-primitive value is assignable to it.
    Object,
    /// Non-nullable primitive.
    Primitive(Prim),
    /// Nullable boxed primitive.
    Boxed(Prim),
    /// Supertype of all boxed numerics.
    Number,
    String,
    Array(Box<Type>),
    List,
    Map,
    Uuid,
    Exception,
    /// Bean, dataset or user type, by canonical name.
    Named(String),
}

impl Type {
    pub fn array_of(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }

    pub fn named(name: impl Into<String>) -> Type {
        Type::Named(name.into())
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Primitive(_))
    }

    /// Reference types accept null.
    pub fn is_reference(&self) -> bool {
        !self.is_primitive()
    }

    /// Canonical name as used on the wire.
    pub fn canonical_name(&self) -> String {
        match self {
            Type::Object => "java.lang.Object".to_string(),
            Type::Primitive(p) => p.name().to_string(),
            Type::Boxed(p) => p.boxed_name().to_string(),
            Type::Number => "java.lang.Number".to_string(),
            Type::String => "java.lang.String".to_string(),
            Type::Array(elem) => format!("{}[]", elem.canonical_name()),
            Type::List => "java.util.List".to_string(),
            Type::Map => "java.util.Map".to_string(),
            Type::Uuid => "java.util.UUID".to_string(),
            Type::Exception => "java.lang.Exception".to_string(),
            Type::Named(name) => name.clone(),
        }
    }

    /// Inverse of [`Type::canonical_name`]. Unknown names become [`Type::Named`].
    pub fn parse(name: &str) -> Type {
        if let Some(elem) = name.strip_suffix("[]") {
            return Type::array_of(Type::parse(elem));
        }
        if let Some(p) = Prim::from_name(name) {
            return Type::Primitive(p);
        }
        if let Some(p) = Prim::from_boxed_name(name) {
            return Type::Boxed(p);
        }
        match name {
            "java.lang.Object" => Type::Object,
            "java.lang.Number" => Type::Number,
            "java.lang.String" => Type::String,
            "java.util.List" => Type::List,
            "java.util.Map" => Type::Map,
            "java.util.UUID" => Type::Uuid,
            "java.lang.Exception" => Type::Exception,
            other => Type::Named(other.to_string()),
        }
    }

    /// Whether a value whose type is `other` can be passed where `self` is
    /// declared. Boxing and unboxing between the same primitive kind count as
    /// assignable; named types only match by name (object values also check
    /// their declared supertypes, see `Type::accepts`).
    pub fn is_assignable_from(&self, other: &Type) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            (Type::Object, _) => true,
            (Type::Primitive(p), Type::Boxed(q)) | (Type::Boxed(p), Type::Primitive(q)) => p == q,
            (Type::Number, Type::Boxed(p)) | (Type::Number, Type::Primitive(p)) => p.is_numeric(),
            (Type::Array(a), Type::Array(b)) => {
                if a.is_primitive() || b.is_primitive() {
                    a == b
                } else {
                    a.is_assignable_from(b)
                }
            }
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_name())
    }
}

//! Contracts: the set of method signatures a handler exposes.
//!
//! A contract is built once (typically in a `OnceLock`) and shared. It keeps
//! its methods in declaration order plus an index by (name, arity), so
//! resolution only ever looks at methods that could possibly match.

use super::args::Args;
use crate::value::{Exception, Type, Value};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// What a method body returns.
pub type MethodResult = std::result::Result<Value, Exception>;

type InstanceBody = Arc<dyn Fn(&dyn Any, Args) -> MethodResult + Send + Sync>;
type StaticBody = Arc<dyn Fn(Args) -> MethodResult + Send + Sync>;

#[derive(Clone)]
pub(crate) enum Body {
    Instance(InstanceBody),
    Static(StaticBody),
}

/// Whether a method needs an instance to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Instance,
    Static,
}

/// One method signature, with its implementation when it has one.
#[derive(Clone)]
pub struct Method {
    name: String,
    params: Vec<Type>,
    kind: MethodKind,
    declaring_type: String,
    body: Option<Body>,
}

impl Method {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Type] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    pub fn is_static(&self) -> bool {
        self.kind == MethodKind::Static
    }

    /// Name of the contract that declared this method.
    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Whether every argument can be passed to the matching parameter.
    pub fn accepts(&self, args: &[Value]) -> bool {
        self.params.len() == args.len()
            && self.params.iter().zip(args).all(|(p, a)| p.accepts(a))
    }

    /// Same name, parameter list and kind.
    pub fn same_signature(&self, other: &Method) -> bool {
        self.name == other.name && self.params == other.params && self.kind == other.kind
    }

    /// `name(type, type)` rendering used in diagnostics.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.params.iter().map(Type::canonical_name).collect();
        format!("{}({})", self.name, params.join(", "))
    }

    pub(crate) fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("signature", &self.signature())
            .field("kind", &self.kind)
            .field("declaring_type", &self.declaring_type)
            .field("has_body", &self.has_body())
            .finish()
    }
}

/// A named set of method signatures.
pub struct Contract {
    name: String,
    implements: Vec<String>,
    methods: Vec<Method>,
    index: HashMap<(String, usize), Vec<usize>>,
}

impl Contract {
    /// Start a contract for handler type `T`.
    pub fn builder<T: Any + Send + Sync>(name: impl Into<String>) -> ContractBuilder<T> {
        ContractBuilder {
            name: name.into(),
            implements: Vec::new(),
            methods: Vec::new(),
            _handler: PhantomData,
        }
    }

    /// Start an interface: instance signatures without bodies.
    pub fn interface(name: impl Into<String>) -> InterfaceBuilder {
        InterfaceBuilder {
            name: name.into(),
            extends: Vec::new(),
            methods: Vec::new(),
        }
    }

    fn new(name: String, implements: Vec<String>, methods: Vec<Method>) -> Arc<Self> {
        let mut index: HashMap<(String, usize), Vec<usize>> = HashMap::new();
        for (i, method) in methods.iter().enumerate() {
            index
                .entry((method.name.clone(), method.arity()))
                .or_default()
                .push(i);
        }
        Arc::new(Self {
            name,
            implements,
            methods,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Contracts this one declares it implements, including every
    /// interface those extend when they were given as contracts.
    pub fn implements(&self) -> &[String] {
        &self.implements
    }

    /// Whether this contract is `name`, implements it, or implements an
    /// interface that extends it.
    pub fn is_or_implements(&self, name: &str) -> bool {
        self.name == name || self.implements.iter().any(|i| i == name)
    }

    /// Methods in declaration order.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn method(&self, index: usize) -> Option<&Method> {
        self.methods.get(index)
    }

    /// Indices of methods called `name` taking `arity` arguments, in
    /// declaration order.
    pub fn candidates(&self, name: &str, arity: usize) -> &[usize] {
        self.index
            .get(&(name.to_string(), arity))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Index of the implemented method with the same signature as `wanted`.
    pub fn implementation_of(&self, wanted: &Method) -> Option<usize> {
        self.candidates(&wanted.name, wanted.arity())
            .iter()
            .copied()
            .find(|&i| self.methods[i].same_signature(wanted) && self.methods[i].has_body())
    }
}

impl fmt::Debug for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contract")
            .field("name", &self.name)
            .field("implements", &self.implements)
            .field("methods", &self.methods)
            .finish()
    }
}

/// Builder for a handler type's own contract.
pub struct ContractBuilder<T> {
    name: String,
    implements: Vec<String>,
    methods: Vec<Method>,
    _handler: PhantomData<fn(&T)>,
}

impl<T: Any + Send + Sync> ContractBuilder<T> {
    /// Declare that `T` satisfies the contract called `name`.
    ///
    /// Only the name is recorded; use [`implements_interface`] so that the
    /// interfaces it extends are implemented too.
    ///
    /// [`implements_interface`]: ContractBuilder::implements_interface
    pub fn implements(mut self, name: impl Into<String>) -> Self {
        push_unique(&mut self.implements, name.into());
        self
    }

    /// Declare that `T` satisfies `interface` and everything it extends.
    pub fn implements_interface(mut self, interface: &Contract) -> Self {
        push_unique(&mut self.implements, interface.name.clone());
        for name in &interface.implements {
            push_unique(&mut self.implements, name.clone());
        }
        self
    }

    /// Add an instance method.
    pub fn method<F>(mut self, name: &str, params: Vec<Type>, body: F) -> Self
    where
        F: Fn(&T, Args) -> MethodResult + Send + Sync + 'static,
    {
        let type_name = self.name.clone();
        let body: InstanceBody = Arc::new(move |instance: &dyn Any, args: Args| {
            match instance.downcast_ref::<T>() {
                Some(handler) => body(handler, args),
                None => Err(Exception::new(
                    "ClassCastException",
                    format!("instance is not a {}", type_name),
                )),
            }
        });
        self.methods.push(Method {
            name: name.to_string(),
            params,
            kind: MethodKind::Instance,
            declaring_type: self.name.clone(),
            body: Some(Body::Instance(body)),
        });
        self
    }

    /// Add a static method.
    pub fn static_method<F>(mut self, name: &str, params: Vec<Type>, body: F) -> Self
    where
        F: Fn(Args) -> MethodResult + Send + Sync + 'static,
    {
        self.methods.push(Method {
            name: name.to_string(),
            params,
            kind: MethodKind::Static,
            declaring_type: self.name.clone(),
            body: Some(Body::Static(Arc::new(body))),
        });
        self
    }

    pub fn build(self) -> Arc<Contract> {
        Contract::new(self.name, self.implements, self.methods)
    }
}

/// Builder for an interface contract.
pub struct InterfaceBuilder {
    name: String,
    extends: Vec<Arc<Contract>>,
    methods: Vec<Method>,
}

impl InterfaceBuilder {
    /// Inherit the instance signatures of `parent` and everything it extends.
    pub fn extends(mut self, parent: &Arc<Contract>) -> Self {
        self.extends.push(parent.clone());
        self
    }

    /// Declare an instance signature; implementors supply the body.
    pub fn method(mut self, name: &str, params: Vec<Type>) -> Self {
        self.methods.push(Method {
            name: name.to_string(),
            params,
            kind: MethodKind::Instance,
            declaring_type: self.name.clone(),
            body: None,
        });
        self
    }

    /// Add a static method belonging to the interface itself.
    pub fn static_method<F>(mut self, name: &str, params: Vec<Type>, body: F) -> Self
    where
        F: Fn(Args) -> MethodResult + Send + Sync + 'static,
    {
        self.methods.push(Method {
            name: name.to_string(),
            params,
            kind: MethodKind::Static,
            declaring_type: self.name.clone(),
            body: Some(Body::Static(Arc::new(body))),
        });
        self
    }

    /// Own methods come first, then inherited instance signatures the
    /// interface does not redeclare. Statics are not inherited.
    pub fn build(self) -> Arc<Contract> {
        let mut implements = Vec::new();
        let mut methods = self.methods;
        for parent in &self.extends {
            push_unique(&mut implements, parent.name.clone());
            for name in &parent.implements {
                push_unique(&mut implements, name.clone());
            }
            for method in parent.methods.iter().filter(|m| !m.is_static()) {
                if !methods.iter().any(|m| m.same_signature(method)) {
                    methods.push(method.clone());
                }
            }
        }
        Contract::new(self.name, implements, methods)
    }
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}

//! Dispatch targets: a handler instance seen through an exposed contract.

use super::args::Args;
use super::contract::{Body, Contract, Method};
use crate::config::DispatchConfig;
use crate::rpc::RpcHandler;
use crate::value::{Exception, Value};
use crate::{Result, RpcError};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Handler types that publish their own contract.
pub trait Dispatchable: Any + Send + Sync {
    fn contract(&self) -> Arc<Contract>;
}

/// What to do when several overloads accept the same arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbiguityPolicy {
    /// Take the first in declaration order and log a warning.
    FirstDeclared,
    /// Fail with [`RpcError::AmbiguousMethod`].
    Reject,
}

impl Default for AmbiguityPolicy {
    fn default() -> Self {
        DispatchConfig::DEFAULT_AMBIGUITY_POLICY
    }
}

/// Handler instance plus the contract callers may see.
pub struct DispatchTarget {
    instance: Arc<dyn Any + Send + Sync>,
    own: Arc<Contract>,
    exposed: Arc<Contract>,
    /// For each exposed method, the index of the instance's own
    /// implementation (instance methods only).
    bindings: Vec<Option<usize>>,
    policy: AmbiguityPolicy,
}

impl std::fmt::Debug for DispatchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTarget")
            .field("instance", &self.own.name())
            .field("exposed", &self.exposed.name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl DispatchTarget {
    /// Expose the instance's whole contract.
    pub fn new<T: Dispatchable>(instance: Arc<T>) -> Self {
        let own = instance.contract();
        let bindings = own
            .methods()
            .iter()
            .enumerate()
            .map(|(i, m)| (!m.is_static()).then_some(i))
            .collect();
        Self {
            instance,
            exposed: own.clone(),
            own,
            bindings,
            policy: AmbiguityPolicy::default(),
        }
    }

    /// Expose only `contract`, which the instance must implement in full.
    pub fn with_contract<T: Dispatchable>(contract: Arc<Contract>, instance: Arc<T>) -> Result<Self> {
        let own = instance.contract();
        if !own.is_or_implements(contract.name()) {
            return Err(RpcError::Construction {
                message: format!("{} does not implement {}", own.name(), contract.name()),
            });
        }

        let mut bindings = Vec::with_capacity(contract.methods().len());
        for method in contract.methods() {
            if method.is_static() {
                if !method.has_body() {
                    return Err(RpcError::Construction {
                        message: format!(
                            "static method {} of {} has no body",
                            method.signature(),
                            contract.name()
                        ),
                    });
                }
                bindings.push(None);
                continue;
            }
            match own.implementation_of(method) {
                Some(index) => bindings.push(Some(index)),
                None => {
                    return Err(RpcError::Construction {
                        message: format!(
                            "{} has no implementation of {}.{}",
                            own.name(),
                            contract.name(),
                            method.signature()
                        ),
                    })
                }
            }
        }

        Ok(Self {
            instance,
            own,
            exposed: contract,
            bindings,
            policy: AmbiguityPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> AmbiguityPolicy {
        self.policy
    }

    pub fn contract(&self) -> &Arc<Contract> {
        &self.exposed
    }

    /// Resolve and invoke `method` using the exposed contract's name in
    /// diagnostics.
    pub fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        self.dispatch(self.exposed.name(), method, args)
    }

    /// Resolve `method` against `args` and run it.
    pub fn dispatch(&self, destination: &str, method: &str, args: Vec<Value>) -> Result<Value> {
        let index = self.resolve(destination, method, &args)?;
        let exposed = &self.exposed.methods()[index];
        debug!("Dispatching {} to {}", exposed.signature(), destination);

        let body = match self.bindings[index] {
            Some(own_index) => self.own.method(own_index).and_then(Method::body),
            None => exposed.body(),
        }
        .ok_or_else(|| RpcError::Construction {
            message: format!("{} has no body", exposed.signature()),
        })?;

        let args = Args::new(args);
        let outcome = catch_unwind(AssertUnwindSafe(|| match body {
            Body::Instance(f) => f(self.instance.as_ref(), args),
            Body::Static(f) => f(args),
        }));
        let cause = match outcome {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(exception)) => exception,
            Err(payload) => Exception::from_panic(payload.as_ref()),
        };
        Err(RpcError::Invocation {
            destination: destination.to_string(),
            method: method.to_string(),
            cause,
        })
    }

    fn resolve(&self, destination: &str, method: &str, args: &[Value]) -> Result<usize> {
        let candidates = self.exposed.candidates(method, args.len());
        let matching = |want_static: bool| -> Vec<usize> {
            candidates
                .iter()
                .copied()
                .filter(|&i| {
                    let m = &self.exposed.methods()[i];
                    m.is_static() == want_static && m.accepts(args)
                })
                .collect()
        };

        let mut found = matching(false);
        if found.is_empty() {
            found = matching(true);
        }

        match found.as_slice() {
            [] => Err(RpcError::MethodNotFound {
                destination: destination.to_string(),
                method: method.to_string(),
                arg_types: args
                    .iter()
                    .map(Value::type_label)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
            [only] => Ok(*only),
            [first, ..] => {
                let signatures = found
                    .iter()
                    .map(|&i| self.exposed.methods()[i].signature())
                    .collect::<Vec<_>>()
                    .join("; ");
                match self.policy {
                    AmbiguityPolicy::FirstDeclared => {
                        warn!(
                            "Ambiguous call to {} on {}, using first declared of: {}",
                            method, destination, signatures
                        );
                        Ok(*first)
                    }
                    AmbiguityPolicy::Reject => Err(RpcError::AmbiguousMethod {
                        destination: destination.to_string(),
                        method: method.to_string(),
                        candidates: signatures,
                    }),
                }
            }
        }
    }
}

impl RpcHandler for DispatchTarget {
    /// The first argument names the method; the rest are its arguments.
    fn handle(&self, destination: &str, mut args: Vec<Value>) -> Result<Value> {
        if args.is_empty() {
            return Err(RpcError::unsupported(format!(
                "call to {} is missing the method name",
                destination
            )));
        }
        let method = match args.remove(0) {
            Value::Str(name) => name,
            other => {
                return Err(RpcError::unsupported(format!(
                    "method name must be a string, got {}",
                    other.type_label()
                )))
            }
        };
        self.dispatch(destination, &method, args)
    }
}

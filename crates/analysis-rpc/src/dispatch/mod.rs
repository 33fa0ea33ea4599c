//! Dynamic dispatch of calls onto typed handlers.
//!
//! A call arrives as a method name plus already-unflattened [`Value`]s.
//! Resolution:
//!
//! 1. Take the exposed contract's methods with that name and arity.
//! 2. Keep instance methods whose parameters accept every argument
//!    (see [`Type::accepts`]).
//! 3. If none match, try static methods declared on the exposed contract.
//! 4. No match fails with [`RpcError::MethodNotFound`]; several matches are
//!    settled by the target's [`AmbiguityPolicy`].
//!
//! The resolved method runs the instance's own implementation even when the
//! target exposes a narrower interface. Errors and panics raised by the body
//! come back as [`RpcError::Invocation`].
//!
//! [`Value`]: crate::value::Value
//! [`Type::accepts`]: crate::value::Type::accepts
//! [`RpcError::MethodNotFound`]: crate::RpcError::MethodNotFound
//! [`RpcError::Invocation`]: crate::RpcError::Invocation

mod args;
mod contract;
mod target;

pub use args::Args;
pub use contract::{Contract, ContractBuilder, InterfaceBuilder, Method, MethodKind, MethodResult};
pub use target::{AmbiguityPolicy, DispatchTarget, Dispatchable};

//! Analysis RPC - exchange scientific objects between processes.
//!
//! A dynamically-typed client sends calls as trees of XML-RPC style values.
//! This crate converts those trees to and from native values (the flattening
//! engine), routes calls to named destinations, and resolves overloaded
//! methods on typed handlers at runtime (the dispatcher).
//!
//! # Example
//!
//! ```rust,ignore
//! use analysis_rpc::rpc::{handler_fn, start_server, AnalysisRpcClient, AnalysisRpcServer};
//! use analysis_rpc::Value;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> analysis_rpc::Result<()> {
//!     let server = Arc::new(AnalysisRpcServer::new());
//!     server.add_handler("len", handler_fn(|args| Ok(Value::Int(args.len() as i32))));
//!     let handle = start_server(server, "127.0.0.1", 0).await?;
//!
//!     let client = AnalysisRpcClient::connect("127.0.0.1", handle.port())?;
//!     let n = client.request("len", vec![Value::from("a"), Value::Null]).await?;
//!     assert_eq!(n, Value::Int(2));
//!     Ok(())
//! }
//! ```

pub mod beans;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod flatten;
pub mod rpc;
pub mod value;
pub mod wire;

// Re-export commonly used types
pub use dispatch::{AmbiguityPolicy, Args, Contract, DispatchTarget, Dispatchable};
pub use error::{FaultKind, Result, RpcError};
pub use flatten::{flattener, Flattener, RootFlattener, SelfFlattening};
pub use rpc::{AnalysisRpcClient, AnalysisRpcServer, RpcHandler};
pub use value::{Exception, NativeObject, Object, Type, TypedNone, Value};
pub use wire::WireValue;

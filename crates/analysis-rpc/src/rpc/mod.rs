//! RPC plumbing: server-side handler, HTTP server, transports and client.
//!
//! The transport exposes three methods under the `Analysis` handler name:
//! `Analysis.handler(destination, args)`,
//! `Analysis.handler_debug(destination, args, suspend)` and
//! `Analysis.is_alive()`.

mod client;
mod handler;
pub mod protocol;
pub mod server;
mod transport;

pub use client::AnalysisRpcClient;
pub use handler::{handler_fn, AnalysisRpcServer, DebugHook, FnHandler, RpcHandler};
pub use server::{start_server, RpcServerHandle};
pub use transport::{HttpTransport, LoopbackTransport, Transport};

//! Server-side call handling.
//!
//! [`AnalysisRpcServer`] owns the destination table. Every call is
//! unflattened, routed to the destination's [`RpcHandler`], and the result
//! (or a fault record describing the failure) is flattened back. Callers of
//! [`AnalysisRpcServer::handle`] always get a wire value; errors never
//! escape as transport failures.

use super::protocol::{ProtocolError, INVALID_PARAMS_CODE, METHOD_NOT_FOUND_CODE};
use crate::config::RpcConfig;
use crate::dispatch::MethodResult;
use crate::flatten::helpers::ExceptionHelper;
use crate::flatten::{flattener, RootFlattener};
use crate::value::{Exception, Value};
use crate::wire::WireValue;
use crate::{Result, RpcError};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, warn};

/// Method label used when a plain handler (not a dispatch target) fails.
const HANDLER_LABEL: &str = "handler";

/// Something that can serve calls for a destination.
pub trait RpcHandler: Send + Sync {
    fn handle(&self, destination: &str, args: Vec<Value>) -> Result<Value>;
}

/// Adapter turning a closure into an [`RpcHandler`].
pub struct FnHandler<F>(F);

impl<F> RpcHandler for FnHandler<F>
where
    F: Fn(Vec<Value>) -> MethodResult + Send + Sync,
{
    fn handle(&self, destination: &str, args: Vec<Value>) -> Result<Value> {
        (self.0)(args).map_err(|cause| RpcError::Invocation {
            destination: destination.to_string(),
            method: HANDLER_LABEL.to_string(),
            cause,
        })
    }
}

/// Wrap a closure as a shareable handler.
pub fn handler_fn<F>(f: F) -> Arc<dyn RpcHandler>
where
    F: Fn(Vec<Value>) -> MethodResult + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

/// Hook run before a debug call is dispatched, e.g. to attach a debugger.
pub trait DebugHook: Send + Sync {
    fn attach(&self, destination: &str, suspend: bool) -> std::result::Result<(), Exception>;
}

/// Destination table plus the flattening around each call.
pub struct AnalysisRpcServer {
    handlers: RwLock<HashMap<String, Arc<dyn RpcHandler>>>,
    debug_hook: RwLock<Option<Arc<dyn DebugHook>>>,
    root: Arc<RootFlattener>,
}

impl Default for AnalysisRpcServer {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisRpcServer {
    /// Server using the process-wide root flattener.
    pub fn new() -> Self {
        Self::with_flattener(flattener())
    }

    pub fn with_flattener(root: Arc<RootFlattener>) -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            debug_hook: RwLock::new(None),
            root,
        }
    }

    pub fn flattener(&self) -> &Arc<RootFlattener> {
        &self.root
    }

    /// Register `handler` for `destination`, returning any handler it replaces.
    pub fn add_handler(
        &self,
        destination: impl Into<String>,
        handler: Arc<dyn RpcHandler>,
    ) -> Option<Arc<dyn RpcHandler>> {
        let destination = destination.into();
        debug!("Registering handler for destination {}", destination);
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(destination, handler)
    }

    pub fn remove_handler(&self, destination: &str) -> Option<Arc<dyn RpcHandler>> {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(destination)
    }

    /// Registered destination names, sorted.
    pub fn destinations(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn handler(&self, destination: &str) -> Option<Arc<dyn RpcHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(destination)
            .cloned()
    }

    pub fn set_debug_hook(&self, hook: Option<Arc<dyn DebugHook>>) {
        *self
            .debug_hook
            .write()
            .unwrap_or_else(PoisonError::into_inner) = hook;
    }

    /// Run a call and flatten its result or fault.
    pub fn handle(&self, destination: &str, args: Vec<WireValue>) -> WireValue {
        debug!("Handling call to {} with {} args", destination, args.len());
        match self.call(destination, &args) {
            Ok(result) => result,
            Err(e) => self.fault(destination, &e),
        }
    }

    /// Like [`handle`](Self::handle), giving the debug hook a chance to run
    /// first. Hook failures are logged and the call proceeds.
    pub fn handle_debug(&self, destination: &str, args: Vec<WireValue>, suspend: bool) -> WireValue {
        let hook = self
            .debug_hook
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(hook) = hook {
            if let Err(e) = hook.attach(destination, suspend) {
                warn!("Debug hook failed for {}: {}", destination, e);
            }
        }
        self.handle(destination, args)
    }

    pub fn is_alive(&self) -> WireValue {
        WireValue::Bool(true)
    }

    /// Route a transport-level method (`Analysis.handler`, ...) to the
    /// matching entry point.
    pub fn dispatch_request(
        &self,
        method: &str,
        params: Vec<WireValue>,
    ) -> std::result::Result<WireValue, ProtocolError> {
        match method {
            RpcConfig::HANDLER_METHOD => {
                let (destination, args, _) = call_params(method, params, false)?;
                Ok(self.handle(&destination, args))
            }
            RpcConfig::HANDLER_DEBUG_METHOD => {
                let (destination, args, suspend) = call_params(method, params, true)?;
                Ok(self.handle_debug(&destination, args, suspend))
            }
            RpcConfig::IS_ALIVE_METHOD => Ok(self.is_alive()),
            other => Err(ProtocolError {
                code: METHOD_NOT_FOUND_CODE,
                message: format!("Unknown method: {}", other),
            }),
        }
    }

    fn call(&self, destination: &str, args: &[WireValue]) -> Result<WireValue> {
        let args = self.root.unflatten_all(args)?;
        let handler = self
            .handler(destination)
            .ok_or_else(|| RpcError::DestinationNotFound {
                destination: destination.to_string(),
            })?;
        let result = catch_unwind(AssertUnwindSafe(|| handler.handle(destination, args)))
            .map_err(|payload| RpcError::Invocation {
                destination: destination.to_string(),
                method: HANDLER_LABEL.to_string(),
                cause: Exception::from_panic(payload.as_ref()),
            })??;
        self.root.flatten(&result)
    }

    fn fault(&self, destination: &str, err: &RpcError) -> WireValue {
        error!("Call to {} failed: {}", destination, err);
        let fault = err.to_fault();
        match self.root.flatten(&Value::Exception(fault.clone())) {
            Ok(wire) => wire,
            Err(e) => {
                error!("Failed to flatten fault for {}: {}", destination, e);
                ExceptionHelper::bare_record(&fault)
            }
        }
    }
}

fn invalid_params(method: &str, message: &str) -> ProtocolError {
    ProtocolError {
        code: INVALID_PARAMS_CODE,
        message: format!("{}: {}", method, message),
    }
}

// (destination, args, suspend) from `handler` / `handler_debug` params.
fn call_params(
    method: &str,
    params: Vec<WireValue>,
    debug: bool,
) -> std::result::Result<(String, Vec<WireValue>, bool), ProtocolError> {
    let mut params = params.into_iter();
    let destination = match params.next() {
        Some(WireValue::Text(destination)) => destination,
        _ => return Err(invalid_params(method, "destination must be a string")),
    };
    let args = match params.next() {
        Some(WireValue::Sequence(args)) => args,
        None => Vec::new(),
        Some(_) => return Err(invalid_params(method, "arguments must be an array")),
    };
    let suspend = match params.next() {
        Some(WireValue::Bool(suspend)) if debug => suspend,
        None => false,
        Some(_) => return Err(invalid_params(method, "unexpected trailing parameter")),
    };
    if params.next().is_some() {
        return Err(invalid_params(method, "too many parameters"));
    }
    Ok((destination, args, suspend))
}

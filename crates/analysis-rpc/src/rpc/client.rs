//! Client side of the RPC boundary.

use super::transport::{HttpTransport, Transport};
use crate::config::RpcConfig;
use crate::flatten::{flattener, RootFlattener};
use crate::value::Value;
use crate::wire::WireValue;
use crate::{Result, RpcError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Flattens calls onto a [`Transport`] and turns fault replies back into
/// errors.
pub struct AnalysisRpcClient<T: Transport = HttpTransport> {
    transport: T,
    root: Arc<RootFlattener>,
}

impl AnalysisRpcClient<HttpTransport> {
    /// HTTP client for a server on `host:port`.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        Ok(Self::new(HttpTransport::new(host, port)?))
    }
}

impl<T: Transport> AnalysisRpcClient<T> {
    /// Client using the process-wide root flattener.
    pub fn new(transport: T) -> Self {
        Self::with_flattener(transport, flattener())
    }

    pub fn with_flattener(transport: T, root: Arc<RootFlattener>) -> Self {
        Self { transport, root }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Call `destination` with `args`.
    ///
    /// A reply that unflattens to an exception is returned as
    /// [`RpcError::Remote`].
    pub async fn request(&self, destination: &str, args: Vec<Value>) -> Result<Value> {
        let params = self.params(destination, &args)?;
        let reply = self.transport.call(RpcConfig::HANDLER_METHOD, params).await?;
        self.interpret(reply)
    }

    /// Like [`request`](Self::request), asking the server to run its debug
    /// hook first.
    pub async fn request_debug(
        &self,
        destination: &str,
        args: Vec<Value>,
        suspend: bool,
    ) -> Result<Value> {
        let mut params = self.params(destination, &args)?;
        params.push(WireValue::Bool(suspend));
        let reply = self
            .transport
            .call(RpcConfig::HANDLER_DEBUG_METHOD, params)
            .await?;
        self.interpret(reply)
    }

    /// Call `method` on a dispatcher-backed destination.
    pub async fn call(&self, destination: &str, method: &str, args: Vec<Value>) -> Result<Value> {
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(Value::from(method));
        full.extend(args);
        self.request(destination, full).await
    }

    pub async fn is_alive(&self) -> Result<bool> {
        match self.transport.call(RpcConfig::IS_ALIVE_METHOD, Vec::new()).await? {
            WireValue::Bool(alive) => Ok(alive),
            other => Err(RpcError::malformed(format!(
                "is_alive returned {}",
                other.describe()
            ))),
        }
    }

    /// Poll [`is_alive`](Self::is_alive) until the server answers or
    /// `timeout` elapses.
    pub async fn wait_until_alive(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.is_alive().await {
                Ok(true) => return Ok(()),
                Ok(false) => debug!("Server reports not alive yet"),
                Err(e) => debug!("Server not reachable yet: {}", e),
            }
            if Instant::now() >= deadline {
                return Err(RpcError::Transport {
                    message: format!("Server did not become alive within {:?}", timeout),
                });
            }
            tokio::time::sleep(RpcConfig::ALIVE_POLL_INTERVAL).await;
        }
    }

    fn params(&self, destination: &str, args: &[Value]) -> Result<Vec<WireValue>> {
        debug!("Calling {} with {} args", destination, args.len());
        Ok(vec![
            WireValue::Text(destination.to_string()),
            WireValue::Sequence(self.root.flatten_all(args)?),
        ])
    }

    fn interpret(&self, reply: WireValue) -> Result<Value> {
        match self.root.unflatten(&reply)? {
            Value::Exception(fault) => Err(RpcError::from_fault(fault)),
            value => Ok(value),
        }
    }
}

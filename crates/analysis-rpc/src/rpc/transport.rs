//! Client-side transports.

use super::handler::AnalysisRpcServer;
use super::protocol::{RpcRequest, RpcResponse};
use crate::config::RpcConfig;
use crate::wire::WireValue;
use crate::{Result, RpcError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Carries one transport-level call (`Analysis.handler`, ...) to a server.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, method: &str, params: Vec<WireValue>) -> Result<WireValue>;
}

/// JSON-RPC over HTTP POST to the server's RPC path.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpTransport {
    /// Transport using [`RpcConfig::REQUEST_TIMEOUT`].
    pub fn new(host: &str, port: u16) -> Result<Self> {
        Self::with_timeout(host, port, RpcConfig::REQUEST_TIMEOUT)
    }

    pub fn with_timeout(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(RpcConfig::CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: format!("http://{}:{}{}", host, port, RpcConfig::RPC_PATH),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, method: &str, params: Vec<WireValue>) -> Result<WireValue> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(method, params, id);
        debug!("POST {} ({} #{})", self.url, method, id);

        let response: RpcResponse = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(RpcError::Transport {
                message: format!("{} (code {})", err.message, err.code),
            });
        }
        response.result.ok_or_else(|| RpcError::Transport {
            message: format!("Response to {} is missing a result", method),
        })
    }
}

/// In-process transport straight into a server handler.
#[derive(Clone)]
pub struct LoopbackTransport {
    server: Arc<AnalysisRpcServer>,
}

impl LoopbackTransport {
    pub fn new(server: Arc<AnalysisRpcServer>) -> Self {
        Self { server }
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn call(&self, method: &str, params: Vec<WireValue>) -> Result<WireValue> {
        let server = self.server.clone();
        let method = method.to_string();
        tokio::task::spawn_blocking(move || server.dispatch_request(&method, params))
            .await
            .map_err(|e| RpcError::Transport {
                message: format!("Loopback call failed: {}", e),
            })?
            .map_err(|err| RpcError::Transport {
                message: format!("{} (code {})", err.message, err.code),
            })
    }
}

//! HTTP server implementation using Axum.

use super::handler::AnalysisRpcServer;
use super::protocol::{RpcRequest, RpcResponse, INTERNAL_ERROR_CODE, PARSE_ERROR_CODE};
use crate::config::RpcConfig;
use crate::{Result, RpcError};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Handle to a running server. Dropping shuts the server down.
pub struct RpcServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl RpcServerHandle {
    /// Address the server is bound to (useful when port=0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Stop accepting requests; in-flight requests are allowed to finish.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Shut down and wait for the serve task to exit.
    pub async fn stopped(mut self) {
        self.shutdown();
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for RpcServerHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

/// Router serving `server` on the RPC and health endpoints.
pub fn router(server: Arc<AnalysisRpcServer>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(RpcConfig::HEALTH_PATH, get(handle_health))
        .route(RpcConfig::RPC_PATH, post(handle_rpc))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

/// Start the HTTP server in the background.
pub async fn start_server(
    server: Arc<AnalysisRpcServer>,
    host: &str,
    port: u16,
) -> Result<RpcServerHandle> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| RpcError::Transport {
            message: format!("Invalid listen address {}:{}: {}", host, port, e),
        })?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;
    info!("Analysis RPC server listening on {}", actual_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let app = router(server);
    let task_handle = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
        match result {
            Ok(()) => info!("Analysis RPC server stopped"),
            Err(e) => error!("Analysis RPC server error: {}", e),
        }
    });

    Ok(RpcServerHandle {
        addr: actual_addr,
        shutdown_tx: Some(shutdown_tx),
        task_handle: Some(task_handle),
    })
}

/// Health check endpoint.
async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// RPC endpoint. Calls run on the blocking pool since handlers are sync.
async fn handle_rpc(
    State(server): State<Arc<AnalysisRpcServer>>,
    body: String,
) -> impl IntoResponse {
    let request: RpcRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            return (
                StatusCode::OK,
                Json(RpcResponse::error(
                    None,
                    PARSE_ERROR_CODE,
                    format!("Parse error: {}", e),
                )),
            );
        }
    };

    let id = request.id.clone();
    let method = request.method;
    debug!("RPC call: {} with {} params", method, request.params.len());

    let params = request.params;
    let call = {
        let method = method.clone();
        tokio::task::spawn_blocking(move || server.dispatch_request(&method, params))
    };

    let response = match call.await {
        Ok(Ok(result)) => RpcResponse::success(id, result),
        Ok(Err(e)) => {
            error!("RPC error for {}: {}", method, e.message);
            RpcResponse::error(id, e.code, e.message)
        }
        Err(e) => {
            error!("RPC task for {} failed: {}", method, e);
            RpcResponse::error(id, INTERNAL_ERROR_CODE, format!("Internal error: {}", e))
        }
    };
    (StatusCode::OK, Json(response))
}

//! Centralized configuration for the analysis RPC boundary.
//!
//! Constants for the transport endpoint, temp-file spooling and dispatch
//! defaults. Runtime overrides live on the objects that use them (temp
//! location on the root flattener, timeout on the HTTP transport, ambiguity
//! policy on the dispatch target).

use std::time::Duration;

/// Transport and server configuration.
pub struct RpcConfig;

impl RpcConfig {
    /// Handler name prefixed to every transport method (`Analysis.handler`).
    pub const HANDLER_NAME: &'static str = "Analysis";
    pub const HANDLER_METHOD: &'static str = "Analysis.handler";
    pub const HANDLER_DEBUG_METHOD: &'static str = "Analysis.handler_debug";
    pub const IS_ALIVE_METHOD: &'static str = "Analysis.is_alive";

    /// XML-RPC style endpoint path.
    pub const RPC_PATH: &'static str = "/RPC2";
    pub const HEALTH_PATH: &'static str = "/health";

    pub const DEFAULT_HOST: &'static str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 8714;

    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
    pub const ALIVE_POLL_INTERVAL: Duration = Duration::from_millis(100);
}

/// Flattening and temp-file spooling configuration.
pub struct FlatteningConfig;

impl FlatteningConfig {
    pub const TEMP_FILE_PREFIX: &'static str = "scisofttmp-";
    pub const DATASET_FILE_SUFFIX: &'static str = ".npy";
    /// Encoded datasets larger than this are spooled to a temp file.
    pub const INLINE_DATASET_LIMIT: usize = 64 * 1024;
    /// Spooled files older than this are removed by the sweeper.
    pub const SPOOL_MAX_AGE: Duration = Duration::from_secs(3600);
    pub const SPOOL_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
}

/// Dispatcher defaults.
pub struct DispatchConfig;

impl DispatchConfig {
    pub const DEFAULT_AMBIGUITY_POLICY: crate::dispatch::AmbiguityPolicy =
        crate::dispatch::AmbiguityPolicy::FirstDeclared;
}

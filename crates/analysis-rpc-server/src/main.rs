//! Analysis RPC Server - standalone HTTP endpoint for analysis destinations.
//!
//! Serves a few diagnostic destinations (`echo`, `cat`, `len`) so dynamic
//! clients can check connectivity and value round-trips.

use analysis_rpc::config::RpcConfig;
use analysis_rpc::rpc::{handler_fn, start_server, AnalysisRpcServer};
use analysis_rpc::{Exception, Value};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "analysis-rpc-server")]
#[command(about = "HTTP server for analysis RPC destinations")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value_t = RpcConfig::DEFAULT_PORT)]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = RpcConfig::DEFAULT_HOST)]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Directory for spooled dataset files (defaults to the system temp dir)
    #[arg(long)]
    temp_location: Option<PathBuf>,
}

fn register_builtin_handlers(server: &AnalysisRpcServer) {
    server.add_handler("echo", handler_fn(|args| Ok(Value::List(args))));
    server.add_handler(
        "cat",
        handler_fn(|args| {
            let mut out = String::new();
            for arg in &args {
                let s = arg.as_str().ok_or_else(|| {
                    Exception::illegal_argument(format!("cannot cat {}", arg.type_label()))
                })?;
                out.push_str(s);
            }
            Ok(Value::Str(out))
        }),
    );
    server.add_handler("len", handler_fn(|args| Ok(Value::Int(args.len() as i32))));
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting Analysis RPC Server");

    let server = Arc::new(AnalysisRpcServer::new());
    if let Some(location) = args.temp_location {
        std::fs::create_dir_all(&location)?;
        info!("Spooling datasets to {}", location.display());
        server.flattener().set_temp_location(Some(location));
    }
    register_builtin_handlers(&server);
    info!("Destinations: {}", server.destinations().join(", "));

    let mut handle = start_server(server, &args.host, args.port).await?;

    // Print port for the launching process to read (intentional stdout)
    println!("RPC_PORT={}", handle.port());

    info!("RPC server running on {}", handle.addr());

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");
    handle.shutdown();

    Ok(())
}

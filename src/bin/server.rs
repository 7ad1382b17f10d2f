//! Graph RPC server binary
//!
//! Run with: cargo run --bin graph-server -- --help

use anyhow::Result;
use clap::Parser;
use graph_rpc_poc::engine::EngineConfig;
use graph_rpc_poc::server::{run_server, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "graph-server")]
#[command(about = "Remote property-graph server")]
struct Args {
    /// gRPC listen address
    #[arg(long, default_value = "[::1]:50051")]
    listen_addr: String,

    /// Skip creating the default graph (id 0) at startup
    #[arg(long, default_value_t = false)]
    no_default_graph: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Number of worker threads for processing requests
    #[arg(long, default_value = "4")]
    worker_threads: usize,
}

async fn run_with_config(args: Args) -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .init();

    let config = ServerConfig {
        listen_addr: args.listen_addr.clone(),
        engine: EngineConfig {
            create_default_graph: !args.no_default_graph,
        },
    };

    tracing::info!("=== Graph RPC Server Configuration ===");
    tracing::info!("Worker threads: {}", args.worker_threads);
    tracing::info!("Listen address: {}", args.listen_addr);
    tracing::info!(
        "Default graph: {}",
        if args.no_default_graph {
            "disabled"
        } else {
            "graph 0"
        }
    );
    tracing::info!("======================================");

    run_server(config).await
}

fn main() -> Result<()> {
    let args = Args::parse();
    let worker_threads = args.worker_threads;

    // Build tokio runtime with specified number of worker threads
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .enable_all()
        .build()?
        .block_on(run_with_config(args))
}

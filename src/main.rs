//! MCP Server Entry Point
//!
//! Initializes logging, loads configuration, builds the server and runs the
//! configured transport until it finishes or the process receives Ctrl-C.
//! Loaded plugins are disposed before exit.

use anyhow::Result;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use dynamic_mcp_server::core::{Config, McpServer, TransportService};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment
    let config = Config::from_env();

    // Initialize logging
    init_logging(&config.logging.level);

    info!("Starting {} v{}", config.server.name, config.server.version);

    // Create the MCP server and load stored bundles
    let server = McpServer::new(config.clone())?;
    server.startup().await;

    info!("Server initialized");

    // Run the transport until it stops or we are interrupted
    let transport = TransportService::new(config.transport);
    tokio::select! {
        result = transport.run(server.clone()) => {
            if let Err(e) = result {
                warn!("Transport stopped with an error: {}", e);
                server.shutdown().await;
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
        }
    }

    info!("Server shutting down");
    server.shutdown().await;

    Ok(())
}

/// Initialize the logging subsystem.
///
/// Logs go to stderr so they never mix with STDIO transport traffic.
/// `RUST_LOG` directives are honoured on top of the configured level.
fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("cranelift_codegen=warn".parse().unwrap_or_else(|_| level.into()))
        .add_directive("wasmtime=warn".parse().unwrap_or_else(|_| level.into()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}

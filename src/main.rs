//! Canvas MCP - Canvas LMS tools for AI assistants
//!
//! Speaks the Model Context Protocol over stdin/stdout. Logs go to stderr so
//! they never mix with protocol traffic.

use std::process;
use std::sync::Arc;

use clap::Parser;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

use canvas_mcp::cache::ResponseCache;
use canvas_mcp::canvas::CanvasClient;
use canvas_mcp::cli::{Cli, ServerConfig};
use canvas_mcp::server::McpServer;
use canvas_mcp::tools::CanvasTools;

/// Sets up the stderr log subscriber, falling back to `info` on a bad filter
fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match ServerConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    init_logging(&config.log_level);
    info!(
        base_url = %config.base_url,
        cache_ttl_secs = config.cache_ttl_secs,
        "starting canvas-mcp {}",
        env!("CARGO_PKG_VERSION")
    );

    let client = CanvasClient::with_timeout(
        &config.base_url,
        config.api_token.clone(),
        config.request_timeout,
    );
    let cache = ResponseCache::new().with_default_ttl(config.cache_ttl_secs);
    let server = McpServer::new(CanvasTools::new(Arc::new(client), cache));

    server
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;
    Ok(())
}

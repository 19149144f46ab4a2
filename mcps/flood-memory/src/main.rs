//! Flood Memory - persistent linked-note memory over MCP
//!
//! `flood-memory` (or `flood-memory stdio`) serves line-delimited JSON-RPC
//! on stdin/stdout; `flood-memory http` serves the same tools at `/mcp`.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mcp_common::{init_tracing, serve_http, serve_stdio, McpHandler};

use flood_memory::{Cli, Command, FloodMemoryServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout belongs to the stdio transport
    init_tracing("flood_memory")?;

    let cli = Cli::parse();
    let db_path = cli.config.db_path();

    let server = FloodMemoryServer::open(&db_path)
        .with_context(|| format!("Failed to open memory store at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "Memory store opened");

    let handler = Arc::new(McpHandler::new(server));

    match cli.command.unwrap_or_default() {
        Command::Stdio => {
            tracing::info!("Starting Flood Memory MCP server on stdio");
            serve_stdio(handler.as_ref()).await?;
        }
        Command::Http => {
            serve_http(handler, cli.config.http()).await?;
        }
    }

    tracing::info!("Flood Memory MCP server stopped");
    Ok(())
}

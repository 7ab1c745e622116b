//! `stakeholder-mcp serve`: MCP over stdio.

use stakeholder_gateway::McpServer;
use std::path::Path;
use tracing::info;

use crate::stack::{build_registry, load_config, CliResult};

pub async fn run(config_path: Option<&Path>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let registry = build_registry(&config).await?;

    info!("Serving MCP on stdio");
    McpServer::new(registry).serve_stdio().await?;
    info!("stdin closed, shutting down");
    Ok(())
}

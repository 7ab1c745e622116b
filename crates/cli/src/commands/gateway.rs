//! `stakeholder-mcp gateway`: start the HTTP API server.

use stakeholder_gateway::GatewayState;
use std::path::Path;
use std::sync::Arc;

use crate::stack::{build_registry, load_config, CliResult};

pub async fn run(config_path: Option<&Path>, port_override: Option<u16>) -> CliResult<()> {
    let mut config = load_config(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    let registry = build_registry(&config).await?;
    let state = Arc::new(GatewayState::new(registry, config.gateway.api_key.clone()));
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    eprintln!("Stakeholder MCP gateway");
    eprintln!("   Listening: {addr}");
    eprintln!("   Auth:      {}", if state.api_key().is_some() { "api key" } else { "open" });

    stakeholder_gateway::start(&addr, state).await
}

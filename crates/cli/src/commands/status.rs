//! `stakeholder-mcp status`: show resolved configuration.

use stakeholder_config::AppConfig;
use stakeholder_core::consultation::LogFilter;
use std::path::Path;

use crate::stack::{load_config, open_log, open_store, CliResult};

pub async fn run(config_path: Option<&Path>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let config_file = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    println!("Stakeholder MCP Status");
    println!("======================");
    let missing = if config_file.exists() { "" } else { " (missing, using defaults)" };
    println!("  Config file:  {}{missing}", config_file.display());
    println!("  Provider:     {}", config.provider.base_url);
    println!("  API key:      {}", if config.has_api_key() { "set" } else { "NOT SET" });
    println!("  Model:        {}", config.provider.default_model);
    println!("  Max tokens:   {}", config.provider.default_max_tokens);
    println!("  Temperature:  {}", config.provider.default_temperature);
    println!(
        "  History:      {:?}, last {} exchange(s)",
        config.history.style, config.history.max_exchanges
    );
    let auth = if config.gateway.api_key.is_some() { "api key" } else { "open" };
    println!("  Gateway:      {}:{} ({auth})", config.gateway.host, config.gateway.port);

    let store = open_store(&config).await?;
    let (config_count, runtime_count) = store.counts().await;
    println!("  Roster:       {}", store.roster_description());
    println!("  Stakeholders: {config_count} config, {runtime_count} runtime");

    match open_log(&config).await? {
        Some(log) => {
            let total = log.count(&LogFilter::default()).await?;
            println!("  Log:          {} ({total} consultation(s))", config.log.db_path.display());
        }
        None => println!("  Log:          disabled"),
    }

    if !config.has_api_key() {
        println!("\n  Set OPENROUTER_API_KEY before running `serve` or `gateway`.");
    }
    Ok(())
}

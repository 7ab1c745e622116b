//! `stakeholder-mcp list`: print the merged roster.

use stakeholder_core::persona::{PersonaFilter, SourceFilter};
use std::path::Path;

use crate::stack::{load_config, open_store, CliResult};

pub async fn run(
    config_path: Option<&Path>,
    role: Option<String>,
    expertise: Option<String>,
    source: Option<String>,
    json: bool,
) -> CliResult<()> {
    let config = load_config(config_path)?;
    let source = source.map(|s| s.parse::<SourceFilter>()).transpose()?;
    let store = open_store(&config).await?;

    let filter = PersonaFilter {
        role,
        expertise,
        source,
    };
    let summaries = store.summaries(&filter).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No stakeholders match.");
        return Ok(());
    }

    for s in &summaries {
        println!("{:<24} {:<8} {} ({})", s.id, s.source.to_string(), s.name, s.role);
        if !s.expertise.is_empty() {
            println!("{:<33} {}", "", s.expertise.join(", "));
        }
    }
    println!("\n{} stakeholder(s)", summaries.len());
    Ok(())
}

//! `stakeholder-mcp log`: print logged consultations.

use stakeholder_core::consultation::LogFilter;
use std::path::Path;

use crate::stack::{load_config, open_log, CliResult};

const PREVIEW_CHARS: usize = 120;

pub struct LogQuery {
    pub stakeholder: Option<String>,
    pub session: Option<String>,
    pub search: Option<String>,
    pub limit: usize,
}

pub async fn run(config_path: Option<&Path>, query: LogQuery, json: bool) -> CliResult<()> {
    let config = load_config(config_path)?;
    let Some(log) = open_log(&config).await? else {
        println!("The consultation log is disabled.");
        return Ok(());
    };

    let filter = LogFilter {
        persona_id: query.stakeholder,
        session_id: query.session,
        search: query.search,
        limit: query.limit.max(1),
        ..LogFilter::default()
    };
    let total = log.count(&filter).await?;
    let exchanges = log.query(&filter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&exchanges)?);
        return Ok(());
    }

    for e in &exchanges {
        println!(
            "#{} {} {} ({}){}",
            e.id,
            e.created_at.format("%Y-%m-%d %H:%M:%S"),
            e.persona_name,
            e.persona_id,
            e.session_id.as_deref().map(|s| format!(" session={s}")).unwrap_or_default()
        );
        println!("  Q: {}", one_line(&e.prompt));
        println!("  A: {}", one_line(&e.response));
    }
    println!("\nShowing {} of {} consultation(s)", exchanges.len(), total);
    Ok(())
}

fn one_line(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let clipped: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{clipped}...")
}

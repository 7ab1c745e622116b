//! stakeholder-mcp: the main entry point.
//!
//! Commands:
//! - `serve`    (default) MCP over stdio
//! - `gateway`  HTTP gateway exposing the same tools
//! - `list`     Print the merged stakeholder roster
//! - `log`      Print logged consultations
//! - `status`   Show resolved configuration and store sizes

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod stack;

#[derive(Parser)]
#[command(
    name = "stakeholder-mcp",
    about = "Consult AI stakeholder personas over MCP or HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to config.toml (defaults to ~/.stakeholder-mcp/config.toml)
    #[arg(short, long, global = true, env = "STAKEHOLDER_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over stdin/stdout
    Serve,

    /// Start the HTTP gateway
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List stakeholders
    List {
        /// Case-insensitive substring of the role
        #[arg(long)]
        role: Option<String>,

        /// Case-insensitive substring of any expertise tag
        #[arg(long)]
        expertise: Option<String>,

        /// config, runtime or all
        #[arg(long)]
        source: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show logged consultations, newest first
    Log {
        #[arg(long)]
        stakeholder: Option<String>,

        #[arg(long)]
        session: Option<String>,

        /// Substring of prompt or response
        #[arg(long)]
        search: Option<String>,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Show system status
    Status,
}

/// Logs go to stderr; stdout carries the MCP stream.
fn init_tracing(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose {
            "debug".to_string()
        } else {
            std::env::var("LOG_LEVEL")
                .ok()
                .map(|l| l.to_ascii_lowercase())
                .filter(|l| matches!(l.as_str(), "debug" | "info" | "warn" | "error"))
                .unwrap_or_else(|| "info".to_string())
        };
        EnvFilter::new(level)
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let config_path = cli.config.as_deref();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve::run(config_path).await?,
        Commands::Gateway { port } => commands::gateway::run(config_path, port).await?,
        Commands::List {
            role,
            expertise,
            source,
            json,
        } => commands::list::run(config_path, role, expertise, source, json).await?,
        Commands::Log {
            stakeholder,
            session,
            search,
            limit,
            json,
        } => {
            let query = commands::log::LogQuery {
                stakeholder,
                session,
                search,
                limit,
            };
            commands::log::run(config_path, query, json).await?
        }
        Commands::Status => commands::status::run(config_path).await?,
    }

    Ok(())
}

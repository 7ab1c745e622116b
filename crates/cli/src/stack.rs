//! Wiring from configuration to a ready tool registry.

use stakeholder_config::AppConfig;
use stakeholder_consult::{HistoryPolicy, Orchestrator};
use stakeholder_core::log::ConsultationLog;
use stakeholder_core::persona::RuntimePersistence;
use stakeholder_core::tool::ToolRegistry;
use stakeholder_log::SqliteLog;
use stakeholder_personas::{JsonFileStore, PersonaStore};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

pub fn load_config(path: Option<&Path>) -> CliResult<AppConfig> {
    AppConfig::load(path).map_err(|e| format!("Failed to load config: {e}").into())
}

pub async fn open_store(config: &AppConfig) -> CliResult<Arc<PersonaStore>> {
    let persistence = config.runtime_store.enabled.then(|| {
        Arc::new(JsonFileStore::new(config.runtime_store.path.clone())) as Arc<dyn RuntimePersistence>
    });
    let store = PersonaStore::open(Arc::new(config.roster_source()), persistence).await?;
    Ok(Arc::new(store))
}

/// `None` when the log is disabled.
pub async fn open_log(config: &AppConfig) -> CliResult<Option<Arc<dyn ConsultationLog>>> {
    if !config.log.enabled {
        info!("Consultation log disabled");
        return Ok(None);
    }
    let log = SqliteLog::open(&config.log.db_path).await?;
    Ok(Some(Arc::new(log)))
}

/// Store, provider, log and orchestrator behind the full tool set.
///
/// Fails before touching any file when no provider key is configured.
pub async fn build_registry(config: &AppConfig) -> CliResult<Arc<ToolRegistry>> {
    let provider = stakeholder_providers::build_from_config(config)?;
    let store = open_store(config).await?;

    let mut orchestrator = Orchestrator::new(store, provider)
        .with_history(HistoryPolicy::from(&config.history))
        .with_preview_chars(config.consult.preview_chars);
    if let Some(log) = open_log(config).await? {
        orchestrator = orchestrator.with_log(log);
    }

    info!(
        provider = orchestrator.provider_name(),
        model = %config.provider.default_model,
        history = ?config.history.style,
        "Orchestrator ready"
    );

    let registry = stakeholder_tools::consultation_registry(Arc::new(orchestrator));
    info!(tools = registry.len(), "Tool registry ready");
    Ok(Arc::new(registry))
}

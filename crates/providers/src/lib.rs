//! Completion provider implementations for stakeholder-mcp.
//!
//! All providers implement the `stakeholder_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use stakeholder_config::AppConfig;
use stakeholder_core::error::ProviderError;
use stakeholder_core::provider::Provider;
use std::sync::Arc;

/// Build the configured provider.
///
/// Fails with `NotConfigured` when no API key is available.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let provider = OpenAiCompatProvider::from_config(&config.provider)?;
    Ok(Arc::new(provider))
}

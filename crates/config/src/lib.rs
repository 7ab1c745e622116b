//! Configuration loading, validation, and management for stakeholder-mcp.
//!
//! Loads configuration from `~/.stakeholder-mcp/config.toml` (or an explicit
//! path) with environment variable overrides. Validates all settings at
//! startup. The persona roster itself lives in a separate YAML file, see
//! [`roster`].

pub mod roster;

pub use roster::YamlRoster;

use serde::{Deserialize, Serialize};
use stakeholder_core::HistoryStyle;
use std::path::{Path, PathBuf};

/// Hard ceiling for `default_max_tokens`, whatever the source.
pub const MAX_TOKENS_CEILING: u32 = 128_000;

/// The root configuration structure.
///
/// Maps directly to `~/.stakeholder-mcp/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Declarative persona roster
    #[serde(default)]
    pub roster: RosterConfig,

    /// Durable consultation log
    #[serde(default)]
    pub log: LogConfig,

    /// Runtime persona persistence
    #[serde(default)]
    pub runtime_store: RuntimeStoreConfig,

    /// Session history reconstruction
    #[serde(default)]
    pub history: HistoryConfig,

    /// Group consultation knobs
    #[serde(default)]
    pub consult: ConsultConfig,

    /// HTTP gateway
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_true() -> bool {
    true
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Sent as `X-Title` for attribution on OpenRouter
    #[serde(default = "default_app_title")]
    pub app_title: String,

    /// Sent as `HTTP-Referer` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_url: Option<String>,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "anthropic/claude-3-haiku".into()
}
fn default_max_tokens() -> u32 {
    8192
}
fn default_temperature() -> f32 {
    0.7
}
fn default_app_title() -> String {
    "Stakeholder MCP Server".into()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            default_model: default_model(),
            default_max_tokens: default_max_tokens(),
            default_temperature: default_temperature(),
            app_title: default_app_title(),
            app_url: None,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("default_temperature", &self.default_temperature)
            .field("app_title", &self.app_title)
            .field("app_url", &self.app_url)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterConfig {
    /// Explicit roster file. When unset the default search paths are tried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data").join("consultations.db")
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeStoreConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_runtime_store_path")]
    pub path: PathBuf,
}

fn default_runtime_store_path() -> PathBuf {
    PathBuf::from("data").join("runtime-stakeholders.json")
}

impl Default for RuntimeStoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_runtime_store_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default)]
    pub style: HistoryStyle,

    /// Most recent exchanges replayed per (session, persona)
    #[serde(default = "default_max_exchanges")]
    pub max_exchanges: usize,

    /// Approximate token budget per replayed response
    #[serde(default = "default_response_max_tokens")]
    pub response_max_tokens: usize,

    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,

    /// Per-response clip length in narrative style
    #[serde(default = "default_clip_chars")]
    pub narrative_clip_chars: usize,
}

fn default_max_exchanges() -> usize {
    15
}
fn default_response_max_tokens() -> usize {
    1024
}
fn default_chars_per_token() -> usize {
    4
}
fn default_clip_chars() -> usize {
    500
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            style: HistoryStyle::default(),
            max_exchanges: default_max_exchanges(),
            response_max_tokens: default_response_max_tokens(),
            chars_per_token: default_chars_per_token(),
            narrative_clip_chars: default_clip_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultConfig {
    /// Characters of each answer passed forward in sequential group mode
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

fn default_preview_chars() -> usize {
    500
}

impl Default for ConsultConfig {
    fn default() -> Self {
        Self {
            preview_chars: default_preview_chars(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// When unset the gateway runs in open mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    3917
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: None,
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from `path`, or from the default location, then
    /// apply environment overrides:
    /// - `OPENROUTER_API_KEY`, `DEFAULT_MODEL`, `STAKEHOLDER_MCP_MAX_TOKENS`, `APP_URL`
    /// - `STAKEHOLDER_MCP_CONFIG_PATH` (roster file)
    /// - `STAKEHOLDER_MCP_DB_PATH`, then `DB_PATH`
    /// - `STAKEHOLDER_MCP_RUNTIME_STORE_PATH`
    /// - `STAKEHOLDER_MCP_API_KEY` (gateway)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_dir().join("config.toml"),
        };
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Takes the lookup as a function so tests never touch process env.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENROUTER_API_KEY") {
            self.provider.api_key = Some(key);
        }
        if let Some(model) = non_empty("DEFAULT_MODEL") {
            self.provider.default_model = model;
        }
        if let Some(raw) = non_empty("STAKEHOLDER_MCP_MAX_TOKENS") {
            match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => self.provider.default_max_tokens = n.min(MAX_TOKENS_CEILING),
                _ => tracing::warn!(value = %raw, "Ignoring invalid STAKEHOLDER_MCP_MAX_TOKENS"),
            }
        }
        if let Some(url) = non_empty("APP_URL") {
            self.provider.app_url = Some(url);
        }
        if let Some(path) = non_empty("STAKEHOLDER_MCP_CONFIG_PATH") {
            self.roster.path = Some(PathBuf::from(path));
        }
        if let Some(path) = non_empty("STAKEHOLDER_MCP_DB_PATH").or_else(|| non_empty("DB_PATH")) {
            self.log.db_path = PathBuf::from(path);
        }
        if let Some(path) = non_empty("STAKEHOLDER_MCP_RUNTIME_STORE_PATH") {
            self.runtime_store.path = PathBuf::from(path);
        }
        if let Some(key) = non_empty("STAKEHOLDER_MCP_API_KEY") {
            self.gateway.api_key = Some(key);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".stakeholder-mcp")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = self.provider.default_temperature;
        if !(0.0..=2.0).contains(&t) {
            return Err(ConfigError::ValidationError(
                "provider.default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.provider.default_max_tokens == 0
            || self.provider.default_max_tokens > MAX_TOKENS_CEILING
        {
            return Err(ConfigError::ValidationError(format!(
                "provider.default_max_tokens must be between 1 and {MAX_TOKENS_CEILING}"
            )));
        }

        let knobs = [
            ("history.max_exchanges", self.history.max_exchanges),
            ("history.response_max_tokens", self.history.response_max_tokens),
            ("history.chars_per_token", self.history.chars_per_token),
            ("history.narrative_clip_chars", self.history.narrative_clip_chars),
            ("consult.preview_chars", self.consult.preview_chars),
        ];
        if let Some((name, _)) = knobs.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::ValidationError(format!("{name} must be > 0")));
        }

        Ok(())
    }

    /// Check if a provider API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.provider.api_key.is_some()
    }

    /// Build the roster source this configuration points at.
    pub fn roster_source(&self) -> YamlRoster {
        match &self.roster.path {
            Some(path) => YamlRoster::at(path.clone()),
            None => YamlRoster::search_default(),
        }
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider.default_model, "anthropic/claude-3-haiku");
        assert_eq!(config.provider.default_max_tokens, 8192);
        assert_eq!(config.history.max_exchanges, 15);
        assert_eq!(config.consult.preview_chars, 500);
        assert_eq!(config.history.style, HistoryStyle::Turns);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider.base_url, config.provider.base_url);
        assert_eq!(parsed.gateway.port, config.gateway.port);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [history]
            style = "narrative"
            max_exchanges = 4
            "#,
        )
        .unwrap();
        assert_eq!(parsed.history.style, HistoryStyle::Narrative);
        assert_eq!(parsed.history.max_exchanges, 4);
        assert_eq!(parsed.history.chars_per_token, 4);
        assert!(parsed.log.enabled);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.provider.default_temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_window_rejected() {
        let mut config = AppConfig::default();
        config.history.max_exchanges = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("history.max_exchanges"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.gateway.port, 3917);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[provider\nbroken").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("OPENROUTER_API_KEY", "sk-or-test"),
            ("DEFAULT_MODEL", "openai/gpt-4o-mini"),
            ("STAKEHOLDER_MCP_CONFIG_PATH", "/etc/roster.yaml"),
            ("DB_PATH", "/var/lib/log.db"),
            ("STAKEHOLDER_MCP_API_KEY", "gw-secret"),
        ]));
        assert_eq!(config.provider.api_key.as_deref(), Some("sk-or-test"));
        assert_eq!(config.provider.default_model, "openai/gpt-4o-mini");
        assert_eq!(config.roster.path, Some(PathBuf::from("/etc/roster.yaml")));
        assert_eq!(config.log.db_path, PathBuf::from("/var/lib/log.db"));
        assert_eq!(config.gateway.api_key.as_deref(), Some("gw-secret"));
    }

    #[test]
    fn specific_db_path_beats_generic() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("STAKEHOLDER_MCP_DB_PATH", "a.db"),
            ("DB_PATH", "b.db"),
        ]));
        assert_eq!(config.log.db_path, PathBuf::from("a.db"));
    }

    #[test]
    fn max_tokens_env_is_clamped_and_validated() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("STAKEHOLDER_MCP_MAX_TOKENS", "999999")]));
        assert_eq!(config.provider.default_max_tokens, MAX_TOKENS_CEILING);

        let mut config = AppConfig::default();
        config.apply_env(env(&[("STAKEHOLDER_MCP_MAX_TOKENS", "lots")]));
        assert_eq!(config.provider.default_max_tokens, 8192);

        let mut config = AppConfig::default();
        config.apply_env(env(&[("STAKEHOLDER_MCP_MAX_TOKENS", "0")]));
        assert_eq!(config.provider.default_max_tokens, 8192);
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("sk-or-very-secret".into());
        config.gateway.api_key = Some("gw-very-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("openrouter.ai"));
        assert!(toml_str.contains("3917"));
    }
}

//! Error types for the stakeholder domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all stakeholder operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Persona errors ---
    #[error("{0}")]
    Persona(#[from] PersonaError),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Log errors ---
    #[error("Consultation log error: {0}")]
    Log(#[from] LogError),

    // --- Roster errors ---
    #[error("Roster error: {0}")]
    Roster(#[from] RosterError),

    // --- Runtime persistence errors ---
    #[error("Runtime store error: {0}")]
    Persistence(#[from] PersistenceError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersonaError {
    #[error("Stakeholder with ID \"{0}\" not found")]
    NotFound(String),

    #[error("Stakeholder with ID \"{0}\" already exists")]
    DuplicateId(String),

    #[error("Cannot delete config-based stakeholder \"{0}\". Use update to override instead.")]
    CannotDeleteConfigPersona(String),

    #[error("Invalid stakeholder: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// The upstream HTTP status behind this error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status_code, .. } => Some(*status_code),
            Self::RateLimited { .. } => Some(429),
            Self::AuthenticationFailed(_) => Some(401),
            Self::NotConfigured(_) | Self::Network(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum LogError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Failed to load stakeholders config from {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to load stakeholders config from {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Invalid stakeholders config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization failed: {0}")]
    Serialize(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

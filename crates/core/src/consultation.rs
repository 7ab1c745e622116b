//! Consultation value objects: the situational context a caller supplies,
//! the result a persona produces, and the logged form of past exchanges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::persona::Persona;
use crate::provider::{ProviderResponse, Usage};

/// Optional situational input for a consultation. Never mutates a persona.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationContext {
    /// Correlates a sequence of calls so later ones see earlier ones as history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous_feedback: Vec<FeedbackSummary>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
}

impl ConsultationContext {
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref().filter(|s| !s.is_empty())
    }
}

/// One persona's earlier feedback, carried forward as context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSummary {
    #[serde(rename = "stakeholderId", alias = "personaId")]
    pub persona_id: String,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Code,
    Design,
    Spec,
    Other,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Code => "code",
            Self::Design => "design",
            Self::Spec => "spec",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

/// A piece of material submitted for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// One persona's answer to one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationResult {
    #[serde(rename = "stakeholderId")]
    pub persona_id: String,

    #[serde(rename = "stakeholderName")]
    pub persona_name: String,

    #[serde(rename = "stakeholderRole")]
    pub persona_role: String,

    pub content: String,

    /// The model the provider reports having used
    pub model: String,

    pub usage: Usage,
    pub timestamp: DateTime<Utc>,
}

impl ConsultationResult {
    pub fn from_response(persona: &Persona, response: ProviderResponse, timestamp: DateTime<Utc>) -> Self {
        Self {
            persona_id: persona.id.clone(),
            persona_name: persona.name.clone(),
            persona_role: persona.role.clone(),
            content: response.content,
            model: response.model,
            usage: response.usage,
            timestamp,
        }
    }
}

/// A past exchange as stored in the consultation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedExchange {
    /// Monotonically increasing sequence id
    pub id: i64,

    #[serde(default)]
    pub session_id: Option<String>,

    #[serde(rename = "stakeholder_id")]
    pub persona_id: String,

    #[serde(rename = "stakeholder_name")]
    pub persona_name: String,

    #[serde(rename = "stakeholder_role")]
    pub persona_role: String,

    pub prompt: String,
    pub response: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ConsultationContext>,

    pub created_at: DateTime<Utc>,
}

impl LoggedExchange {
    /// Build the record for a successful consultation.
    pub fn record(
        id: i64,
        prompt: &str,
        result: &ConsultationResult,
        context: Option<&ConsultationContext>,
    ) -> Self {
        Self {
            id,
            session_id: context.and_then(|c| c.session_id().map(String::from)),
            persona_id: result.persona_id.clone(),
            persona_name: result.persona_name.clone(),
            persona_role: result.persona_role.clone(),
            prompt: prompt.to_string(),
            response: result.content.clone(),
            model: result.model.clone(),
            prompt_tokens: result.usage.prompt_tokens,
            completion_tokens: result.usage.completion_tokens,
            context: context.cloned(),
            created_at: result.timestamp,
        }
    }
}

/// Query over the consultation log. Predicates are ANDed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogFilter {
    #[serde(default)]
    pub persona_id: Option<String>,

    #[serde(default)]
    pub session_id: Option<String>,

    /// Inclusive lower bound on `created_at`
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,

    /// Inclusive upper bound on `created_at`
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,

    /// Case-insensitive substring over prompt or response
    #[serde(default)]
    pub search: Option<String>,

    #[serde(default = "default_limit")]
    pub limit: usize,

    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            persona_id: None,
            session_id: None,
            since: None,
            until: None,
            search: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl LogFilter {
    /// The newest `limit` exchanges between one session and one persona.
    pub fn session_window(session_id: &str, persona_id: &str, limit: usize) -> Self {
        Self {
            persona_id: Some(persona_id.to_string()),
            session_id: Some(session_id.to_string()),
            limit,
            ..Self::default()
        }
    }

    /// Whether `exchange` passes every predicate (paging aside).
    pub fn matches(&self, exchange: &LoggedExchange) -> bool {
        if let Some(id) = &self.persona_id {
            if &exchange.persona_id != id {
                return false;
            }
        }
        if let Some(session) = &self.session_id {
            if exchange.session_id.as_ref() != Some(session) {
                return false;
            }
        }
        if self.since.is_some_and(|since| exchange.created_at < since) {
            return false;
        }
        if self.until.is_some_and(|until| exchange.created_at > until) {
            return false;
        }
        if let Some(term) = &self.search {
            let needle = term.to_lowercase();
            if !exchange.prompt.to_lowercase().contains(&needle)
                && !exchange.response.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// How prior session exchanges are folded into the next request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStyle {
    /// Alternating user/assistant messages
    #[default]
    Turns,
    /// A single prose block appended to the system prompt
    Narrative,
}

/// Execution policy for a group consultation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupMode {
    /// Every persona sees the same context, all run concurrently
    #[default]
    Parallel,
    /// One at a time; each sees a preview of the earlier answers
    Sequential,
}

/// A per-persona failure inside a group run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupError {
    pub id: String,
    pub error: String,
}

/// Aggregate outcome of a group consultation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupOutcome {
    pub responses: Vec<ConsultationResult>,
    pub errors: Vec<GroupError>,
}

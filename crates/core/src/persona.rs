//! Persona domain types.
//!
//! A persona (stakeholder) is a named role profile used to condition the
//! model's response. Personas come from two sources: the declarative roster
//! (`config`) and runtime creation or override (`runtime`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PersistenceError, PersonaError, RosterError};

/// Template used when a persona does not carry its own.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "You are {{name}}, a {{role}}.

Your personality traits: {{traits}}.
Your communication style: {{communication_style}}.

Your areas of expertise:
{{expertise}}

When reviewing proposals or providing feedback, you prioritize:
{{concerns}}

Respond in character, providing feedback from your unique perspective as this stakeholder.";

/// Where a persona came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Loaded from the declarative roster.
    Config,
    /// Created or overridden at runtime.
    Runtime,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::Runtime => write!(f, "runtime"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    /// Ordered, non-empty list of trait words
    pub traits: Vec<String>,

    #[serde(default)]
    pub communication_style: String,
}

/// A fully-resolved persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub role: String,

    /// Preferred model, used when the caller does not override it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub personality: Personality,
    pub expertise: Vec<String>,
    pub concerns: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,

    pub source: Provenance,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Persona {
    /// The template to render: the persona's own, or the default.
    pub fn template(&self) -> &str {
        self.prompt_template
            .as_deref()
            .unwrap_or(DEFAULT_PROMPT_TEMPLATE)
    }

    /// Check the attribute constraints every persona must satisfy.
    pub fn validate(&self) -> Result<(), PersonaError> {
        require_non_empty("id", &self.id)?;
        validate_profile(
            &self.name,
            &self.role,
            &self.personality,
            &self.expertise,
            &self.concerns,
        )
    }

    pub fn summary(&self) -> PersonaSummary {
        PersonaSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            role: self.role.clone(),
            source: self.source,
            expertise: self.expertise.clone(),
        }
    }
}

/// A persona as declared in the roster file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub id: String,
    pub name: String,
    pub role: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub personality: Personality,
    pub expertise: Vec<String>,
    pub concerns: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
}

impl PersonaConfig {
    pub fn validate(&self) -> Result<(), PersonaError> {
        require_non_empty("id", &self.id)?;
        validate_profile(
            &self.name,
            &self.role,
            &self.personality,
            &self.expertise,
            &self.concerns,
        )
    }

    /// Stamp provenance and timestamps onto a declared persona.
    pub fn into_persona(self, source: Provenance, now: DateTime<Utc>) -> Persona {
        Persona {
            id: self.id,
            name: self.name,
            role: self.role,
            model: self.model,
            personality: self.personality,
            expertise: self.expertise,
            concerns: self.concerns,
            prompt_template: self.prompt_template,
            source,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a runtime persona. The id is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPersona {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,
    pub role: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub personality: Personality,
    pub expertise: Vec<String>,
    pub concerns: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
}

impl NewPersona {
    pub fn validate(&self) -> Result<(), PersonaError> {
        if let Some(id) = &self.id {
            require_non_empty("id", id)?;
        }
        validate_profile(
            &self.name,
            &self.role,
            &self.personality,
            &self.expertise,
            &self.concerns,
        )
    }

    pub fn into_persona(self, id: String, now: DateTime<Utc>) -> Persona {
        PersonaConfig {
            id,
            name: self.name,
            role: self.role,
            model: self.model,
            personality: self.personality,
            expertise: self.expertise,
            concerns: self.concerns,
            prompt_template: self.prompt_template,
        }
        .into_persona(Provenance::Runtime, now)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalityPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traits: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication_style: Option<String>,
}

/// A partial update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonaPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<PersonalityPatch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expertise: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concerns: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
}

impl PersonaPatch {
    /// Reject patches that would break persona constraints once applied.
    pub fn validate(&self) -> Result<(), PersonaError> {
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        if let Some(role) = &self.role {
            require_non_empty("role", role)?;
        }
        if let Some(traits) = self.personality.as_ref().and_then(|p| p.traits.as_ref()) {
            require_items("personality.traits", traits)?;
        }
        if let Some(expertise) = &self.expertise {
            require_items("expertise", expertise)?;
        }
        if let Some(concerns) = &self.concerns {
            require_items("concerns", concerns)?;
        }
        Ok(())
    }

    /// Merge this patch onto `base`, producing a runtime-provenance copy.
    ///
    /// Personality merges field by field. Everything else replaces wholesale
    /// when present. `created_at` is preserved.
    pub fn apply(self, base: &Persona, now: DateTime<Utc>) -> Persona {
        let personality = match self.personality {
            Some(patch) => Personality {
                traits: patch
                    .traits
                    .unwrap_or_else(|| base.personality.traits.clone()),
                communication_style: patch
                    .communication_style
                    .unwrap_or_else(|| base.personality.communication_style.clone()),
            },
            None => base.personality.clone(),
        };

        Persona {
            id: base.id.clone(),
            name: self.name.unwrap_or_else(|| base.name.clone()),
            role: self.role.unwrap_or_else(|| base.role.clone()),
            model: self.model.or_else(|| base.model.clone()),
            personality,
            expertise: self.expertise.unwrap_or_else(|| base.expertise.clone()),
            concerns: self.concerns.unwrap_or_else(|| base.concerns.clone()),
            prompt_template: self
                .prompt_template
                .or_else(|| base.prompt_template.clone()),
            source: Provenance::Runtime,
            created_at: base.created_at,
            updated_at: now,
        }
    }
}

/// Compact listing view of a persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaSummary {
    pub id: String,
    pub name: String,
    pub role: String,
    pub source: Provenance,
    pub expertise: Vec<String>,
}

/// Which collections a listing draws from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFilter {
    Config,
    Runtime,
    #[default]
    All,
}

impl std::str::FromStr for SourceFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "config" => Ok(Self::Config),
            "runtime" => Ok(Self::Runtime),
            "all" => Ok(Self::All),
            other => Err(format!("unknown source '{other}' (expected config, runtime or all)")),
        }
    }
}

/// Listing filter. All predicates are ANDed; absent predicates match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonaFilter {
    /// Case-insensitive substring of the role label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Case-insensitive substring of any expertise tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expertise: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceFilter>,
}

impl PersonaFilter {
    pub fn source(&self) -> SourceFilter {
        self.source.unwrap_or_default()
    }

    /// Whether `persona` passes the role and expertise predicates.
    pub fn matches(&self, persona: &Persona) -> bool {
        if let Some(role) = &self.role {
            if !persona.role.to_lowercase().contains(&role.to_lowercase()) {
                return false;
            }
        }
        if let Some(tag) = &self.expertise {
            let needle = tag.to_lowercase();
            if !persona
                .expertise
                .iter()
                .any(|e| e.to_lowercase().contains(&needle))
            {
                return false;
            }
        }
        true
    }
}

/// The declarative roster a store loads its config collection from.
///
/// A missing roster is an empty list, not an error.
pub trait RosterSource: Send + Sync {
    /// Where the roster comes from (for logs and status output).
    fn describe(&self) -> String;

    fn load(&self) -> Result<Vec<PersonaConfig>, RosterError>;
}

/// Durable mirror of the runtime collection.
#[async_trait]
pub trait RuntimePersistence: Send + Sync {
    fn name(&self) -> &str;

    /// Load every well-formed persona. Malformed entries are skipped.
    async fn load_all(&self) -> Result<Vec<Persona>, PersistenceError>;

    /// Replace the stored set with `personas`.
    async fn save_all(&self, personas: &[Persona]) -> Result<(), PersistenceError>;
}

fn validate_profile(
    name: &str,
    role: &str,
    personality: &Personality,
    expertise: &[String],
    concerns: &[String],
) -> Result<(), PersonaError> {
    require_non_empty("name", name)?;
    require_non_empty("role", role)?;
    require_items("personality.traits", &personality.traits)?;
    require_items("expertise", expertise)?;
    require_items("concerns", concerns)?;
    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> Result<(), PersonaError> {
    if value.trim().is_empty() {
        return Err(PersonaError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_items(field: &str, values: &[String]) -> Result<(), PersonaError> {
    if values.is_empty() {
        return Err(PersonaError::Validation(format!(
            "{field} must contain at least one entry"
        )));
    }
    Ok(())
}

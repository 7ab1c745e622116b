//! YAML persona roster.
//!
//! The roster is a document of the form:
//!
//! ```yaml
//! stakeholders:
//!   - id: cfo
//!     name: Dana Whitfield
//!     role: Chief Financial Officer
//!     personality:
//!       traits: [skeptical, numbers-driven]
//!       communication_style: Direct, asks for figures
//!     expertise: [budgeting, forecasting]
//!     concerns: [cost overruns, ROI]
//! ```
//!
//! A missing file yields an empty roster. An unreadable or malformed file
//! is an error naming the path.

use serde::Deserialize;
use stakeholder_core::error::RosterError;
use stakeholder_core::persona::{PersonaConfig, RosterSource};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Locations tried, in order, when no explicit path is configured.
pub const DEFAULT_ROSTER_PATHS: [&str; 3] = [
    "config/stakeholders.yaml",
    "stakeholders.yaml",
    "../config/stakeholders.yaml",
];

#[derive(Debug, Deserialize)]
struct RosterDocument {
    #[serde(default)]
    stakeholders: Vec<PersonaConfig>,
}

/// Roster loaded from a YAML file.
#[derive(Debug, Clone)]
pub struct YamlRoster {
    candidates: Vec<PathBuf>,
}

impl YamlRoster {
    /// Read exactly this file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            candidates: vec![path.into()],
        }
    }

    /// Use the first of [`DEFAULT_ROSTER_PATHS`] that exists.
    pub fn search_default() -> Self {
        Self {
            candidates: DEFAULT_ROSTER_PATHS.iter().map(PathBuf::from).collect(),
        }
    }

    fn resolve(&self) -> Option<&Path> {
        self.candidates
            .iter()
            .find(|p| p.exists())
            .map(PathBuf::as_path)
    }

    /// Parse roster text. `origin` is only used in error messages.
    pub fn parse(content: &str, origin: &str) -> Result<Vec<PersonaConfig>, RosterError> {
        let doc: RosterDocument =
            serde_yaml::from_str(content).map_err(|e| RosterError::Parse {
                path: origin.to_string(),
                reason: e.to_string(),
            })?;

        let mut seen = HashSet::new();
        for persona in &doc.stakeholders {
            persona.validate().map_err(|e| {
                RosterError::Invalid(format!("stakeholder \"{}\" in {origin}: {e}", persona.id))
            })?;
            if !seen.insert(persona.id.as_str()) {
                return Err(RosterError::Invalid(format!(
                    "duplicate stakeholder id \"{}\" in {origin}",
                    persona.id
                )));
            }
        }

        Ok(doc.stakeholders)
    }
}

impl RosterSource for YamlRoster {
    fn describe(&self) -> String {
        match self.resolve() {
            Some(path) => path.display().to_string(),
            None => self
                .candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    fn load(&self) -> Result<Vec<PersonaConfig>, RosterError> {
        let Some(path) = self.resolve() else {
            warn!(searched = %self.describe(), "Stakeholders config not found, starting with an empty roster");
            return Ok(Vec::new());
        };

        let origin = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| RosterError::Read {
            path: origin.clone(),
            reason: e.to_string(),
        })?;

        let personas = Self::parse(&content, &origin)?;
        debug!(path = %origin, count = personas.len(), "Loaded stakeholder roster");
        Ok(personas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSTER: &str = r#"
stakeholders:
  - id: cfo
    name: Dana Whitfield
    role: Chief Financial Officer
    model: openai/gpt-4o-mini
    personality:
      traits: [skeptical, numbers-driven]
      communication_style: Direct
    expertise: [budgeting, forecasting]
    concerns: [cost overruns]
  - id: ux
    name: Priya Raman
    role: Head of Design
    personality:
      traits: [empathetic]
      communication_style: Story-driven
    expertise: [usability]
    concerns: [accessibility]
    prompt_template: "I am {{name}}."
"#;

    #[test]
    fn parses_roster_in_order() {
        let personas = YamlRoster::parse(ROSTER, "inline").unwrap();
        assert_eq!(personas.len(), 2);
        assert_eq!(personas[0].id, "cfo");
        assert_eq!(personas[0].model.as_deref(), Some("openai/gpt-4o-mini"));
        assert_eq!(personas[1].prompt_template.as_deref(), Some("I am {{name}}."));
    }

    #[test]
    fn missing_file_is_empty() {
        let roster = YamlRoster::at("/nonexistent/stakeholders.yaml");
        assert!(roster.load().unwrap().is_empty());
    }

    #[test]
    fn malformed_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stakeholders.yaml");
        std::fs::write(&path, "stakeholders: [ {id: ").unwrap();

        let err = YamlRoster::at(&path).load().unwrap_err();
        assert!(matches!(err, RosterError::Parse { .. }));
        assert!(err.to_string().contains("stakeholders.yaml"));
    }

    #[test]
    fn invalid_entry_is_rejected() {
        let yaml = r#"
stakeholders:
  - id: empty
    name: Nobody
    role: Ghost
    personality:
      traits: []
      communication_style: quiet
    expertise: [x]
    concerns: [y]
"#;
        let err = YamlRoster::parse(yaml, "inline").unwrap_err();
        assert!(matches!(err, RosterError::Invalid(ref m) if m.contains("traits")));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let yaml = format!("{ROSTER}{}", &ROSTER[ROSTER.find("  - id: cfo").unwrap()..ROSTER.find("  - id: ux").unwrap()]);
        let err = YamlRoster::parse(&yaml, "inline").unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.yaml");
        std::fs::write(&path, ROSTER).unwrap();

        let roster = YamlRoster::at(&path);
        assert_eq!(roster.load().unwrap().len(), 2);
        assert!(roster.describe().ends_with("roster.yaml"));
    }

    #[test]
    fn empty_document_is_empty_roster() {
        assert!(YamlRoster::parse("stakeholders: []", "inline").unwrap().is_empty());
    }
}

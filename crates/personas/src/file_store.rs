//! JSON file mirror of the runtime persona collection.
//!
//! The file holds a JSON array of personas, rewritten in full on every
//! save. Elements that no longer deserialize or validate are skipped on
//! load so one bad hand edit does not lose the rest.
//!
//! Default location: `./data/runtime-stakeholders.json`

use async_trait::async_trait;
use stakeholder_core::error::PersistenceError;
use stakeholder_core::persona::{Persona, Provenance, RuntimePersistence};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode(content: &str) -> Result<Vec<Persona>, PersistenceError> {
        let raw: Vec<serde_json::Value> = serde_json::from_str(content)
            .map_err(|e| PersistenceError::Serialize(format!("expected a JSON array: {e}")))?;

        let personas = raw
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| {
                let persona = match serde_json::from_value::<Persona>(value) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(index, error = %e, "Skipping malformed runtime stakeholder");
                        return None;
                    }
                };
                if let Err(e) = persona.validate() {
                    warn!(index, id = %persona.id, error = %e, "Skipping invalid runtime stakeholder");
                    return None;
                }
                Some(Persona {
                    source: Provenance::Runtime,
                    ..persona
                })
            })
            .collect();

        Ok(personas)
    }
}

#[async_trait]
impl RuntimePersistence for JsonFileStore {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn load_all(&self) -> Result<Vec<Persona>, PersistenceError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PersistenceError::Io(format!("{}: {e}", self.path.display()))),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let personas = Self::decode(&content)?;
        debug!(path = %self.path.display(), count = personas.len(), "Runtime stakeholders loaded");
        Ok(personas)
    }

    async fn save_all(&self, personas: &[Persona]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PersistenceError::Io(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let content = serde_json::to_string_pretty(personas)
            .map_err(|e| PersistenceError::Serialize(e.to_string()))?;

        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, content).await.map_err(|e| {
            PersistenceError::Io(format!("Failed to write {}: {e}", staging.display()))
        })?;
        tokio::fs::rename(&staging, &self.path).await.map_err(|e| {
            PersistenceError::Io(format!("Failed to replace {}: {e}", self.path.display()))
        })?;

        debug!(path = %self.path.display(), count = personas.len(), "Runtime stakeholders saved");
        Ok(())
    }
}

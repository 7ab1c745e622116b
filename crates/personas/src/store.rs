//! PersonaStore: the merged persona namespace.
//!
//! Two independent maps are kept:
//! - `config`: loaded from the roster, replaced wholesale on reload
//! - `runtime`: created, updated and deleted through the store
//!
//! Reads merge them with runtime precedence. A runtime entry sharing an id
//! with a config entry hides it; the config entry itself is never touched,
//! so deleting the runtime entry reveals it again.
//!
//! Mutations run under the write lock from validation through to the
//! mirror flush, so concurrent mutations never interleave.

use chrono::Utc;
use indexmap::IndexMap;
use stakeholder_core::error::{Error, PersonaError, RosterError};
use stakeholder_core::persona::{
    NewPersona, Persona, PersonaConfig, PersonaFilter, PersonaPatch, PersonaSummary, Provenance,
    RosterSource, RuntimePersistence, SourceFilter,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Prefix for generated persona ids.
pub const GENERATED_ID_PREFIX: &str = "stakeholder-";

#[derive(Default)]
struct Collections {
    config: IndexMap<String, Persona>,
    runtime: IndexMap<String, Persona>,
}

impl Collections {
    fn resolve(&self, id: &str) -> Option<&Persona> {
        self.runtime.get(id).or_else(|| self.config.get(id))
    }

    fn contains(&self, id: &str) -> bool {
        self.runtime.contains_key(id) || self.config.contains_key(id)
    }

    /// Config entries in roster order (runtime overrides substituted in
    /// place), followed by runtime-only entries in creation order.
    fn merged(&self) -> Vec<&Persona> {
        let mut merged: Vec<&Persona> = self
            .config
            .keys()
            .map(|id| self.runtime.get(id).unwrap_or(&self.config[id]))
            .collect();
        merged.extend(
            self.runtime
                .values()
                .filter(|p| !self.config.contains_key(&p.id)),
        );
        merged
    }
}

/// Roster backed by a fixed list. Useful for tests and embedding.
pub struct StaticRoster(pub Vec<PersonaConfig>);

impl RosterSource for StaticRoster {
    fn describe(&self) -> String {
        format!("static ({} stakeholders)", self.0.len())
    }

    fn load(&self) -> Result<Vec<PersonaConfig>, RosterError> {
        Ok(self.0.clone())
    }
}

pub struct PersonaStore {
    roster: Arc<dyn RosterSource>,
    persistence: Option<Arc<dyn RuntimePersistence>>,
    collections: RwLock<Collections>,
}

impl PersonaStore {
    /// Load the roster and, when a mirror is given, the runtime collection.
    ///
    /// A roster error fails the open. A mirror error is logged and the
    /// runtime collection starts empty.
    pub async fn open(
        roster: Arc<dyn RosterSource>,
        persistence: Option<Arc<dyn RuntimePersistence>>,
    ) -> Result<Self, Error> {
        let config = load_config(roster.as_ref())?;

        let mut runtime = IndexMap::new();
        if let Some(mirror) = &persistence {
            match mirror.load_all().await {
                Ok(personas) => {
                    for persona in personas {
                        runtime.insert(persona.id.clone(), persona);
                    }
                }
                Err(e) => {
                    warn!(store = mirror.name(), error = %e, "Failed to load runtime stakeholders, starting empty");
                }
            }
        }

        info!(
            roster = %roster.describe(),
            config = config.len(),
            runtime = runtime.len(),
            "Stakeholder store ready"
        );

        Ok(Self {
            roster,
            persistence,
            collections: RwLock::new(Collections { config, runtime }),
        })
    }

    /// Runtime first, then config.
    pub async fn resolve(&self, id: &str) -> Result<Persona, PersonaError> {
        self.get(id)
            .await
            .ok_or_else(|| PersonaError::NotFound(id.to_string()))
    }

    pub async fn get(&self, id: &str) -> Option<Persona> {
        self.collections.read().await.resolve(id).cloned()
    }

    /// Filtered view of the merged namespace.
    ///
    /// `source = config` lists the roster entries as declared, even those
    /// currently shadowed; `runtime` lists only runtime entries; unset or
    /// `all` lists the merged namespace.
    pub async fn list(&self, filter: &PersonaFilter) -> Vec<Persona> {
        let collections = self.collections.read().await;
        let candidates: Vec<&Persona> = match filter.source() {
            SourceFilter::Config => collections.config.values().collect(),
            SourceFilter::Runtime => collections.runtime.values().collect(),
            SourceFilter::All => collections.merged(),
        };
        candidates
            .into_iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect()
    }

    pub async fn summaries(&self, filter: &PersonaFilter) -> Vec<PersonaSummary> {
        self.list(filter).await.iter().map(Persona::summary).collect()
    }

    /// Create a runtime persona.
    pub async fn create(&self, input: NewPersona) -> Result<Persona, PersonaError> {
        input.validate()?;

        let mut collections = self.collections.write().await;
        let id = match input.id.clone() {
            Some(id) => {
                if collections.runtime.contains_key(&id) {
                    return Err(PersonaError::DuplicateId(id));
                }
                id
            }
            None => generate_id(&collections),
        };

        let persona = input.into_persona(id.clone(), Utc::now());
        collections.runtime.insert(id.clone(), persona.clone());
        info!(id = %id, shadows_config = collections.config.contains_key(&id), "Stakeholder created");

        self.flush(&collections).await;
        Ok(persona)
    }

    /// Merge `patch` onto the currently resolved persona and store the
    /// result in the runtime collection.
    pub async fn update(&self, id: &str, patch: PersonaPatch) -> Result<Persona, PersonaError> {
        patch.validate()?;

        let mut collections = self.collections.write().await;
        let current = collections
            .resolve(id)
            .ok_or_else(|| PersonaError::NotFound(id.to_string()))?;
        let forked = current.source == Provenance::Config;

        let updated = patch.apply(current, Utc::now());
        collections.runtime.insert(id.to_string(), updated.clone());
        info!(id = %id, forked_from_config = forked, "Stakeholder updated");

        self.flush(&collections).await;
        Ok(updated)
    }

    /// Remove a runtime persona.
    ///
    /// Returns `false` when the id is unknown. Config-only ids are refused.
    pub async fn delete(&self, id: &str) -> Result<bool, PersonaError> {
        let mut collections = self.collections.write().await;

        if collections.runtime.shift_remove(id).is_none() {
            if collections.config.contains_key(id) {
                return Err(PersonaError::CannotDeleteConfigPersona(id.to_string()));
            }
            return Ok(false);
        }

        info!(id = %id, reveals_config = collections.config.contains_key(id), "Stakeholder deleted");
        self.flush(&collections).await;
        Ok(true)
    }

    /// Re-read the roster. The runtime collection is untouched.
    ///
    /// On error the previous config collection stays in place.
    pub async fn reload(&self) -> Result<usize, RosterError> {
        let config = load_config(self.roster.as_ref())?;
        let count = config.len();
        self.collections.write().await.config = config;
        info!(roster = %self.roster.describe(), count, "Stakeholder roster reloaded");
        Ok(count)
    }

    /// Drop every runtime persona.
    pub async fn reset_runtime(&self) {
        let mut collections = self.collections.write().await;
        collections.runtime.clear();
        self.flush(&collections).await;
    }

    /// `(config, runtime)` collection sizes.
    pub async fn counts(&self) -> (usize, usize) {
        let collections = self.collections.read().await;
        (collections.config.len(), collections.runtime.len())
    }

    pub fn roster_description(&self) -> String {
        self.roster.describe()
    }

    /// Mirror the runtime collection. Failures are logged, never raised.
    async fn flush(&self, collections: &Collections) {
        let Some(mirror) = &self.persistence else {
            return;
        };
        let personas: Vec<Persona> = collections.runtime.values().cloned().collect();
        match mirror.save_all(&personas).await {
            Ok(()) => debug!(store = mirror.name(), count = personas.len(), "Runtime stakeholders flushed"),
            Err(e) => warn!(store = mirror.name(), error = %e, "Failed to persist runtime stakeholders"),
        }
    }
}

fn load_config(roster: &dyn RosterSource) -> Result<IndexMap<String, Persona>, RosterError> {
    let now = Utc::now();
    let mut config = IndexMap::new();
    for entry in roster.load()? {
        config.insert(entry.id.clone(), entry.into_persona(Provenance::Config, now));
    }
    Ok(config)
}

/// A fresh id unique across both collections.
fn generate_id(collections: &Collections) -> String {
    loop {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let id = format!("{GENERATED_ID_PREFIX}{}", &token[..8]);
        if !collections.contains(&id) {
            return id;
        }
    }
}

//! The consultation orchestrator.
//!
//! One consultation: resolve the persona, render its system prompt, append
//! situational context to the caller's prompt, replay session history when
//! the context names a session, call the provider, then record the result.
//!
//! Recording is best effort. A failed history read or log append is
//! reported at `warn` and never changes what the caller gets back.
//!
//! Group consultations resolve every id up front. Unknown ids become
//! errors and drop out. The rest run either concurrently with identical
//! input (`parallel`, settle-all) or one at a time, each seeing a preview
//! of the answers before it (`sequential`, a fold over the context).

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use stakeholder_core::consultation::{
    ConsultationContext, ConsultationResult, FeedbackSummary, GroupError, GroupMode, GroupOutcome, LogFilter,
};
use stakeholder_core::log::ConsultationLog;
use stakeholder_core::persona::Persona;
use stakeholder_core::provider::{Provider, ProviderRequest};
use stakeholder_core::Error;
use stakeholder_personas::{build_system_prompt, build_user_prompt, PersonaStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::history::{truncate_chars, AssembledHistory, HistoryAssembler, HistoryPolicy};

/// Default length of each answer carried forward in sequential mode.
pub const DEFAULT_PREVIEW_CHARS: usize = 500;

/// Caller input shared by single and group consultations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultRequest {
    pub prompt: String,

    #[serde(default)]
    pub context: Option<ConsultationContext>,

    /// Wins over the persona's preferred model and the provider default
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl ConsultRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_context(mut self, context: ConsultationContext) -> Self {
        self.context = Some(context);
        self
    }
}

pub struct Orchestrator {
    store: Arc<PersonaStore>,
    provider: Arc<dyn Provider>,
    log: Option<Arc<dyn ConsultationLog>>,
    history: HistoryAssembler,
    preview_chars: usize,
}

impl Orchestrator {
    pub fn new(store: Arc<PersonaStore>, provider: Arc<dyn Provider>) -> Self {
        Self {
            store,
            provider,
            log: None,
            history: HistoryAssembler::default(),
            preview_chars: DEFAULT_PREVIEW_CHARS,
        }
    }

    /// Record results here and read session history back from it.
    pub fn with_log(mut self, log: Arc<dyn ConsultationLog>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_history(mut self, policy: HistoryPolicy) -> Self {
        self.history = HistoryAssembler::new(policy);
        self
    }

    pub fn with_preview_chars(mut self, chars: usize) -> Self {
        self.preview_chars = chars;
        self
    }

    pub fn store(&self) -> &Arc<PersonaStore> {
        &self.store
    }

    pub fn log(&self) -> Option<&Arc<dyn ConsultationLog>> {
        self.log.as_ref()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Consult one persona.
    ///
    /// Fails with a persona error when `id` does not resolve, or a provider
    /// error when the completion call fails. Never fails because of the log.
    pub async fn consult_one(&self, id: &str, request: &ConsultRequest) -> Result<ConsultationResult, Error> {
        let persona = self.store.resolve(id).await?;
        self.consult_persona(&persona, request).await
    }

    /// Consult several personas under `mode`.
    ///
    /// Errors list unresolved ids first, in input order, followed by
    /// execution failures. Responses follow resolution order.
    pub async fn consult_group(&self, ids: &[String], request: &ConsultRequest, mode: GroupMode) -> GroupOutcome {
        let mut outcome = GroupOutcome::default();

        let mut resolved = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.resolve(id).await {
                Ok(persona) => resolved.push(persona),
                Err(e) => outcome.errors.push(GroupError {
                    id: id.clone(),
                    error: e.to_string(),
                }),
            }
        }

        if resolved.is_empty() {
            debug!(requested = ids.len(), "No stakeholders resolved, skipping group run");
            return outcome;
        }

        info!(?mode, count = resolved.len(), "Starting group consultation");

        match mode {
            GroupMode::Parallel => self.run_parallel(&resolved, request, &mut outcome).await,
            GroupMode::Sequential => self.run_sequential(&resolved, request, &mut outcome).await,
        }

        info!(
            responses = outcome.responses.len(),
            errors = outcome.errors.len(),
            "Group consultation complete"
        );
        outcome
    }

    async fn run_parallel(&self, personas: &[Persona], request: &ConsultRequest, outcome: &mut GroupOutcome) {
        let settled = join_all(personas.iter().map(|p| self.consult_persona(p, request))).await;

        for (persona, result) in personas.iter().zip(settled) {
            match result {
                Ok(result) => outcome.responses.push(result),
                Err(e) => outcome.errors.push(GroupError {
                    id: persona.id.clone(),
                    error: e.to_string(),
                }),
            }
        }
    }

    async fn run_sequential(&self, personas: &[Persona], request: &ConsultRequest, outcome: &mut GroupOutcome) {
        let mut context = request.context.clone();

        for persona in personas {
            let step = ConsultRequest {
                context: context.clone(),
                ..request.clone()
            };

            match self.consult_persona(persona, &step).await {
                Ok(result) => {
                    context
                        .get_or_insert_with(ConsultationContext::default)
                        .previous_feedback
                        .push(FeedbackSummary {
                            persona_id: result.persona_id.clone(),
                            summary: truncate_chars(&result.content, self.preview_chars, ""),
                        });
                    outcome.responses.push(result);
                }
                Err(e) => {
                    debug!(persona_id = %persona.id, error = %e, "Sequential step failed, context unchanged");
                    outcome.errors.push(GroupError {
                        id: persona.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    async fn consult_persona(&self, persona: &Persona, request: &ConsultRequest) -> Result<ConsultationResult, Error> {
        let context = request.context.as_ref();
        let mut system_prompt = build_system_prompt(persona);
        let user_prompt = build_user_prompt(&request.prompt, context);

        let mut turns = Vec::new();
        if let Some(session_id) = context.and_then(|c| c.session_id()) {
            match self.recall(session_id, persona).await {
                Some(AssembledHistory::Turns(history)) => turns = history,
                Some(AssembledHistory::Narrative(text)) => {
                    system_prompt.push_str("\n\n");
                    system_prompt.push_str(&text);
                }
                None => {}
            }
        }

        let model = request
            .model
            .clone()
            .or_else(|| persona.model.clone())
            .unwrap_or_else(|| self.provider.default_model().to_string());

        debug!(
            persona_id = %persona.id,
            model = %model,
            history_turns = turns.len(),
            "Calling provider"
        );

        let provider_request = ProviderRequest::new(system_prompt, turns, user_prompt)
            .with_model(Some(model))
            .with_temperature(request.temperature)
            .with_max_tokens(request.max_tokens);

        let response = self.provider.complete(provider_request).await.map_err(|e| {
            warn!(persona_id = %persona.id, error = %e, "Provider call failed");
            e
        })?;

        let result = ConsultationResult::from_response(persona, response, Utc::now());
        info!(
            persona_id = %result.persona_id,
            model = %result.model,
            prompt_tokens = result.usage.prompt_tokens,
            completion_tokens = result.usage.completion_tokens,
            "Consultation complete"
        );

        self.record(&request.prompt, &result, context).await;
        Ok(result)
    }

    /// Past exchanges in this session with this persona, if any.
    async fn recall(&self, session_id: &str, persona: &Persona) -> Option<AssembledHistory> {
        let log = self.log.as_ref()?;
        let filter = LogFilter::session_window(session_id, &persona.id, self.history.window());

        match log.query(&filter).await {
            Ok(exchanges) => self.history.assemble(&persona.name, exchanges),
            Err(e) => {
                warn!(session_id, persona_id = %persona.id, error = %e, "History lookup failed, continuing without it");
                None
            }
        }
    }

    async fn record(&self, prompt: &str, result: &ConsultationResult, context: Option<&ConsultationContext>) {
        let Some(log) = &self.log else {
            return;
        };

        match log.append(prompt, result, context).await {
            Ok(id) => debug!(id, persona_id = %result.persona_id, "Consultation recorded"),
            Err(e) => warn!(
                log = log.name(),
                persona_id = %result.persona_id,
                error = %e,
                "Failed to record consultation"
            ),
        }
    }
}

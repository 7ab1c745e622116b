//! Shared test doubles for orchestrator tests.

use async_trait::async_trait;
use stakeholder_core::consultation::{ConsultationContext, ConsultationResult, LogFilter, LoggedExchange};
use stakeholder_core::error::{LogError, ProviderError};
use stakeholder_core::log::ConsultationLog;
use stakeholder_core::message::Role;
use stakeholder_core::persona::{PersonaConfig, Personality};
use stakeholder_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::collections::HashMap;
use std::sync::Mutex;

/// The persona name a request was built for, read from the default
/// template's opening line ("You are {name}, a {role}.").
pub fn addressed_to(request: &ProviderRequest) -> String {
    request
        .messages
        .iter()
        .find(|m| m.role == Role::System)
        .and_then(|m| m.content.strip_prefix("You are "))
        .and_then(|rest| rest.split(',').next())
        .unwrap_or_default()
        .to_string()
}

/// A provider that answers per persona name and records every request.
///
/// Names without a scripted reply get "ok". Names in `failing` get a
/// provider error.
pub struct MockProvider {
    replies: HashMap<String, String>,
    failing: Vec<String>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            failing: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(mut self, name: &str, text: &str) -> Self {
        self.replies.insert(name.into(), text.into());
        self
    }

    pub fn fail_for(mut self, name: &str) -> Self {
        self.failing.push(name.into());
        self
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_for(&self, name: &str) -> ProviderRequest {
        self.requests()
            .into_iter()
            .find(|r| addressed_to(r) == name)
            .unwrap_or_else(|| panic!("no request addressed to {name}"))
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-default"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let name = addressed_to(&request);
        let model = request.model.clone().unwrap_or_else(|| "unset".into());
        self.requests.lock().unwrap().push(request);

        if self.failing.contains(&name) {
            return Err(ProviderError::ApiError {
                status_code: 502,
                message: format!("upstream refused {name}"),
            });
        }

        Ok(ProviderResponse {
            content: self.replies.get(&name).cloned().unwrap_or_else(|| "ok".into()),
            usage: Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
            },
            model: format!("{model}-served"),
        })
    }
}

/// A log whose every operation fails.
pub struct FailingLog;

#[async_trait]
impl ConsultationLog for FailingLog {
    fn name(&self) -> &str {
        "failing"
    }

    async fn append(
        &self,
        _prompt: &str,
        _result: &ConsultationResult,
        _context: Option<&ConsultationContext>,
    ) -> Result<i64, LogError> {
        Err(LogError::Storage("disk full".into()))
    }

    async fn query(&self, _filter: &LogFilter) -> Result<Vec<LoggedExchange>, LogError> {
        Err(LogError::QueryFailed("disk full".into()))
    }

    async fn count(&self, _filter: &LogFilter) -> Result<u64, LogError> {
        Err(LogError::QueryFailed("disk full".into()))
    }

    async fn get(&self, _id: i64) -> Result<Option<LoggedExchange>, LogError> {
        Err(LogError::QueryFailed("disk full".into()))
    }
}

pub fn persona_config(id: &str, name: &str) -> PersonaConfig {
    PersonaConfig {
        id: id.into(),
        name: name.into(),
        role: format!("{name}'s role"),
        model: None,
        personality: Personality {
            traits: vec!["direct".into()],
            communication_style: "brief".into(),
        },
        expertise: vec!["planning".into()],
        concerns: vec!["risk".into()],
        prompt_template: None,
    }
}

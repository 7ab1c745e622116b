//! `consult_stakeholder` and `consult_group`.

use async_trait::async_trait;
use serde::Deserialize;
use stakeholder_consult::{ConsultRequest, Orchestrator};
use stakeholder_core::consultation::GroupMode;
use stakeholder_core::error::ToolError;
use stakeholder_core::tool::{Tool, ToolResult};
use std::sync::Arc;
use tracing::debug;

use crate::args;

pub struct ConsultStakeholderTool {
    orchestrator: Arc<Orchestrator>,
}

impl ConsultStakeholderTool {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[derive(Deserialize)]
struct ConsultInput {
    id: String,
    #[serde(flatten)]
    request: ConsultRequest,
}

#[async_trait]
impl Tool for ConsultStakeholderTool {
    fn name(&self) -> &str {
        "consult_stakeholder"
    }

    fn description(&self) -> &str {
        "Ask one stakeholder for feedback on a proposal, design, or idea. The stakeholder answers in character. \
         Pass context.sessionId so follow-up questions in the same conversation include the earlier exchanges."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        let mut properties = args::generation_properties();
        properties.insert(
            "id".into(),
            serde_json::json!({ "type": "string", "minLength": 1, "description": "Stakeholder ID to consult" }),
        );
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": ["id", "prompt"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let input: ConsultInput = args::parse(arguments)?;
        args::require_non_empty("id", &input.id)?;
        args::validate_request(&input.request)?;

        match self.orchestrator.consult_one(&input.id, &input.request).await {
            Ok(result) => args::payload(self.name(), &result),
            Err(e) => {
                debug!(id = %input.id, error = %e, "consult_stakeholder failed");
                Ok(ToolResult::failure(e.to_string()))
            }
        }
    }
}

pub struct ConsultGroupTool {
    orchestrator: Arc<Orchestrator>,
}

impl ConsultGroupTool {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[derive(Deserialize)]
struct GroupInput {
    ids: Vec<String>,
    #[serde(default)]
    mode: GroupMode,
    #[serde(flatten)]
    request: ConsultRequest,
}

#[async_trait]
impl Tool for ConsultGroupTool {
    fn name(&self) -> &str {
        "consult_group"
    }

    fn description(&self) -> &str {
        "Ask several stakeholders for feedback. In parallel mode all answer the same input at once. \
         In sequential mode each one sees a preview of the answers given before it."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        let mut properties = args::generation_properties();
        properties.insert(
            "ids".into(),
            serde_json::json!({
                "type": "array",
                "items": { "type": "string", "minLength": 1 },
                "minItems": 1,
                "description": "Stakeholder IDs, in consultation order"
            }),
        );
        properties.insert(
            "mode".into(),
            serde_json::json!({ "type": "string", "enum": ["parallel", "sequential"], "default": "parallel" }),
        );
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": ["ids", "prompt"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let input: GroupInput = args::parse(arguments)?;
        if input.ids.is_empty() {
            return Err(ToolError::InvalidArguments("'ids' needs at least one stakeholder".into()));
        }
        for id in &input.ids {
            args::require_non_empty("ids[]", id)?;
        }
        args::validate_request(&input.request)?;

        let outcome = self
            .orchestrator
            .consult_group(&input.ids, &input.request, input.mode)
            .await;
        args::payload(self.name(), &outcome)
    }
}

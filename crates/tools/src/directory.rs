//! Read-only persona lookup: `list_stakeholders` and `get_stakeholder`.

use async_trait::async_trait;
use serde::Deserialize;
use stakeholder_core::error::ToolError;
use stakeholder_core::persona::PersonaFilter;
use stakeholder_core::tool::{Tool, ToolResult};
use stakeholder_personas::PersonaStore;
use std::sync::Arc;

use crate::args;

pub struct ListStakeholdersTool {
    store: Arc<PersonaStore>,
}

impl ListStakeholdersTool {
    pub fn new(store: Arc<PersonaStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct ListInput {
    #[serde(default)]
    filter: Option<PersonaFilter>,
}

#[async_trait]
impl Tool for ListStakeholdersTool {
    fn name(&self) -> &str {
        "list_stakeholders"
    }

    fn description(&self) -> &str {
        "List the available stakeholder personas, optionally filtered by role, expertise, or source"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "filter": {
                    "type": "object",
                    "properties": {
                        "role": { "type": "string", "description": "Substring of the role, case-insensitive" },
                        "expertise": { "type": "string", "description": "Substring of any expertise tag, case-insensitive" },
                        "source": { "type": "string", "enum": ["config", "runtime", "all"] }
                    }
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let input: ListInput = args::parse(arguments)?;
        let summaries = self.store.summaries(&input.filter.unwrap_or_default()).await;
        args::payload(self.name(), &summaries)
    }
}

pub struct GetStakeholderTool {
    store: Arc<PersonaStore>,
}

impl GetStakeholderTool {
    pub fn new(store: Arc<PersonaStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct IdInput {
    id: String,
}

#[async_trait]
impl Tool for GetStakeholderTool {
    fn name(&self) -> &str {
        "get_stakeholder"
    }

    fn description(&self) -> &str {
        "Get the full profile of one stakeholder persona"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "minLength": 1, "description": "Stakeholder ID" }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let input: IdInput = args::parse(arguments)?;
        args::require_non_empty("id", &input.id)?;

        match self.store.resolve(&input.id).await {
            Ok(persona) => args::payload(self.name(), &persona),
            Err(e) => Ok(ToolResult::failure(e.to_string())),
        }
    }
}

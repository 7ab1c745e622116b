//! Runtime persona management: create, update, delete.

use async_trait::async_trait;
use serde::Deserialize;
use stakeholder_core::error::ToolError;
use stakeholder_core::persona::{NewPersona, PersonaPatch};
use stakeholder_core::tool::{Tool, ToolResult};
use stakeholder_personas::PersonaStore;
use std::sync::Arc;

use crate::args;

fn profile_properties() -> serde_json::Value {
    serde_json::json!({
        "name": { "type": "string", "minLength": 1 },
        "role": { "type": "string", "minLength": 1 },
        "model": { "type": "string", "description": "Preferred model for this stakeholder" },
        "personality": {
            "type": "object",
            "properties": {
                "traits": { "type": "array", "items": { "type": "string" }, "minItems": 1 },
                "communication_style": { "type": "string" }
            }
        },
        "expertise": { "type": "array", "items": { "type": "string" }, "minItems": 1 },
        "concerns": { "type": "array", "items": { "type": "string" }, "minItems": 1 },
        "prompt_template": {
            "type": "string",
            "description": "Custom template using {{name}}, {{role}}, {{traits}}, {{communication_style}}, {{expertise}}, {{concerns}}"
        }
    })
}

pub struct CreateStakeholderTool {
    store: Arc<PersonaStore>,
}

impl CreateStakeholderTool {
    pub fn new(store: Arc<PersonaStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct CreateInput {
    stakeholder: NewPersona,
}

#[async_trait]
impl Tool for CreateStakeholderTool {
    fn name(&self) -> &str {
        "create_stakeholder"
    }

    fn description(&self) -> &str {
        "Create a stakeholder persona at runtime. Runtime stakeholders are saved to the runtime store and survive restarts."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        let mut stakeholder = serde_json::json!({
            "type": "object",
            "properties": profile_properties(),
            "required": ["name", "role", "personality", "expertise", "concerns"]
        });
        stakeholder["properties"]["id"] = serde_json::json!({
            "type": "string",
            "minLength": 1,
            "description": "Optional. Generated when omitted."
        });
        serde_json::json!({
            "type": "object",
            "properties": { "stakeholder": stakeholder },
            "required": ["stakeholder"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let input: CreateInput = args::parse(arguments)?;

        match self.store.create(input.stakeholder).await {
            Ok(persona) => args::payload(
                self.name(),
                &serde_json::json!({
                    "message": format!("Stakeholder \"{}\" created successfully", persona.id),
                    "stakeholder": persona,
                }),
            ),
            Err(e) => Ok(ToolResult::failure(e.to_string())),
        }
    }
}

pub struct UpdateStakeholderTool {
    store: Arc<PersonaStore>,
}

impl UpdateStakeholderTool {
    pub fn new(store: Arc<PersonaStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct UpdateInput {
    id: String,
    updates: PersonaPatch,
}

#[async_trait]
impl Tool for UpdateStakeholderTool {
    fn name(&self) -> &str {
        "update_stakeholder"
    }

    fn description(&self) -> &str {
        "Update a stakeholder persona. Updating a config stakeholder creates a runtime override that shadows it."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "minLength": 1 },
                "updates": {
                    "type": "object",
                    "properties": profile_properties()
                }
            },
            "required": ["id", "updates"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let input: UpdateInput = args::parse(arguments)?;
        args::require_non_empty("id", &input.id)?;

        match self.store.update(&input.id, input.updates).await {
            Ok(persona) => args::payload(
                self.name(),
                &serde_json::json!({
                    "message": format!("Stakeholder \"{}\" updated successfully", persona.id),
                    "stakeholder": persona,
                }),
            ),
            Err(e) => Ok(ToolResult::failure(e.to_string())),
        }
    }
}

pub struct DeleteStakeholderTool {
    store: Arc<PersonaStore>,
}

impl DeleteStakeholderTool {
    pub fn new(store: Arc<PersonaStore>) -> Self {
        Self { store }
    }
}

#[derive(Deserialize)]
struct DeleteInput {
    id: String,
}

#[async_trait]
impl Tool for DeleteStakeholderTool {
    fn name(&self) -> &str {
        "delete_stakeholder"
    }

    fn description(&self) -> &str {
        "Delete a runtime stakeholder persona. Config stakeholders cannot be deleted, but their runtime overrides can."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "minLength": 1 }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let input: DeleteInput = args::parse(arguments)?;
        args::require_non_empty("id", &input.id)?;

        let outcome = match self.store.delete(&input.id).await {
            Ok(true) => Ok(format!("Stakeholder \"{}\" deleted successfully", input.id)),
            Ok(false) => Err(format!("Stakeholder \"{}\" not found", input.id)),
            Err(e) => Err(e.to_string()),
        };

        Ok(match outcome {
            Ok(message) => ToolResult::success(serde_json::json!({ "success": true, "message": message })),
            Err(message) => ToolResult::rejected(serde_json::json!({ "success": false, "message": message })),
        })
    }
}

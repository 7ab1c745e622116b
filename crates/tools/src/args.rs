//! Argument decoding and validation shared by every tool.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use stakeholder_consult::ConsultRequest;
use stakeholder_core::error::ToolError;
use stakeholder_core::tool::ToolResult;

pub const MAX_TEMPERATURE: f32 = 2.0;
pub const MAX_RESPONSE_TOKENS: u32 = 4096;

/// Decode tool arguments. A missing argument object reads as `{}`.
pub fn parse<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

pub fn require_non_empty(field: &str, value: &str) -> Result<(), ToolError> {
    if value.trim().is_empty() {
        return Err(ToolError::InvalidArguments(format!("'{field}' must not be empty")));
    }
    Ok(())
}

/// Prompt present, temperature in 0..=2, maxTokens in 1..=4096.
pub fn validate_request(request: &ConsultRequest) -> Result<(), ToolError> {
    require_non_empty("prompt", &request.prompt)?;

    if let Some(t) = request.temperature {
        if !(0.0..=MAX_TEMPERATURE).contains(&t) {
            return Err(ToolError::InvalidArguments(format!(
                "'temperature' must be between 0 and {MAX_TEMPERATURE}, got {t}"
            )));
        }
    }

    if let Some(n) = request.max_tokens {
        if !(1..=MAX_RESPONSE_TOKENS).contains(&n) {
            return Err(ToolError::InvalidArguments(format!(
                "'maxTokens' must be between 1 and {MAX_RESPONSE_TOKENS}, got {n}"
            )));
        }
    }

    Ok(())
}

/// Wrap a serializable payload as a successful result.
pub fn payload<T: Serialize>(tool: &str, value: &T) -> Result<ToolResult, ToolError> {
    let data = serde_json::to_value(value).map_err(|e| ToolError::ExecutionFailed {
        tool_name: tool.to_string(),
        reason: e.to_string(),
    })?;
    Ok(ToolResult::success(data))
}

/// JSON Schema of the consultation context object.
pub fn context_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "description": "Optional situational context",
        "properties": {
            "sessionId": {
                "type": "string",
                "description": "Stable id for this conversation. Earlier consultations in the same session are replayed so the stakeholder remembers them."
            },
            "projectDescription": { "type": "string" },
            "previousFeedback": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "stakeholderId": { "type": "string" },
                        "summary": { "type": "string" }
                    },
                    "required": ["stakeholderId", "summary"]
                }
            },
            "artifacts": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "type": { "type": "string", "enum": ["code", "design", "spec", "other"] },
                        "content": { "type": "string" },
                        "language": { "type": "string" }
                    },
                    "required": ["type", "content"]
                }
            }
        }
    })
}

/// Schema properties shared by both consultation tools.
pub fn generation_properties() -> serde_json::Map<String, Value> {
    let properties = serde_json::json!({
        "prompt": {
            "type": "string",
            "minLength": 1,
            "description": "The question or proposal to get feedback on"
        },
        "context": context_schema(),
        "model": { "type": "string", "description": "Override the model for this call" },
        "temperature": { "type": "number", "minimum": 0, "maximum": MAX_TEMPERATURE },
        "maxTokens": { "type": "integer", "minimum": 1, "maximum": MAX_RESPONSE_TOKENS }
    });
    match properties {
        Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

//! The stakeholder tool surface.
//!
//! Nine tools over the persona store, the orchestrator and the consultation
//! log. Each validates its input and answers with a structured payload.
//! Malformed arguments are a [`ToolError::InvalidArguments`]; domain
//! failures (unknown id, provider failure, protected persona) come back as
//! a result with `success == false` and an `{"error": ...}` payload.
//!
//! [`ToolError::InvalidArguments`]: stakeholder_core::error::ToolError::InvalidArguments

pub mod args;
pub mod consult;
pub mod directory;
pub mod log_query;
pub mod manage;

use stakeholder_consult::Orchestrator;
use stakeholder_core::tool::ToolRegistry;
use std::sync::Arc;

/// Register every tool the orchestrator can back.
///
/// The two log tools are only present when the orchestrator has a log.
pub fn consultation_registry(orchestrator: Arc<Orchestrator>) -> ToolRegistry {
    let store = orchestrator.store().clone();
    let mut registry = ToolRegistry::new();

    registry.register(Box::new(directory::ListStakeholdersTool::new(store.clone())));
    registry.register(Box::new(directory::GetStakeholderTool::new(store.clone())));
    registry.register(Box::new(consult::ConsultStakeholderTool::new(orchestrator.clone())));
    registry.register(Box::new(consult::ConsultGroupTool::new(orchestrator.clone())));
    registry.register(Box::new(manage::CreateStakeholderTool::new(store.clone())));
    registry.register(Box::new(manage::UpdateStakeholderTool::new(store.clone())));
    registry.register(Box::new(manage::DeleteStakeholderTool::new(store)));

    if let Some(log) = orchestrator.log() {
        registry.register(Box::new(log_query::GetConsultationLogTool::new(log.clone())));
        registry.register(Box::new(log_query::GetConsultationTool::new(log.clone())));
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use stakeholder_core::error::{ProviderError, ToolError};
    use stakeholder_core::persona::{PersonaConfig, Personality};
    use stakeholder_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
    use stakeholder_core::tool::{ToolCall, ToolResult};
    use stakeholder_log::InMemoryLog;
    use stakeholder_personas::{PersonaStore, StaticRoster};

    struct CannedProvider;

    #[async_trait]
    impl Provider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        fn default_model(&self) -> &str {
            "canned-model"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
            if last.contains("explode") {
                return Err(ProviderError::Network("connection reset".into()));
            }
            Ok(ProviderResponse {
                content: format!("On '{last}': looks fine"),
                usage: Usage {
                    prompt_tokens: 7,
                    completion_tokens: 3,
                },
                model: request.model.unwrap_or_default(),
            })
        }
    }

    fn config(id: &str, role: &str) -> PersonaConfig {
        PersonaConfig {
            id: id.into(),
            name: id.to_uppercase(),
            role: role.into(),
            model: None,
            personality: Personality {
                traits: vec!["frank".into()],
                communication_style: "plain".into(),
            },
            expertise: vec!["budgets".into()],
            concerns: vec!["cost".into()],
            prompt_template: None,
        }
    }

    async fn registry(with_log: bool) -> ToolRegistry {
        let roster = StaticRoster(vec![config("cfo", "Chief Financial Officer"), config("cto", "Chief Technology Officer")]);
        let store = Arc::new(PersonaStore::open(Arc::new(roster), None).await.unwrap());
        let mut orchestrator = Orchestrator::new(store, Arc::new(CannedProvider));
        if with_log {
            orchestrator = orchestrator.with_log(Arc::new(InMemoryLog::new()));
        }
        consultation_registry(Arc::new(orchestrator))
    }

    async fn call(registry: &ToolRegistry, name: &str, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        registry
            .execute(&ToolCall {
                id: "call-1".into(),
                name: name.into(),
                arguments,
            })
            .await
    }

    fn data(result: &ToolResult) -> &serde_json::Value {
        result.data.as_ref().unwrap()
    }

    #[tokio::test]
    async fn log_tools_follow_log_presence() {
        assert_eq!(registry(true).await.len(), 9);

        let without = registry(false).await;
        assert_eq!(without.len(), 7);
        assert!(without.get("get_consultation_log").is_none());
    }

    #[tokio::test]
    async fn list_with_filter() {
        let registry = registry(false).await;
        let result = call(&registry, "list_stakeholders", json!({"filter": {"role": "technology"}}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.call_id, "call-1");
        let listed = data(&result).as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["id"], "cto");
        assert_eq!(listed[0]["source"], "config");

        let all = call(&registry, "list_stakeholders", serde_json::Value::Null).await.unwrap();
        assert_eq!(data(&all).as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn get_unknown_is_error_payload() {
        let registry = registry(false).await;
        let result = call(&registry, "get_stakeholder", json!({"id": "ghost"})).await.unwrap();
        assert!(!result.success);
        assert_eq!(data(&result)["error"], "Stakeholder with ID \"ghost\" not found");
    }

    #[tokio::test]
    async fn consult_validates_then_answers() {
        let registry = registry(true).await;

        let too_hot = call(&registry, "consult_stakeholder", json!({"id": "cfo", "prompt": "?", "temperature": 3}))
            .await;
        assert!(matches!(too_hot, Err(ToolError::InvalidArguments(_))));

        let missing_prompt = call(&registry, "consult_stakeholder", json!({"id": "cfo"})).await;
        assert!(matches!(missing_prompt, Err(ToolError::InvalidArguments(_))));

        let result = call(
            &registry,
            "consult_stakeholder",
            json!({"id": "cfo", "prompt": "Budget?", "maxTokens": 100, "context": {"sessionId": "s1"}}),
        )
        .await
        .unwrap();
        assert!(result.success);
        assert_eq!(data(&result)["stakeholderId"], "cfo");
        assert_eq!(data(&result)["model"], "canned-model");
        assert_eq!(data(&result)["usage"]["completionTokens"], 3);

        let failed = call(&registry, "consult_stakeholder", json!({"id": "cfo", "prompt": "explode"}))
            .await
            .unwrap();
        assert!(!failed.success);
        assert!(data(&failed)["error"].as_str().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn consult_group_reports_partial_failure() {
        let registry = registry(false).await;

        let empty = call(&registry, "consult_group", json!({"ids": [], "prompt": "?"})).await;
        assert!(matches!(empty, Err(ToolError::InvalidArguments(_))));

        let bad_mode = call(&registry, "consult_group", json!({"ids": ["cfo"], "prompt": "?", "mode": "random"})).await;
        assert!(matches!(bad_mode, Err(ToolError::InvalidArguments(_))));

        let result = call(
            &registry,
            "consult_group",
            json!({"ids": ["cfo", "nobody", "cto"], "prompt": "Go?", "mode": "sequential"}),
        )
        .await
        .unwrap();
        assert!(result.success);
        assert_eq!(data(&result)["responses"].as_array().unwrap().len(), 2);
        assert_eq!(data(&result)["errors"][0]["id"], "nobody");
    }

    #[tokio::test]
    async fn manage_lifecycle() {
        let registry = registry(false).await;

        let created = call(
            &registry,
            "create_stakeholder",
            json!({"stakeholder": {
                "name": "Sam",
                "role": "Security Lead",
                "personality": {"traits": ["cautious"], "communication_style": "formal"},
                "expertise": ["threat modeling"],
                "concerns": ["data exposure"]
            }}),
        )
        .await
        .unwrap();
        assert!(created.success);
        let id = data(&created)["stakeholder"]["id"].as_str().unwrap().to_string();
        assert!(id.starts_with("stakeholder-"));
        assert_eq!(data(&created)["stakeholder"]["source"], "runtime");

        let invalid = call(
            &registry,
            "create_stakeholder",
            json!({"stakeholder": {
                "name": "Empty",
                "role": "Nobody",
                "personality": {"traits": []},
                "expertise": ["x"],
                "concerns": ["y"]
            }}),
        )
        .await
        .unwrap();
        assert!(!invalid.success);

        let updated = call(&registry, "update_stakeholder", json!({"id": "cfo", "updates": {"role": "Finance"}}))
            .await
            .unwrap();
        assert!(updated.success);
        assert_eq!(data(&updated)["stakeholder"]["source"], "runtime");
        assert_eq!(data(&updated)["stakeholder"]["name"], "CFO");

        let removed_override = call(&registry, "delete_stakeholder", json!({"id": "cfo"})).await.unwrap();
        assert!(removed_override.success);

        let protected = call(&registry, "delete_stakeholder", json!({"id": "cfo"})).await.unwrap();
        assert!(!protected.success);
        assert_eq!(data(&protected)["success"], false);
        assert!(data(&protected)["message"].as_str().unwrap().contains("config-based"));

        let unknown = call(&registry, "delete_stakeholder", json!({"id": "ghost"})).await.unwrap();
        assert!(!unknown.success);
        assert_eq!(data(&unknown)["message"], "Stakeholder \"ghost\" not found");

        let deleted = call(&registry, "delete_stakeholder", json!({"id": id})).await.unwrap();
        assert!(deleted.success);
    }

    #[tokio::test]
    async fn log_tools_page_and_fetch() {
        let registry = registry(true).await;
        for prompt in ["Budget?", "Hiring?", "Budget again?"] {
            call(&registry, "consult_stakeholder", json!({"id": "cfo", "prompt": prompt}))
                .await
                .unwrap();
        }

        let page = call(&registry, "get_consultation_log", json!({"search": "budget", "limit": 1}))
            .await
            .unwrap();
        assert!(page.success);
        assert_eq!(data(&page)["total"], 2);
        assert_eq!(data(&page)["count"], 1);
        assert_eq!(data(&page)["consultations"][0]["prompt"], "Budget again?");

        let id = data(&page)["consultations"][0]["id"].as_i64().unwrap();
        let one = call(&registry, "get_consultation", json!({"id": id})).await.unwrap();
        assert_eq!(data(&one)["stakeholder_id"], "cfo");

        let missing = call(&registry, "get_consultation", json!({"id": 999})).await.unwrap();
        assert!(!missing.success);

        let zero = call(&registry, "get_consultation", json!({"id": 0})).await;
        assert!(matches!(zero, Err(ToolError::InvalidArguments(_))));

        let over = call(&registry, "get_consultation_log", json!({"limit": 500})).await;
        assert!(matches!(over, Err(ToolError::InvalidArguments(_))));
    }
}

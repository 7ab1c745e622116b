//! In-memory log, for tests and runs where persistence isn't wanted.

use async_trait::async_trait;
use stakeholder_core::consultation::{ConsultationContext, ConsultationResult, LogFilter, LoggedExchange};
use stakeholder_core::error::LogError;
use stakeholder_core::log::ConsultationLog;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    entries: Vec<LoggedExchange>,
    next_id: i64,
}

/// A log kept in a Vec. Same ordering and filter semantics as SQLite.
#[derive(Default)]
pub struct InMemoryLog {
    inner: RwLock<Inner>,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed exchange, keeping its id. Used to seed tests.
    pub async fn insert(&self, exchange: LoggedExchange) {
        let mut inner = self.inner.write().await;
        inner.next_id = inner.next_id.max(exchange.id);
        inner.entries.push(exchange);
    }

    async fn matching(&self, filter: &LogFilter) -> Vec<LoggedExchange> {
        let inner = self.inner.read().await;
        let mut matches: Vec<LoggedExchange> = inner
            .entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        matches
    }
}

#[async_trait]
impl ConsultationLog for InMemoryLog {
    fn name(&self) -> &str {
        "memory"
    }

    async fn append(
        &self,
        prompt: &str,
        result: &ConsultationResult,
        context: Option<&ConsultationContext>,
    ) -> Result<i64, LogError> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;
        inner
            .entries
            .push(LoggedExchange::record(id, prompt, result, context));
        Ok(id)
    }

    async fn query(&self, filter: &LogFilter) -> Result<Vec<LoggedExchange>, LogError> {
        Ok(self
            .matching(filter)
            .await
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }

    async fn count(&self, filter: &LogFilter) -> Result<u64, LogError> {
        Ok(self.matching(filter).await.len() as u64)
    }

    async fn get(&self, id: i64) -> Result<Option<LoggedExchange>, LogError> {
        let inner = self.inner.read().await;
        Ok(inner.entries.iter().find(|e| e.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use stakeholder_core::provider::Usage;

    fn result(persona: &str, content: &str, offset_secs: i64) -> ConsultationResult {
        ConsultationResult {
            persona_id: persona.into(),
            persona_name: persona.to_uppercase(),
            persona_role: "Role".into(),
            content: content.into(),
            model: "test-model".into(),
            usage: Usage {
                prompt_tokens: 10,
                completion_tokens: 2,
            },
            timestamp: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    fn session(id: &str) -> ConsultationContext {
        ConsultationContext {
            session_id: Some(id.into()),
            ..ConsultationContext::default()
        }
    }

    #[tokio::test]
    async fn append_assigns_increasing_ids() {
        let log = InMemoryLog::new();
        let a = log.append("q1", &result("cfo", "a1", 0), None).await.unwrap();
        let b = log.append("q2", &result("cfo", "a2", 1), None).await.unwrap();
        assert!(b > a);
        assert_eq!(log.get(a).await.unwrap().unwrap().prompt, "q1");
        assert!(log.get(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn query_is_newest_first_and_paged() {
        let log = InMemoryLog::new();
        for i in 0..5 {
            log.append(&format!("q{i}"), &result("cfo", "a", i), None)
                .await
                .unwrap();
        }

        let filter = LogFilter {
            limit: 2,
            offset: 1,
            ..LogFilter::default()
        };
        let page = log.query(&filter).await.unwrap();
        let prompts: Vec<&str> = page.iter().map(|e| e.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["q3", "q2"]);
        assert_eq!(log.count(&filter).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn session_and_persona_filters() {
        let log = InMemoryLog::new();
        log.append("q", &result("cfo", "a", 0), Some(&session("s1"))).await.unwrap();
        log.append("q", &result("cto", "a", 1), Some(&session("s1"))).await.unwrap();
        log.append("q", &result("cfo", "a", 2), Some(&session("s2"))).await.unwrap();

        let window = LogFilter::session_window("s1", "cfo", 15);
        let hits = log.query(&window).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].session_id.as_deref(), Some("s1"));
        assert_eq!(hits[0].persona_id, "cfo");
    }
}

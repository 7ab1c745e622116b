//! Consultation log access: `get_consultation_log` and `get_consultation`.
//!
//! Both tools are only registered when a log is configured.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use stakeholder_core::consultation::LogFilter;
use stakeholder_core::error::ToolError;
use stakeholder_core::log::ConsultationLog;
use stakeholder_core::tool::{Tool, ToolResult};
use std::sync::Arc;

use crate::args;

pub const DEFAULT_PAGE: usize = 50;
pub const MAX_PAGE: usize = 200;

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
fn parse_instant(field: &str, raw: &str) -> Result<DateTime<Utc>, ToolError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ToolError::InvalidArguments(format!("'{field}' is not an ISO-8601 datetime: {raw}")))
}

pub struct GetConsultationLogTool {
    log: Arc<dyn ConsultationLog>,
}

impl GetConsultationLogTool {
    pub fn new(log: Arc<dyn ConsultationLog>) -> Self {
        Self { log }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogQueryInput {
    #[serde(default)]
    stakeholder_id: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    since: Option<String>,
    #[serde(default)]
    until: Option<String>,
    #[serde(default)]
    search: Option<String>,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    offset: Option<i64>,
}

impl LogQueryInput {
    fn into_filter(self) -> Result<LogFilter, ToolError> {
        let limit = match self.limit {
            None => DEFAULT_PAGE,
            Some(n) if (1..=MAX_PAGE as i64).contains(&n) => n as usize,
            Some(n) => {
                return Err(ToolError::InvalidArguments(format!(
                    "'limit' must be between 1 and {MAX_PAGE}, got {n}"
                )));
            }
        };
        let offset = match self.offset {
            None => 0,
            Some(n) if n >= 0 => n as usize,
            Some(n) => return Err(ToolError::InvalidArguments(format!("'offset' must be >= 0, got {n}"))),
        };

        Ok(LogFilter {
            persona_id: self.stakeholder_id.filter(|s| !s.is_empty()),
            session_id: self.session_id.filter(|s| !s.is_empty()),
            since: self.since.as_deref().map(|s| parse_instant("since", s)).transpose()?,
            until: self.until.as_deref().map(|s| parse_instant("until", s)).transpose()?,
            search: self.search.filter(|s| !s.is_empty()),
            limit,
            offset,
        })
    }
}

#[async_trait]
impl Tool for GetConsultationLogTool {
    fn name(&self) -> &str {
        "get_consultation_log"
    }

    fn description(&self) -> &str {
        "Query past stakeholder consultations, newest first. Filter by stakeholder, session, date range, or text in the prompt or response."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "stakeholderId": { "type": "string" },
                "sessionId": { "type": "string" },
                "since": { "type": "string", "description": "ISO datetime, e.g. 2025-01-01T00:00:00Z" },
                "until": { "type": "string", "description": "ISO datetime" },
                "search": { "type": "string", "description": "Case-insensitive text search across prompts and responses" },
                "limit": { "type": "integer", "minimum": 1, "maximum": MAX_PAGE, "default": DEFAULT_PAGE },
                "offset": { "type": "integer", "minimum": 0, "default": 0 }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let input: LogQueryInput = args::parse(arguments)?;
        let filter = input.into_filter()?;

        let page = match self.log.query(&filter).await {
            Ok(page) => page,
            Err(e) => return Ok(ToolResult::failure(e.to_string())),
        };
        let total = match self.log.count(&filter).await {
            Ok(total) => total,
            Err(e) => return Ok(ToolResult::failure(e.to_string())),
        };

        args::payload(
            self.name(),
            &serde_json::json!({
                "total": total,
                "count": page.len(),
                "offset": filter.offset,
                "consultations": page,
            }),
        )
    }
}

pub struct GetConsultationTool {
    log: Arc<dyn ConsultationLog>,
}

impl GetConsultationTool {
    pub fn new(log: Arc<dyn ConsultationLog>) -> Self {
        Self { log }
    }
}

#[derive(Deserialize)]
struct GetInput {
    id: i64,
}

#[async_trait]
impl Tool for GetConsultationTool {
    fn name(&self) -> &str {
        "get_consultation"
    }

    fn description(&self) -> &str {
        "Get one past consultation by its log ID, with the full prompt, response, and metadata"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "id": { "type": "integer", "minimum": 1, "description": "Consultation log ID" }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let input: GetInput = args::parse(arguments)?;
        if input.id < 1 {
            return Err(ToolError::InvalidArguments(format!("'id' must be >= 1, got {}", input.id)));
        }

        match self.log.get(input.id).await {
            Ok(Some(exchange)) => args::payload(self.name(), &exchange),
            Ok(None) => Ok(ToolResult::failure(format!("Consultation with ID {} not found", input.id))),
            Err(e) => Ok(ToolResult::failure(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn instants_accept_rfc3339_and_dates() {
        let ts = parse_instant("since", "2025-03-04T05:06:07Z").unwrap();
        assert_eq!((ts.month(), ts.hour()), (3, 5));

        let day = parse_instant("since", "2025-03-04").unwrap();
        assert_eq!((day.day(), day.hour()), (4, 0));

        assert!(parse_instant("since", "last tuesday").is_err());
    }

    #[test]
    fn paging_bounds() {
        let input = |limit, offset| LogQueryInput {
            stakeholder_id: None,
            session_id: None,
            since: None,
            until: None,
            search: None,
            limit,
            offset,
        };
        assert_eq!(input(None, None).into_filter().unwrap().limit, DEFAULT_PAGE);
        assert_eq!(input(Some(200), Some(10)).into_filter().unwrap().offset, 10);
        assert!(input(Some(0), None).into_filter().is_err());
        assert!(input(Some(201), None).into_filter().is_err());
        assert!(input(None, Some(-1)).into_filter().is_err());
    }
}

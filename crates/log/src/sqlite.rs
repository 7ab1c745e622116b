//! SQLite consultation log.
//!
//! One table, `consultations`, keyed by an autoincrement integer so ids are
//! monotonically increasing. `created_at` is stored as RFC 3339 UTC with
//! millisecond precision, which keeps text comparison chronological.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use stakeholder_core::consultation::{ConsultationContext, ConsultationResult, LogFilter, LoggedExchange};
use stakeholder_core::error::LogError;
use stakeholder_core::log::ConsultationLog;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

const COLUMNS: &str = "id, session_id, stakeholder_id, stakeholder_name, stakeholder_role, \
                       prompt, response, model, prompt_tokens, completion_tokens, context_json, created_at";

/// A SQLite-backed consultation log.
pub struct SqliteLog {
    pool: SqlitePool,
}

impl SqliteLog {
    /// Open from a connection string such as `sqlite://data/log.db` or
    /// `sqlite::memory:` (an in-process ephemeral database, used by tests).
    pub async fn new(url: &str) -> Result<Self, LogError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| LogError::Storage(format!("Invalid SQLite path: {e}")))?;
        Self::connect(options, url.contains(":memory:"), url).await
    }

    /// Open a database file, creating it and its parent directory if needed.
    pub async fn open(path: &Path) -> Result<Self, LogError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                LogError::Storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
        let options = SqliteConnectOptions::new().filename(path);
        Self::connect(options, false, &path.display().to_string()).await
    }

    async fn connect(options: SqliteConnectOptions, in_memory: bool, label: &str) -> Result<Self, LogError> {
        let options = options
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // Every connection to `:memory:` is its own database, so pin a
        // single connection that never idles out.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| LogError::Storage(format!("Failed to open SQLite: {e}")))?;

        let log = Self { pool };
        log.run_migrations().await?;
        info!(path = %label, "SQLite consultation log initialized");
        Ok(log)
    }

    async fn run_migrations(&self) -> Result<(), LogError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS consultations (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id        TEXT,
                stakeholder_id    TEXT NOT NULL,
                stakeholder_name  TEXT NOT NULL,
                stakeholder_role  TEXT NOT NULL,
                prompt            TEXT NOT NULL,
                response          TEXT NOT NULL,
                model             TEXT NOT NULL,
                prompt_tokens     INTEGER NOT NULL DEFAULT 0,
                completion_tokens INTEGER NOT NULL DEFAULT 0,
                context_json      TEXT,
                created_at        TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| LogError::MigrationFailed(format!("consultations table: {e}")))?;

        let indexes = [
            ("stakeholder", "CREATE INDEX IF NOT EXISTS idx_consultations_stakeholder ON consultations(stakeholder_id)"),
            ("session", "CREATE INDEX IF NOT EXISTS idx_consultations_session ON consultations(session_id)"),
            ("created_at", "CREATE INDEX IF NOT EXISTS idx_consultations_created_at ON consultations(created_at DESC)"),
        ];
        for (name, sql) in indexes {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| LogError::MigrationFailed(format!("{name} index: {e}")))?;
        }

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Append the WHERE clause for `filter`.
    fn push_filters<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a LogFilter) {
        builder.push(" WHERE 1 = 1");
        if let Some(id) = &filter.persona_id {
            builder.push(" AND stakeholder_id = ").push_bind(id.as_str());
        }
        if let Some(session) = &filter.session_id {
            builder.push(" AND session_id = ").push_bind(session.as_str());
        }
        if let Some(since) = filter.since {
            builder.push(" AND created_at >= ").push_bind(encode_timestamp(since));
        }
        if let Some(until) = filter.until {
            builder.push(" AND created_at <= ").push_bind(encode_timestamp(until));
        }
        if let Some(term) = filter.search.as_deref().filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", escape_like(term));
            builder
                .push(" AND (prompt LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR response LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
    }

    /// Parse a `LoggedExchange` from a SQLite row.
    fn row_to_exchange(row: &sqlx::sqlite::SqliteRow) -> Result<LoggedExchange, LogError> {
        fn col<'r, T>(row: &'r sqlx::sqlite::SqliteRow, name: &str) -> Result<T, LogError>
        where
            T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
        {
            row.try_get(name)
                .map_err(|e| LogError::QueryFailed(format!("{name} column: {e}")))
        }

        let id: i64 = col(row, "id")?;
        let context_json: Option<String> = col(row, "context_json")?;
        let created_at_str: String = col(row, "created_at")?;
        let prompt_tokens: i64 = col(row, "prompt_tokens")?;
        let completion_tokens: i64 = col(row, "completion_tokens")?;

        let context = context_json.and_then(|raw| {
            serde_json::from_str::<ConsultationContext>(&raw)
                .map_err(|e| warn!(id, error = %e, "Ignoring unreadable consultation context"))
                .ok()
        });

        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| LogError::QueryFailed(format!("created_at for #{id}: {e}")))?;

        Ok(LoggedExchange {
            id,
            session_id: col(row, "session_id")?,
            persona_id: col(row, "stakeholder_id")?,
            persona_name: col(row, "stakeholder_name")?,
            persona_role: col(row, "stakeholder_role")?,
            prompt: col(row, "prompt")?,
            response: col(row, "response")?,
            model: col(row, "model")?,
            prompt_tokens: u32::try_from(prompt_tokens).unwrap_or(0),
            completion_tokens: u32::try_from(completion_tokens).unwrap_or(0),
            context,
            created_at,
        })
    }
}

fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Escape LIKE metacharacters so the term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl ConsultationLog for SqliteLog {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn append(
        &self,
        prompt: &str,
        result: &ConsultationResult,
        context: Option<&ConsultationContext>,
    ) -> Result<i64, LogError> {
        let context_json = context
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| LogError::Storage(format!("Context serialization: {e}")))?;
        let session_id = context.and_then(|c| c.session_id());

        let outcome = sqlx::query(
            r#"
            INSERT INTO consultations (
                session_id, stakeholder_id, stakeholder_name, stakeholder_role,
                prompt, response, model, prompt_tokens, completion_tokens,
                context_json, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(session_id)
        .bind(&result.persona_id)
        .bind(&result.persona_name)
        .bind(&result.persona_role)
        .bind(prompt)
        .bind(&result.content)
        .bind(&result.model)
        .bind(i64::from(result.usage.prompt_tokens))
        .bind(i64::from(result.usage.completion_tokens))
        .bind(context_json)
        .bind(encode_timestamp(result.timestamp))
        .execute(&self.pool)
        .await
        .map_err(|e| LogError::Storage(format!("Insert failed: {e}")))?;

        let id = outcome.last_insert_rowid();
        debug!(id, stakeholder = %result.persona_id, "Consultation logged");
        Ok(id)
    }

    async fn query(&self, filter: &LogFilter) -> Result<Vec<LoggedExchange>, LogError> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM consultations"));
        Self::push_filters(&mut builder, filter);
        builder
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::try_from(filter.limit).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(filter.offset).unwrap_or(i64::MAX));

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LogError::QueryFailed(format!("Query failed: {e}")))?;

        rows.iter().map(Self::row_to_exchange).collect()
    }

    async fn count(&self, filter: &LogFilter) -> Result<u64, LogError> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM consultations");
        Self::push_filters(&mut builder, filter);

        let total: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| LogError::QueryFailed(format!("Count failed: {e}")))?;

        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn get(&self, id: i64) -> Result<Option<LoggedExchange>, LogError> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM consultations WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| LogError::QueryFailed(format!("Get failed: {e}")))?;

        row.as_ref().map(Self::row_to_exchange).transpose()
    }
}

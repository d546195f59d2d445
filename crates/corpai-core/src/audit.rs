//! Query audit-log entries as reported by `GET /admin/logs`.
//!
//! Entries are read-only snapshots of past queries. The context blob is
//! opaque except for an optional `system_prompt_snapshot`, which the
//! detail view surfaces.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome recorded for a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuditStatus {
    Success,
    Blocked,
    NoSql,
    Error,
    /// A pipeline stage still running (`FETCHING`, `CLEANING`, ...).
    InProgress(String),
    Other(String),
}

const IN_PROGRESS: [&str; 4] = ["FETCHING", "CLEANING", "CLASSIFYING", "EMBEDDING"];

impl From<String> for AuditStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "SUCCESS" => return AuditStatus::Success,
            "BLOCKED" => return AuditStatus::Blocked,
            "NO_SQL" => return AuditStatus::NoSql,
            "ERROR" => return AuditStatus::Error,
            _ => {}
        }
        if IN_PROGRESS.contains(&s.as_str()) {
            AuditStatus::InProgress(s)
        } else {
            AuditStatus::Other(s)
        }
    }
}

impl From<AuditStatus> for String {
    fn from(status: AuditStatus) -> Self {
        match status {
            AuditStatus::Success => "SUCCESS".to_string(),
            AuditStatus::Blocked => "BLOCKED".to_string(),
            AuditStatus::NoSql => "NO_SQL".to_string(),
            AuditStatus::Error => "ERROR".to_string(),
            AuditStatus::InProgress(s) | AuditStatus::Other(s) => s,
        }
    }
}

impl AuditStatus {
    pub fn label(&self) -> &str {
        match self {
            AuditStatus::Success => "Success",
            AuditStatus::Blocked => "Blocked",
            AuditStatus::NoSql => "No SQL",
            AuditStatus::Error => "Error",
            AuditStatus::InProgress(s) | AuditStatus::Other(s) => s,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, AuditStatus::Blocked | AuditStatus::Error)
    }
}

/// One persisted query record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub timestamp: String,
    pub user_email: String,
    #[serde(default)]
    pub user_dept: String,
    pub user_query: String,
    #[serde(default)]
    pub security_policy: String,
    #[serde(default)]
    pub generated_sql: String,
    pub status: AuditStatus,
    #[serde(default)]
    pub execution_time_ms: f64,
    #[serde(default)]
    pub full_context: Value,
}

/// Body of `GET /admin/logs`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsPage {
    #[serde(default)]
    pub data: Vec<AuditLogEntry>,
}

impl AuditLogEntry {
    /// Parsed timestamp. The backend sends RFC 3339 or a naive ISO
    /// timestamp, which is taken as UTC.
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// Local wall-clock time for list rows, or the raw text if unparseable.
    pub fn time_label(&self) -> String {
        self.recorded_at()
            .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
            .unwrap_or_else(|| self.timestamp.clone())
    }

    /// Local date and time for the detail view.
    pub fn datetime_label(&self) -> String {
        self.recorded_at()
            .map(|t| {
                t.with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|| self.timestamp.clone())
    }

    /// The system prompt captured with the query, if the context blob
    /// (a JSON object, or a string holding one) has it.
    pub fn system_prompt_snapshot(&self) -> Option<String> {
        let context = match &self.full_context {
            Value::String(s) => serde_json::from_str::<Value>(s).ok()?,
            other => other.clone(),
        };
        match context.get("system_prompt_snapshot")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Null => None,
            Value::String(_) => None,
            other => Some(other.to_string()),
        }
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

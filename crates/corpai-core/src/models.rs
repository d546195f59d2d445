//! Wire types exchanged with the Corporate AI backend.
//!
//! These mirror the JSON bodies of the HTTP contract. Responses with
//! alternative shapes (`/chat/query`) are converted into tagged enums at
//! the boundary so the rest of the client never inspects optional fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Categories offered when the backend cannot list its own.
pub const FALLBACK_CATEGORIES: [&str; 5] = ["General", "Sales", "HR", "Technology", "Finance"];

/// The category every chat starts in unless one is forced.
pub const DEFAULT_CATEGORY: &str = "General";

/// Body of a successful `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

/// Profile returned by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department: String,
    pub position: String,
}

impl UserProfile {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A knowledge-base category as listed by `GET /admin/categories`.
///
/// Only `name` is used; the backend may send ids and descriptions too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Category {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// Request body of `POST /chat/query`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
    pub query: &'a str,
    pub category: &'a str,
}

/// A result row as sent by the backend, keys in server order.
pub type Row = Map<String, Value>;

/// Raw success body of `POST /chat/query`.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawQueryResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    sql: Option<String>,
    #[serde(default)]
    result: Option<Vec<Row>>,
}

/// A successful `/chat/query` reply.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryReply {
    /// The backend answered in prose.
    Answer(String),
    /// The backend generated a query and returned its rows.
    Rows { sql: String, rows: Vec<Row> },
}

impl QueryReply {
    /// Interpret a success body. A non-empty `message` wins; anything
    /// else is treated as a tabular result (missing rows = no rows).
    pub fn from_json(value: Value) -> Result<Self, serde_json::Error> {
        let raw: RawQueryResponse = serde_json::from_value(value)?;
        match raw.message {
            Some(message) if !message.is_empty() => Ok(QueryReply::Answer(message)),
            _ => Ok(QueryReply::Rows {
                sql: raw.sql.unwrap_or_default(),
                rows: raw.result.unwrap_or_default(),
            }),
        }
    }
}

/// `{detail}` body carried by rejected requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorBody {
    /// Human-readable detail. Non-string details (validation error lists)
    /// are rendered as compact JSON.
    pub fn detail_text(&self) -> Option<String> {
        match &self.detail {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

/// `{message}` body returned by the upload endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub message: Option<String>,
}

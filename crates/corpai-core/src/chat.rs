//! Chat transcript, reasoning trace, and the query state machine.
//!
//! ```text
//! idle ──begin──▶ awaiting-response ──complete──▶ rendering-direct-answer
//!                                            ├──▶ rendering-tabular-result
//!                                            └──▶ rendering-error
//! ```
//!
//! [`ChatSession`] holds no I/O. A caller starts a turn with
//! [`ChatSession::begin`], performs the request however it likes, and
//! hands the outcome to [`ChatSession::complete`]. The next `begin`
//! implicitly returns the session to idle.

use serde::Serialize;
use serde_json::Value;

use crate::models::{QueryReply, Row, DEFAULT_CATEGORY};

/// Assistant text shown when the backend cannot be reached.
pub const UNREACHABLE_TEXT: &str = "Sorry, I cannot connect to the AI server right now.";

/// Detail used when a rejection carries none.
pub const UNKNOWN_ERROR: &str = "Unknown Error";

/// Role label for users without a loaded profile.
pub const DEFAULT_ROLE: &str = "Staff";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub id: u64,
    pub content: String,
    pub sender: Sender,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Active,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepIcon {
    Shield,
    Lock,
    Robot,
    Database,
    Book,
}

/// One step of the reasoning trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceStep {
    pub title: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<StepIcon>,
}

impl TraceStep {
    fn new(title: &str, status: StepStatus, icon: StepIcon) -> Self {
        Self {
            title: title.to_string(),
            status,
            description: None,
            icon: Some(icon),
        }
    }

    fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatPhase {
    Idle,
    AwaitingResponse,
    RenderingDirectAnswer,
    RenderingTabularResult,
    RenderingError,
}

/// How a query turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The backend refused the query (non-2xx) with this detail.
    Rejected { detail: Option<String> },
    /// The backend answered.
    Replied(QueryReply),
    /// The request never produced a usable response.
    Unreachable,
}

/// A submitted query waiting for its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    pub ticket: u64,
    pub query: String,
    pub category: String,
}

/// Conversation state for one chat view.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    trace: Vec<TraceStep>,
    phase: ChatPhase,
    busy: bool,
    category: String,
    forced: bool,
    #[serde(skip)]
    next_id: u64,
}

impl ChatSession {
    /// A session starting in `category`, greeting the user.
    pub fn new(category: impl Into<String>) -> Self {
        let mut session = Self::empty(category.into(), false);
        session.push_assistant(
            "Hello! I am **Corporate AI**. How can I help you today?".to_string(),
            None,
        );
        session
    }

    /// A session locked to one category; category switches are ignored.
    pub fn forced(category: impl Into<String>) -> Self {
        let category = category.into();
        let greeting = format!(
            "Hello! I am **Corporate AI** specialized in **{}**. How can I help you?",
            category
        );
        let mut session = Self::empty(category, true);
        session.push_assistant(greeting, None);
        session
    }

    fn empty(category: String, forced: bool) -> Self {
        Self {
            messages: Vec::new(),
            trace: Vec::new(),
            phase: ChatPhase::Idle,
            busy: false,
            category,
            forced,
            next_id: 1,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn trace(&self) -> &[TraceStep] {
        &self.trace
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    /// Placeholder shown in the input line.
    pub fn prompt_hint(&self) -> String {
        format!("Ask regarding {}...", self.category)
    }

    /// Switch knowledge base. The transcript is cleared; returns false
    /// (and changes nothing) when the category is forced.
    pub fn select_category(&mut self, category: impl Into<String>) -> bool {
        if self.forced {
            return false;
        }
        self.category = category.into();
        self.messages.clear();
        true
    }

    /// Start a turn. Blank input is ignored and returns `None`.
    pub fn begin(&mut self, text: &str, role: Option<&str>) -> Option<PendingQuery> {
        if text.trim().is_empty() {
            return None;
        }

        let id = self.take_id();
        self.messages.push(ChatMessage {
            id,
            content: text.to_string(),
            sender: Sender::User,
            outcome: None,
            role: Some(role.unwrap_or(DEFAULT_ROLE).to_string()),
        });
        self.busy = true;
        self.phase = ChatPhase::AwaitingResponse;
        self.trace = vec![TraceStep::new(
            "Requirement Analysis",
            StepStatus::Active,
            StepIcon::Shield,
        )];

        Some(PendingQuery {
            ticket: id,
            query: text.to_string(),
            category: self.category.clone(),
        })
    }

    /// Finish a turn. Outcomes are applied in the order they arrive.
    pub fn complete(&mut self, outcome: QueryOutcome) {
        match outcome {
            QueryOutcome::Rejected { detail } => {
                let detail = detail.unwrap_or_else(|| UNKNOWN_ERROR.to_string());
                self.trace = vec![
                    TraceStep::new("Access Denied", StepStatus::Error, StepIcon::Lock)
                        .describe(detail.clone()),
                ];
                self.phase = ChatPhase::RenderingError;
                self.push_assistant(format!("**Error**: {}", detail), Some(Outcome::Error));
            }
            QueryOutcome::Replied(QueryReply::Answer(text)) => {
                self.trace = vec![TraceStep::new(
                    "Response Generated",
                    StepStatus::Success,
                    StepIcon::Robot,
                )];
                self.phase = ChatPhase::RenderingDirectAnswer;
                self.push_assistant(text, Some(Outcome::Success));
            }
            QueryOutcome::Replied(QueryReply::Rows { sql, rows }) => {
                self.trace = vec![
                    TraceStep::new("Security Check Passed", StepStatus::Success, StepIcon::Shield),
                    TraceStep::new("Generating SQL", StepStatus::Success, StepIcon::Database)
                        .describe(format!("```sql\n{}\n```", sql)),
                    TraceStep::new("Data Fetched", StepStatus::Success, StepIcon::Book),
                ];
                self.phase = ChatPhase::RenderingTabularResult;
                self.push_assistant(render_rows(&rows), Some(Outcome::Success));
            }
            QueryOutcome::Unreachable => {
                self.trace.push(TraceStep::new(
                    "Network Error",
                    StepStatus::Error,
                    StepIcon::Database,
                ));
                self.phase = ChatPhase::RenderingError;
                self.push_assistant(UNREACHABLE_TEXT.to_string(), Some(Outcome::Error));
            }
        }
    }

    fn push_assistant(&mut self, content: String, outcome: Option<Outcome>) {
        let id = self.take_id();
        self.messages.push(ChatMessage {
            id,
            content,
            sender: Sender::Assistant,
            outcome,
            role: None,
        });
        self.busy = false;
    }

    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORY)
    }
}

/// Notice used instead of an empty table.
pub const NO_RECORDS: &str = "No matching records found.";

/// Render result rows as a markdown table.
///
/// Columns are the keys of the first row, in that row's order. Every row
/// is looked up by those keys; missing and null values render empty.
pub fn render_rows(rows: &[Row]) -> String {
    let mut content = String::from("Here is the data I found:\n\n");
    let Some(first) = rows.first() else {
        content.push_str(NO_RECORDS);
        return content;
    };

    let keys: Vec<&String> = first.keys().collect();
    let header: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
    content.push_str(&format!("| {} |\n", header.join(" | ")));
    content.push_str(&format!(
        "| {} |\n",
        keys.iter().map(|_| "---").collect::<Vec<_>>().join(" | ")
    ));

    for row in rows {
        let cells: Vec<String> = keys.iter().map(|k| cell_text(row.get(*k))).collect();
        content.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    content
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

//! Training-pipeline progress events and the dashboard they drive.
//!
//! `POST /admin/train/start` answers with one JSON object per line. Each
//! line is validated here into a [`PipelineEvent`]: the required fields
//! (`step`, `status`, `message`) must be present and well-typed, and every
//! optional field becomes a tagged [`StagePayload`]. A line that fails
//! validation yields an [`EventError`] and is skipped by the consumer; it
//! never affects the lines after it.
//!
//! [`Dashboard`] is the state the admin view renders. Applying an event:
//!
//! | Field | Effect |
//! |-------|--------|
//! | `step` | current step becomes `step + 1` (clamped to the timeline) |
//! | `status`, `message` | `[STATUS] message` appended to the log |
//! | `report` | insight report overwritten |
//! | `report_data` | data-quality table overwritten |
//! | `classification_data` | classification groups overwritten |
//! | `completed_vectors` | completed vector groups replaced (not accumulated) |

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timeline stages, in order. The last one is reached when every
/// backend stage has reported.
pub const STAGES: [&str; 6] = [
    "Fetch Data",
    "Clean & Aggregate",
    "Classify",
    "Vectorize",
    "Insight Analysis",
    "Done",
];

/// Index of the final "Done" stage.
pub const DONE_STAGE: usize = STAGES.len() - 1;

/// Log line appended when the stream cannot be read.
pub const CONNECTION_FAILED: &str = "[ERROR] Connection failed";

/// Why a stream line was rejected.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("line is not valid JSON: {0}")]
    Syntax(#[source] serde_json::Error),
    #[error("event does not match the progress schema: {0}")]
    Schema(#[source] serde_json::Error),
    #[error("event is not a JSON object")]
    NotAnObject,
}

/// One row of the data-quality report produced by the cleaning stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityIssue {
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub action: String,
}

impl QualityIssue {
    pub fn severity_level(&self) -> Severity {
        match self.severity.as_str() {
            "Critical" => Severity::Critical,
            "Error" => Severity::Error,
            "Warning" => Severity::Warning,
            _ => Severity::Info,
        }
    }

    /// Rows whose action removed data are highlighted differently.
    pub fn dropped(&self) -> bool {
        self.action == "Dropped" || self.action.contains("DROPPED")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Tables grouped under one classification label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationGroup {
    pub group: String,
    #[serde(default)]
    pub tables: Vec<String>,
}

/// Wire shape of one progress line.
#[derive(Debug, Deserialize)]
struct RawEvent {
    step: usize,
    status: String,
    message: String,
    #[serde(default)]
    report: Option<String>,
    #[serde(default)]
    report_data: Option<Vec<QualityIssue>>,
    #[serde(default)]
    classification_data: Option<Vec<ClassificationGroup>>,
    #[serde(default)]
    completed_vectors: Option<Vec<String>>,
}

/// Optional stage output carried by an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StagePayload {
    Insight(String),
    QualityReport(Vec<QualityIssue>),
    Classification(Vec<ClassificationGroup>),
    VectorsCompleted(Vec<String>),
}

/// A validated progress event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineEvent {
    pub stage: usize,
    pub status: String,
    pub message: String,
    pub payloads: Vec<StagePayload>,
}

impl PipelineEvent {
    /// Validate one complete stream line.
    pub fn parse_line(line: &str) -> Result<Self, EventError> {
        let value: serde_json::Value = serde_json::from_str(line).map_err(EventError::Syntax)?;
        if !value.is_object() {
            return Err(EventError::NotAnObject);
        }
        let raw: RawEvent = serde_json::from_value(value).map_err(EventError::Schema)?;

        let mut payloads = Vec::new();
        if let Some(report) = raw.report.filter(|r| !r.is_empty()) {
            payloads.push(StagePayload::Insight(report));
        }
        if let Some(rows) = raw.report_data {
            payloads.push(StagePayload::QualityReport(rows));
        }
        if let Some(groups) = raw.classification_data {
            payloads.push(StagePayload::Classification(groups));
        }
        if let Some(done) = raw.completed_vectors {
            payloads.push(StagePayload::VectorsCompleted(done));
        }

        Ok(Self {
            stage: raw.step,
            status: raw.status,
            message: raw.message,
            payloads,
        })
    }

    /// The log line this event contributes.
    pub fn log_line(&self) -> String {
        format!("[{}] {}", self.status, self.message)
    }
}

/// Display state of a timeline stage relative to the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    Completed,
    InProgress,
    Pending,
}

impl StageState {
    pub fn label(&self) -> &'static str {
        match self {
            StageState::Completed => "Completed",
            StageState::InProgress => "In Progress",
            StageState::Pending => "Pending",
        }
    }
}

/// Indexing state of one classification group in the vectorize panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorGroupStatus<'a> {
    pub group: &'a str,
    pub tables: &'a [String],
    pub indexed: bool,
}

/// A file known to the fetch stage. The fetch panel lists the
/// connector snapshot the backend ingests from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestedSource {
    pub file: &'static str,
    pub size: &'static str,
    pub rows: u32,
    pub source: &'static str,
    pub status: &'static str,
    pub updated: &'static str,
}

pub const INGESTED_SOURCES: [IngestedSource; 4] = [
    IngestedSource {
        file: "cisli245.csv",
        size: "450 KB",
        rows: 2400,
        source: "ERP Connector",
        status: "Synced",
        updated: "2 mins ago",
    },
    IngestedSource {
        file: "whinh430.csv",
        size: "820 KB",
        rows: 5120,
        source: "WMS Connector",
        status: "Synced",
        updated: "2 mins ago",
    },
    IngestedSource {
        file: "tcibd001.csv",
        size: "120 KB",
        rows: 850,
        source: "Master Data",
        status: "Synced",
        updated: "5 mins ago",
    },
    IngestedSource {
        file: "tdsls400.csv",
        size: "2.1 MB",
        rows: 12500,
        source: "Legacy Sales",
        status: "Synced",
        updated: "10 mins ago",
    },
];

/// Admin training dashboard state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dashboard {
    pub current_step: usize,
    pub processing: bool,
    pub log: Vec<String>,
    pub final_report: Option<String>,
    pub quality_report: Vec<QualityIssue>,
    pub classification: Vec<ClassificationGroup>,
    pub completed_vectors: Vec<String>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for a new training run.
    pub fn begin(&mut self) {
        *self = Self {
            processing: true,
            ..Self::default()
        };
    }

    /// Apply one event. Only the slices the event names change.
    pub fn apply(&mut self, event: &PipelineEvent) {
        self.current_step = (event.stage + 1).min(STAGES.len());
        self.log.push(event.log_line());

        for payload in &event.payloads {
            match payload {
                StagePayload::Insight(report) => self.final_report = Some(report.clone()),
                StagePayload::QualityReport(rows) => self.quality_report = rows.clone(),
                StagePayload::Classification(groups) => self.classification = groups.clone(),
                StagePayload::VectorsCompleted(done) => self.completed_vectors = done.clone(),
            }
        }
    }

    /// The stream broke. The stage stays where it was.
    pub fn fail(&mut self) {
        self.log.push(CONNECTION_FAILED.to_string());
    }

    /// The stream ended (cleanly or not).
    pub fn finish(&mut self) {
        self.processing = false;
    }

    pub fn stage_state(&self, index: usize) -> StageState {
        match index.cmp(&self.current_step) {
            std::cmp::Ordering::Less => StageState::Completed,
            std::cmp::Ordering::Equal => StageState::InProgress,
            std::cmp::Ordering::Greater => StageState::Pending,
        }
    }

    /// Stage panel that should be in focus: the running stage while
    /// processing, the insight panel once everything is done.
    pub fn focused_stage(&self) -> Option<usize> {
        if self.current_step >= DONE_STAGE {
            Some(DONE_STAGE - 1)
        } else if self.processing {
            Some(self.current_step)
        } else {
            None
        }
    }

    /// Message of the first log line tagged with `status`, tag removed.
    pub fn first_log_for(&self, status: &str) -> Option<String> {
        let tag = format!("[{}] ", status);
        self.log
            .iter()
            .find(|l| l.contains(status))
            .map(|l| l.replacen(&tag, "", 1))
    }

    /// Messages of every log line tagged with `status`, tag removed.
    pub fn logs_for(&self, status: &str) -> Vec<String> {
        let tag = format!("[{}] ", status);
        self.log
            .iter()
            .filter(|l| l.contains(status))
            .map(|l| l.replacen(&tag, "", 1))
            .collect()
    }

    /// Classification groups with their indexing state.
    pub fn vector_groups(&self) -> Vec<VectorGroupStatus<'_>> {
        self.classification
            .iter()
            .map(|g| VectorGroupStatus {
                group: &g.group,
                tables: &g.tables,
                indexed: self.completed_vectors.iter().any(|v| v == &g.group),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ndjson::LineFramer;

    fn ev(line: &str) -> PipelineEvent {
        PipelineEvent::parse_line(line).unwrap()
    }

    #[test]
    fn parse_minimal_event() {
        let e = ev(r#"{"step":0,"status":"FETCHING","message":"Pulling files"}"#);
        assert_eq!(e.stage, 0);
        assert_eq!(e.log_line(), "[FETCHING] Pulling files");
        assert!(e.payloads.is_empty());
    }

    #[test]
    fn parse_rejects_bad_lines() {
        assert!(matches!(
            PipelineEvent::parse_line("{not json"),
            Err(EventError::Syntax(_))
        ));
        assert!(matches!(
            PipelineEvent::parse_line("[1,2]"),
            Err(EventError::NotAnObject)
        ));
        assert!(matches!(
            PipelineEvent::parse_line(r#"{"status":"X","message":"no step"}"#),
            Err(EventError::Schema(_))
        ));
        assert!(matches!(
            PipelineEvent::parse_line(r#"{"step":-1,"status":"X","message":"m"}"#),
            Err(EventError::Schema(_))
        ));
    }

    #[test]
    fn parse_collects_every_payload() {
        let e = ev(r#"{"step":3,"status":"VECTORIZING","message":"m",
            "report":"Insight","report_data":[{"scope":"Table","target":"t1","issue":"nulls","severity":"Warning","action":"Filled"}],
            "classification_data":[{"group":"Sales","tables":["t1"]}],
            "completed_vectors":["Sales"]}"#);
        assert_eq!(e.payloads.len(), 4);
        assert_eq!(e.payloads[0], StagePayload::Insight("Insight".into()));
    }

    #[test]
    fn apply_moves_to_next_step_and_logs() {
        let mut d = Dashboard::new();
        d.begin();
        d.apply(&ev(r#"{"step":0,"status":"FETCHING","message":"a"}"#));
        assert_eq!(d.current_step, 1);
        d.apply(&ev(r#"{"step":1,"status":"CLEANING","message":"b"}"#));
        assert_eq!(d.current_step, 2);
        assert_eq!(d.log, vec!["[FETCHING] a", "[CLEANING] b"]);
        assert_eq!(d.stage_state(0), StageState::Completed);
        assert_eq!(d.stage_state(2), StageState::InProgress);
        assert_eq!(d.stage_state(3), StageState::Pending);
    }

    #[test]
    fn step_is_clamped_to_timeline() {
        let mut d = Dashboard::new();
        d.apply(&ev(r#"{"step":42,"status":"DONE","message":"x"}"#));
        assert_eq!(d.current_step, STAGES.len());
    }

    #[test]
    fn payloads_overwrite_only_their_slice() {
        let mut d = Dashboard::new();
        d.begin();
        d.apply(&ev(
            r#"{"step":2,"status":"CLASSIFYING","message":"m","classification_data":[{"group":"Sales","tables":["a","b"]}]}"#,
        ));
        d.apply(&ev(r#"{"step":3,"status":"VECTORIZING","message":"m","report":"R1"}"#));
        assert_eq!(d.classification.len(), 1);
        assert_eq!(d.final_report.as_deref(), Some("R1"));

        d.apply(&ev(r#"{"step":4,"status":"INSIGHT","message":"m","report":"R2"}"#));
        assert_eq!(d.final_report.as_deref(), Some("R2"));
        assert_eq!(d.classification[0].tables, vec!["a", "b"]);
    }

    #[test]
    fn completed_vectors_are_replaced_not_accumulated() {
        let mut d = Dashboard::new();
        d.apply(&ev(
            r#"{"step":2,"status":"CLASSIFYING","message":"m","classification_data":[{"group":"Sales","tables":[]},{"group":"HR","tables":[]}]}"#,
        ));
        d.apply(&ev(r#"{"step":3,"status":"VECTORIZING","message":"m","completed_vectors":["Sales"]}"#));
        d.apply(&ev(r#"{"step":3,"status":"VECTORIZING","message":"m","completed_vectors":["HR"]}"#));
        assert_eq!(d.completed_vectors, vec!["HR"]);
        let groups = d.vector_groups();
        assert!(!groups[0].indexed);
        assert!(groups[1].indexed);
    }

    #[test]
    fn fail_keeps_stage() {
        let mut d = Dashboard::new();
        d.begin();
        d.apply(&ev(r#"{"step":1,"status":"CLEANING","message":"m"}"#));
        d.fail();
        d.finish();
        assert_eq!(d.current_step, 2);
        assert_eq!(d.log.last().map(String::as_str), Some(CONNECTION_FAILED));
        assert!(!d.processing);
    }

    #[test]
    fn begin_resets_previous_run() {
        let mut d = Dashboard::new();
        d.apply(&ev(r#"{"step":4,"status":"INSIGHT","message":"m","report":"old"}"#));
        d.begin();
        assert_eq!(d.current_step, 0);
        assert!(d.log.is_empty());
        assert!(d.final_report.is_none());
        assert!(d.processing);
    }

    #[test]
    fn focused_stage_follows_progress() {
        let mut d = Dashboard::new();
        assert_eq!(d.focused_stage(), None);
        d.begin();
        assert_eq!(d.focused_stage(), Some(0));
        d.apply(&ev(r#"{"step":2,"status":"CLASSIFYING","message":"m"}"#));
        assert_eq!(d.focused_stage(), Some(3));
        d.apply(&ev(r#"{"step":4,"status":"DONE","message":"m"}"#));
        assert_eq!(d.focused_stage(), Some(4));
    }

    #[test]
    fn stage_log_excerpts() {
        let mut d = Dashboard::new();
        d.apply(&ev(r#"{"step":1,"status":"CLEANING","message":"dedup 10 rows"}"#));
        d.apply(&ev(r#"{"step":3,"status":"VECTORIZING","message":"group A"}"#));
        d.apply(&ev(r#"{"step":3,"status":"VECTORIZING","message":"group B"}"#));
        assert_eq!(d.first_log_for("CLEANING").as_deref(), Some("dedup 10 rows"));
        assert_eq!(d.logs_for("VECTORIZING"), vec!["group A", "group B"]);
        assert!(d.first_log_for("CLASSIFYING").is_none());
    }

    #[test]
    fn malformed_line_does_not_hide_later_lines() {
        let stream = b"{\"step\":0,\"status\":\"FETCHING\",\"message\":\"a\"}\n{oops\n\n{\"step\":1,\"status\":\"CLEANING\",\"message\":\"b\"}\n{\"step\":2";
        let mut framer = LineFramer::new();
        let mut d = Dashboard::new();
        d.begin();
        let mut rejected = 0;
        for line in framer.push(stream) {
            if line.trim().is_empty() {
                continue;
            }
            match PipelineEvent::parse_line(&line) {
                Ok(e) => d.apply(&e),
                Err(_) => rejected += 1,
            }
        }
        assert_eq!(rejected, 1);
        assert_eq!(d.log, vec!["[FETCHING] a", "[CLEANING] b"]);
        assert_eq!(d.current_step, 2);
        assert_eq!(framer.finish().as_deref(), Some("{\"step\":2"));
    }

    #[test]
    fn quality_issue_helpers() {
        let issue = QualityIssue {
            scope: "Column".into(),
            target: "qty".into(),
            issue: "negative".into(),
            severity: "Critical".into(),
            action: "ROWS DROPPED".into(),
        };
        assert_eq!(issue.severity_level(), Severity::Critical);
        assert!(issue.dropped());
    }
}

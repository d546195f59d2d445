//! Training progress reporting.
//!
//! Reports each pipeline event as it arrives during `corpai admin train`
//! so the operator sees which stage is running. Progress is emitted on
//! **stderr** so the final dashboard on stdout stays parseable for scripts.

use std::io::Write;

use corpai_core::pipeline::{PipelineEvent, STAGES};

/// A single progress notification.
#[derive(Clone, Debug)]
pub enum TrainingProgress<'a> {
    /// The training request was accepted; events will follow.
    Started,
    /// A validated event was applied; `current_step` is the new position.
    Event {
        event: &'a PipelineEvent,
        current_step: usize,
    },
    /// A line was rejected and skipped.
    Skipped { reason: String },
    /// The stream ended.
    Finished { events: u64, skipped: u64 },
    /// The stream broke.
    Failed { reason: String },
}

/// Reports training progress. Implementations write to stderr (human or JSON).
pub trait PipelineReporter: Send + Sync {
    fn report(&self, progress: TrainingProgress<'_>);
}

/// Human-friendly progress on stderr: "train  3/6 Classify  [CLASSIFYING] Grouping tables".
pub struct StderrProgress;

impl PipelineReporter for StderrProgress {
    fn report(&self, progress: TrainingProgress<'_>) {
        let line = match &progress {
            TrainingProgress::Started => "train  started\n".to_string(),
            TrainingProgress::Event {
                event,
                current_step,
            } => {
                let title = STAGES
                    .get(event.stage)
                    .copied()
                    .unwrap_or("Unknown stage");
                format!(
                    "train  {}/{} {}  {}\n",
                    (*current_step).min(STAGES.len()),
                    STAGES.len(),
                    title,
                    event.log_line()
                )
            }
            TrainingProgress::Skipped { reason } => format!("train  skipped line: {}\n", reason),
            TrainingProgress::Finished { events, skipped } => {
                format!(
                    "train  finished  {} events, {} skipped\n",
                    format_number(*events),
                    format_number(*skipped)
                )
            }
            TrainingProgress::Failed { reason } => format!("train  failed: {}\n", reason),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl PipelineReporter for JsonProgress {
    fn report(&self, progress: TrainingProgress<'_>) {
        if let Ok(line) = serde_json::to_string(&progress_json(&progress)) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

fn progress_json(progress: &TrainingProgress<'_>) -> serde_json::Value {
    match progress {
        TrainingProgress::Started => serde_json::json!({ "event": "started" }),
        TrainingProgress::Event {
            event,
            current_step,
        } => serde_json::json!({
            "event": "progress",
            "stage": event.stage,
            "current_step": current_step,
            "status": event.status,
            "message": event.message,
            "payloads": event.payloads,
        }),
        TrainingProgress::Skipped { reason } => serde_json::json!({
            "event": "skipped",
            "reason": reason
        }),
        TrainingProgress::Finished { events, skipped } => serde_json::json!({
            "event": "finished",
            "events": events,
            "skipped": skipped
        }),
        TrainingProgress::Failed { reason } => serde_json::json!({
            "event": "failed",
            "reason": reason
        }),
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl PipelineReporter for NoProgress {
    fn report(&self, _progress: TrainingProgress<'_>) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn PipelineReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

//! Training pipeline runner.
//!
//! `corpai admin train` posts `/admin/train/start` and consumes the NDJSON
//! response as it arrives:
//!
//! ```text
//! bytes ──▶ LineFramer ──▶ PipelineEvent::parse_line ──▶ Dashboard::apply
//!                │                      │
//!                └─ trailing fragment   └─ invalid line: warn + skip
//!                   discarded
//! ```
//!
//! Each event is also handed to a [`PipelineReporter`] so the operator sees
//! progress on stderr. When the stream finishes the full dashboard is
//! printed to stdout.

use anyhow::{bail, Result};
use futures_util::{Stream, StreamExt};

use corpai_core::ndjson::LineFramer;
use corpai_core::pipeline::{
    Dashboard, PipelineEvent, Severity, StageState, INGESTED_SOURCES, STAGES,
};

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::progress::{PipelineReporter, ProgressMode, TrainingProgress};

/// Counters for one consumed stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Events applied to the dashboard.
    pub events: u64,
    /// Complete lines that failed validation.
    pub skipped: u64,
    /// Bytes of an unterminated final line that were dropped.
    pub discarded_bytes: usize,
}

/// Feed a byte stream into `dashboard`, one complete line at a time.
///
/// Blank lines are ignored. A line that fails validation is logged and
/// skipped without affecting the lines after it. A trailing fragment
/// with no newline is never parsed. The first stream error is returned;
/// events applied before it stay applied.
pub async fn consume_events<S, B, E>(
    stream: S,
    dashboard: &mut Dashboard,
    reporter: &dyn PipelineReporter,
) -> Result<StreamStats, E>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    let mut framer = LineFramer::new();
    let mut stats = StreamStats::default();
    futures_util::pin_mut!(stream);

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        for line in framer.push(chunk.as_ref()) {
            if line.trim().is_empty() {
                continue;
            }
            match PipelineEvent::parse_line(&line) {
                Ok(event) => {
                    dashboard.apply(&event);
                    stats.events += 1;
                    reporter.report(TrainingProgress::Event {
                        event: &event,
                        current_step: dashboard.current_step,
                    });
                }
                Err(e) => {
                    tracing::warn!("skipping malformed progress line: {}", e);
                    stats.skipped += 1;
                    reporter.report(TrainingProgress::Skipped {
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    if let Some(tail) = framer.finish() {
        tracing::debug!(bytes = tail.len(), "discarding unterminated final line");
        stats.discarded_bytes = tail.len();
    }

    Ok(stats)
}

/// Run one training session against the backend.
///
/// The dashboard is reset first. On any failure the connection-failed
/// line is appended and the stage stays where it was.
pub async fn run_training(
    client: &ApiClient,
    dashboard: &mut Dashboard,
    reporter: &dyn PipelineReporter,
) -> Result<StreamStats, ClientError> {
    dashboard.begin();

    let result = match client.start_training().await {
        Ok(stream) => {
            reporter.report(TrainingProgress::Started);
            consume_events(stream, dashboard, reporter)
                .await
                .map_err(ClientError::from)
        }
        Err(e) => Err(e),
    };

    match &result {
        Ok(stats) => reporter.report(TrainingProgress::Finished {
            events: stats.events,
            skipped: stats.skipped,
        }),
        Err(e) => {
            tracing::warn!("training stream failed: {}", e);
            dashboard.fail();
            reporter.report(TrainingProgress::Failed {
                reason: e.to_string(),
            });
        }
    }

    dashboard.finish();
    result
}

/// `corpai admin train`: run the pipeline and print the dashboard.
pub async fn run_train(client: &ApiClient, progress: ProgressMode) -> Result<()> {
    let reporter = progress.reporter();
    let mut dashboard = Dashboard::new();
    let result = run_training(client, &mut dashboard, reporter.as_ref()).await;

    print!("{}", render_dashboard(&dashboard));

    if let Err(e) = result {
        if e.is_auth() {
            bail!("Session expired. Run `corpai login` to sign in again.");
        }
        bail!("Training failed: {}", e);
    }
    Ok(())
}

/// Full text rendering of the dashboard: timeline, stage panels, log.
pub fn render_dashboard(dashboard: &Dashboard) -> String {
    let mut out = String::new();

    out.push_str("Knowledge Base Training\n");
    out.push_str("=======================\n\n");
    out.push_str(&render_timeline(dashboard));

    for index in 0..STAGES.len() - 1 {
        if dashboard.stage_state(index) == StageState::Pending {
            continue;
        }
        let focus = if dashboard.focused_stage() == Some(index) {
            " *"
        } else {
            ""
        };
        out.push_str(&format!("\n{}{}\n", STAGES[index], focus));
        out.push_str(&format!("{}\n", "-".repeat(STAGES[index].len() + focus.len())));
        out.push_str(&render_panel(dashboard, index));
    }

    if !dashboard.log.is_empty() {
        out.push_str("\nLog\n---\n");
        for line in &dashboard.log {
            out.push_str(&format!("  {}\n", line));
        }
    }
    out
}

/// One row per stage with its state.
pub fn render_timeline(dashboard: &Dashboard) -> String {
    let mut out = String::new();
    for (index, title) in STAGES.iter().enumerate() {
        let state = dashboard.stage_state(index);
        let marker = match state {
            StageState::Completed => "[x]",
            StageState::InProgress => "[>]",
            StageState::Pending => "[ ]",
        };
        out.push_str(&format!(
            "  {} {}. {:<20} {}\n",
            marker,
            index + 1,
            title,
            state.label()
        ));
    }
    out
}

fn render_panel(dashboard: &Dashboard, index: usize) -> String {
    let mut out = String::new();
    match index {
        0 => {
            out.push_str(&format!(
                "  {:<14} {:>8} {:>7}  {:<14} {:<8} {}\n",
                "FILE", "SIZE", "ROWS", "SOURCE", "STATUS", "UPDATED"
            ));
            for s in INGESTED_SOURCES.iter() {
                out.push_str(&format!(
                    "  {:<14} {:>8} {:>7}  {:<14} {:<8} {}\n",
                    s.file, s.size, s.rows, s.source, s.status, s.updated
                ));
            }
        }
        1 => {
            if let Some(summary) = dashboard.first_log_for("CLEANING") {
                out.push_str(&format!("  {}\n", summary));
            }
            if dashboard.quality_report.is_empty() {
                out.push_str("  No data quality issues reported.\n");
            } else {
                out.push_str(&format!(
                    "  {:<8} {:<20} {:<30} {:<8} {}\n",
                    "SCOPE", "TARGET", "ISSUE", "SEVERITY", "ACTION"
                ));
                for row in &dashboard.quality_report {
                    let severity = match row.severity_level() {
                        Severity::Critical => "CRITICAL",
                        Severity::Error => "ERROR",
                        Severity::Warning => "WARNING",
                        Severity::Info => "INFO",
                    };
                    let action = if row.dropped() {
                        format!("{} !", row.action)
                    } else {
                        row.action.clone()
                    };
                    out.push_str(&format!(
                        "  {:<8} {:<20} {:<30} {:<8} {}\n",
                        row.scope, row.target, row.issue, severity, action
                    ));
                }
            }
        }
        2 => {
            for line in dashboard.logs_for("CLASSIFYING") {
                out.push_str(&format!("  {}\n", line));
            }
            for group in &dashboard.classification {
                out.push_str(&format!(
                    "  {:<20} {}\n",
                    group.group,
                    group.tables.join(", ")
                ));
            }
        }
        3 => {
            let groups = dashboard.vector_groups();
            if groups.is_empty() {
                out.push_str("  Waiting for classification groups.\n");
            }
            for g in groups {
                out.push_str(&format!(
                    "  {:<20} {:<10} {} tables\n",
                    g.group,
                    if g.indexed { "Indexed" } else { "Indexing" },
                    g.tables.len()
                ));
            }
        }
        _ => match &dashboard.final_report {
            Some(report) => {
                for line in report.lines() {
                    out.push_str(&format!("  {}\n", line));
                }
            }
            None => out.push_str("  Generating insight report...\n"),
        },
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use futures_util::stream;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<String>>,
    }

    impl PipelineReporter for Recording {
        fn report(&self, progress: TrainingProgress<'_>) {
            let tag = match progress {
                TrainingProgress::Started => "started".to_string(),
                TrainingProgress::Event { current_step, .. } => format!("event {}", current_step),
                TrainingProgress::Skipped { .. } => "skipped".to_string(),
                TrainingProgress::Finished { .. } => "finished".to_string(),
                TrainingProgress::Failed { .. } => "failed".to_string(),
            };
            self.seen.lock().unwrap().push(tag);
        }
    }

    fn chunks(parts: &[&[u8]]) -> Vec<Result<Vec<u8>, std::io::Error>> {
        parts.iter().map(|p| Ok(p.to_vec())).collect()
    }

    #[tokio::test]
    async fn applies_events_across_chunk_boundaries() {
        let body = "{\"step\":0,\"status\":\"FETCHING\",\"message\":\"Pulling\"}\n{\"step\":1,\"status\":\"CLEANING\",\"message\":\"Dropped 3 rows\"}\n";
        let (a, b) = body.as_bytes().split_at(37);
        let mut dashboard = Dashboard::new();
        dashboard.begin();

        let stats = consume_events(stream::iter(chunks(&[a, b])), &mut dashboard, &NoProgress)
            .await
            .unwrap();

        assert_eq!(stats.events, 2);
        assert_eq!(stats.skipped, 0);
        assert_eq!(dashboard.current_step, 2);
        assert_eq!(
            dashboard.log,
            vec!["[FETCHING] Pulling", "[CLEANING] Dropped 3 rows"]
        );
    }

    #[tokio::test]
    async fn malformed_line_is_isolated() {
        let body = b"{\"step\":0,\"status\":\"FETCHING\",\"message\":\"a\"}\nnot json\n\n{\"step\":2,\"status\":\"CLASSIFYING\",\"message\":\"b\"}\n";
        let reporter = Recording::default();
        let mut dashboard = Dashboard::new();

        let stats = consume_events(
            stream::iter(chunks(&[body.as_slice()])),
            &mut dashboard,
            &reporter,
        )
        .await
        .unwrap();

        assert_eq!(stats.events, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(dashboard.current_step, 3);
        assert_eq!(
            *reporter.seen.lock().unwrap(),
            vec!["event 1", "skipped", "event 3"]
        );
    }

    #[tokio::test]
    async fn trailing_fragment_is_never_parsed() {
        let body = b"{\"step\":0,\"status\":\"FETCHING\",\"message\":\"a\"}\n{\"step\":4,\"status\":\"DONE\",\"message\":\"b\"}";
        let mut dashboard = Dashboard::new();

        let stats = consume_events(
            stream::iter(chunks(&[body.as_slice()])),
            &mut dashboard,
            &NoProgress,
        )
        .await
        .unwrap();

        assert_eq!(stats.events, 1);
        assert!(stats.discarded_bytes > 0);
        assert_eq!(dashboard.current_step, 1);
    }

    #[tokio::test]
    async fn stream_error_keeps_applied_events() {
        let items: Vec<Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"{\"step\":1,\"status\":\"CLEANING\",\"message\":\"a\"}\n".to_vec()),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(b"{\"step\":3,\"status\":\"EMBEDDING\",\"message\":\"b\"}\n".to_vec()),
        ];
        let mut dashboard = Dashboard::new();

        let err = consume_events(stream::iter(items), &mut dashboard, &NoProgress)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionReset);
        assert_eq!(dashboard.current_step, 2);
        assert_eq!(dashboard.log.len(), 1);
    }

    #[test]
    fn timeline_marks_states() {
        let mut dashboard = Dashboard::new();
        dashboard.current_step = 2;
        let text = render_timeline(&dashboard);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), STAGES.len());
        assert!(lines[0].starts_with("  [x] 1. Fetch Data"));
        assert!(lines[1].ends_with("Completed"));
        assert!(lines[2].contains("[>]"));
        assert!(lines[2].ends_with("In Progress"));
        assert!(lines[5].ends_with("Pending"));
    }

    #[test]
    fn dashboard_shows_report_and_log() {
        let mut dashboard = Dashboard::new();
        dashboard.begin();
        dashboard.apply(
            &PipelineEvent::parse_line(
                r#"{"step":4,"status":"DONE","message":"finished","report":"Sales up 4%"}"#,
            )
            .unwrap(),
        );
        dashboard.fail();
        dashboard.finish();

        let text = render_dashboard(&dashboard);
        assert!(text.contains("Insight Analysis *"));
        assert!(text.contains("  Sales up 4%\n"));
        assert!(text.contains("  [DONE] finished\n"));
        assert!(text.contains("  [ERROR] Connection failed\n"));
        assert!(text.contains("cisli245.csv"));
    }
}

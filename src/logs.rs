//! `corpai logs list` and `corpai logs show <id>`.
//!
//! Read-only views over `GET /admin/logs`. The detail view re-fetches the
//! latest page and picks the entry by id.

use anyhow::{bail, Context, Result};

use corpai_core::audit::{AuditLogEntry, AuditStatus};

use crate::api::ApiClient;

pub async fn run_list(client: &ApiClient, limit: u32) -> Result<()> {
    let entries = client.logs(limit).await.context("Failed to load logs")?;
    print!("{}", render_list(&entries));
    Ok(())
}

pub async fn run_show(client: &ApiClient, id: i64, limit: u32) -> Result<()> {
    let entries = client.logs(limit).await.context("Failed to load logs")?;
    match entries.iter().find(|e| e.id == id) {
        Some(entry) => {
            print!("{}", render_detail(entry));
            Ok(())
        }
        None => bail!("No log entry with id {} among the latest {}", id, limit),
    }
}

/// One line per entry: id, time, status, duration, user, query.
pub fn render_list(entries: &[AuditLogEntry]) -> String {
    if entries.is_empty() {
        return "No logs found\n".to_string();
    }

    let mut out = format!(
        "{:>6}  {:<8}  {:<12} {:>8}  {:<28} {}\n",
        "ID", "TIME", "STATUS", "DURATION", "USER", "QUERY"
    );
    out.push_str(&format!("{}\n", "-".repeat(96)));
    for e in entries {
        out.push_str(&format!(
            "{:>6}  {:<8}  {:<12} {:>8}  {:<28} {}\n",
            e.id,
            e.time_label(),
            e.status.label(),
            format!("{:.0}ms", e.execution_time_ms),
            e.user_email,
            truncate(&e.user_query, 60)
        ));
    }
    out
}

/// Full execution trace of one entry.
pub fn render_detail(e: &AuditLogEntry) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", e.user_query));
    out.push_str(&format!("{}\n\n", "=".repeat(e.user_query.chars().count().max(3))));
    out.push_str(&format!("  Status:      {}\n", e.status.label()));
    out.push_str(&format!("  Timestamp:   {}\n", e.datetime_label()));
    out.push_str(&format!("  Duration:    {:.2}ms\n", e.execution_time_ms));

    out.push_str("\nUser Context\n");
    out.push_str(&format!("  Email:       {}\n", e.user_email));
    out.push_str(&format!("  Department:  {}\n", e.user_dept));

    out.push_str("\nSecurity & Governance Policy Applied\n");
    out.push_str(&indent(&e.security_policy));

    out.push_str("\nGenerated Output\n");
    if e.status == AuditStatus::NoSql {
        out.push_str(&format!("  _{}_\n", e.generated_sql));
    } else {
        out.push_str(&indent(&e.generated_sql));
    }

    if let Some(prompt) = e.system_prompt_snapshot() {
        out.push_str("\nSystem Prompt Snapshot\n");
        out.push_str(&indent(&prompt));
    }
    out
}

fn indent(text: &str) -> String {
    if text.is_empty() {
        return "  -\n".to_string();
    }
    text.lines().map(|l| format!("  {}\n", l)).collect()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(status: &str, context: serde_json::Value) -> AuditLogEntry {
        serde_json::from_value(json!({
            "id": 7,
            "timestamp": "2024-03-01T09:30:00Z",
            "user_email": "ada@corp.example",
            "user_dept": "Sales",
            "user_query": "show me Q1 sales",
            "security_policy": "dept = 'Sales'",
            "generated_sql": "SELECT * FROM sales",
            "status": status,
            "execution_time_ms": 12.25,
            "full_context": context
        }))
        .unwrap()
    }

    #[test]
    fn empty_list() {
        assert_eq!(render_list(&[]), "No logs found\n");
    }

    #[test]
    fn list_row_has_rounded_duration() {
        let text = render_list(&[entry("SUCCESS", json!({}))]);
        let row = text.lines().nth(2).unwrap();
        assert!(row.contains("Success"));
        assert!(row.contains("12ms"));
        assert!(row.ends_with("show me Q1 sales"));
    }

    #[test]
    fn detail_shows_prompt_snapshot() {
        let text = render_detail(&entry(
            "SUCCESS",
            json!("{\"system_prompt_snapshot\":\"You are a SQL analyst.\"}"),
        ));
        assert!(text.contains("  Duration:    12.25ms\n"));
        assert!(text.contains("  Department:  Sales\n"));
        assert!(text.contains("System Prompt Snapshot\n  You are a SQL analyst.\n"));
    }

    #[test]
    fn no_sql_output_is_italic() {
        let mut e = entry("NO_SQL", json!(null));
        e.generated_sql = "Answered from documents".into();
        let text = render_detail(&e);
        assert!(text.contains("  _Answered from documents_\n"));
        assert!(!text.contains("System Prompt Snapshot"));
    }

    #[test]
    fn truncate_long_queries() {
        assert_eq!(truncate("abcdef", 10), "abcdef");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }
}

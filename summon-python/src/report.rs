//! Summaries and exit codes for a task's tool results.

use anyhow::{Context, Result};

use crate::core::types::{ToolOutcome, ToolResult};
use crate::exit_codes;

/// `OK` when every tool passed (or none ran), `FAILED` otherwise.
pub fn exit_code(results: &[ToolResult]) -> i32 {
    if results.iter().all(ToolResult::succeeded) {
        exit_codes::OK
    } else {
        exit_codes::FAILED
    }
}

/// One line per invocation plus a totals line.
pub fn render_summary(results: &[ToolResult]) -> String {
    let mut lines: Vec<String> = results
        .iter()
        .map(|result| {
            let program = result.command.first().map_or("?", String::as_str);
            format!("{program:<8} {}", outcome_label(&result.outcome))
        })
        .collect();
    let failed = results.iter().filter(|r| !r.succeeded()).count();
    lines.push(format!(
        "summary: {} run, {} passed, {failed} failed",
        results.len(),
        results.len() - failed
    ));
    lines.join("\n") + "\n"
}

fn outcome_label(outcome: &ToolOutcome) -> String {
    match outcome {
        ToolOutcome::Passed => "ok".to_string(),
        ToolOutcome::Failed { code: Some(code) } => format!("failed (exit code {code})"),
        ToolOutcome::Failed { code: None } => "failed (killed by signal)".to_string(),
        ToolOutcome::TimedOut => "timed out".to_string(),
        ToolOutcome::Missing => "missing (not found on PATH)".to_string(),
        ToolOutcome::SpawnFailed => "could not start".to_string(),
    }
}

/// Results as a pretty-printed JSON array.
pub fn render_json(results: &[ToolResult]) -> Result<String> {
    serde_json::to_string_pretty(results).context("serialize results")
}

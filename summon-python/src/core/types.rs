//! Shared result types for tool invocations.

use serde::Serialize;

/// How a single tool invocation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    /// Exited with status zero.
    Passed,
    /// Exited unsuccessfully. `code` is `None` when killed by a signal.
    Failed { code: Option<i32> },
    /// Killed after exceeding the configured timeout.
    TimedOut,
    /// The program could not be found on `PATH`.
    Missing,
    /// The program was found but could not be started (for example a broken
    /// interpreter line). The OS error is kept in `stderr`.
    SpawnFailed,
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Captured result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolResult {
    /// Full argv, program first.
    pub command: Vec<String>,
    #[serde(flatten)]
    pub outcome: ToolOutcome,
    pub stdout: String,
    pub stderr: String,
    /// Bytes of stdout/stderr dropped past the output limit.
    pub truncated_bytes: usize,
}

impl ToolResult {
    /// Result for an invocation that never produced output.
    pub fn without_output(command: Vec<String>, outcome: ToolOutcome) -> Self {
        Self {
            command,
            outcome,
            stdout: String::new(),
            stderr: String::new(),
            truncated_bytes: 0,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Which module set `summon-python modules` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ModuleKind {
    /// Paths of the project's packages.
    Project,
    /// Test modules (configured, or the project modules).
    Test,
    /// Extra helper modules that are linted and formatted too.
    Extra,
    /// Sorted union of all of the above.
    All,
}

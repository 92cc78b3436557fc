//! Test-only helpers: temporary projects and a scripted tool runner.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::commands::Invocation;
use crate::core::types::{ToolOutcome, ToolResult};
use crate::io::process::{RunOptions, ToolRunner};
use crate::io::project::Project;

/// A temporary directory holding a `pyproject.toml`.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    /// Create a project whose `pyproject.toml` contains `pyproject`.
    pub fn new(pyproject: &str) -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp dir")?;
        fs::write(dir.path().join("pyproject.toml"), pyproject).context("write pyproject.toml")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn pyproject_path(&self) -> PathBuf {
        self.path().join("pyproject.toml")
    }

    /// Create an empty file (and its parent directories) at `relative`.
    pub fn touch(&self, relative: &str) -> Result<PathBuf> {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        fs::write(&path, "").with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    /// `relative` joined to the project root, as the tasks print it.
    pub fn display(&self, relative: &str) -> String {
        self.path().join(relative).display().to_string()
    }

    pub fn load(&self) -> Result<Project> {
        Project::load(&self.pyproject_path())
    }
}

/// A [`ToolRunner`] that records invocations instead of spawning them.
///
/// Every program passes unless listed in `failing`.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    failing: BTreeSet<String>,
    calls: RefCell<Vec<(Invocation, RunOptions)>>,
}

impl ScriptedRunner {
    pub fn failing(programs: &[&str]) -> Self {
        Self {
            failing: programs.iter().map(ToString::to_string).collect(),
            calls: RefCell::default(),
        }
    }

    /// Recorded invocations rendered as command lines.
    pub fn commands(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|(invocation, _)| invocation.to_string())
            .collect()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|(invocation, _)| invocation.program.clone())
            .collect()
    }

    pub fn last_options(&self) -> Option<RunOptions> {
        self.calls.borrow().last().map(|(_, options)| options.clone())
    }
}

impl ToolRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation, options: &RunOptions) -> Result<ToolResult> {
        self.calls
            .borrow_mut()
            .push((invocation.clone(), options.clone()));
        let outcome = if self.failing.contains(&invocation.program) {
            ToolOutcome::Failed { code: Some(1) }
        } else {
            ToolOutcome::Passed
        };
        Ok(ToolResult::without_output(invocation.argv(), outcome))
    }
}

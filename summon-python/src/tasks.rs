//! The developer tasks behind each `summon-python` subcommand.
//!
//! Every task returns the results of the tools it ran, in order. A failing
//! tool never stops the tools after it; only configuration errors abort.
//! The project file is loaded lazily, so `lint`/`format` with explicit files
//! work without one.

use std::path::PathBuf;

use anyhow::Result;
use tracing::debug;

use crate::core::commands::{self, Invocation};
use crate::core::types::{ModuleKind, ToolResult};
use crate::io::config::RunnerSettings;
use crate::io::process::{RunOptions, ToolRunner};
use crate::io::project::Project;

/// Task entry points sharing one runner and one lazily loaded project.
pub struct Tasks<R> {
    runner: R,
    start: PathBuf,
    echo: bool,
    project: Option<Project>,
}

impl<R: ToolRunner> Tasks<R> {
    /// Tasks resolving the project file upward from `start`.
    pub fn new(runner: R, start: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            start: start.into(),
            echo: true,
            project: None,
        }
    }

    /// Tasks over an already loaded project.
    pub fn with_project(runner: R, project: Project) -> Self {
        Self {
            runner,
            start: project.root().to_path_buf(),
            echo: true,
            project: Some(project),
        }
    }

    /// Whether tool output is streamed to the terminal while tools run.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run pytest over the test modules.
    ///
    /// With `coverage`, measures the project modules; with `coverage` and
    /// `html`, also renders the html report.
    pub fn test(&mut self, coverage: bool, html: bool) -> Result<Vec<ToolResult>> {
        let coverage_modules = if coverage {
            Some(self.project()?.project_modules()?)
        } else {
            None
        };
        let test_modules = self.project()?.test_modules()?;

        let mut results = vec![self.execute(&commands::pytest(
            coverage_modules.as_deref(),
            &test_modules,
        ))?];
        if coverage && html {
            results.push(self.coverage_html()?);
        }
        Ok(results)
    }

    /// Run mypy, flake8 and pylint over `files`, or over every module when empty.
    pub fn lint(&mut self, files: &[String], full_report: bool) -> Result<Vec<ToolResult>> {
        let subject = self.subject(files)?;
        if subject.is_empty() {
            debug!("nothing to lint");
            return Ok(Vec::new());
        }
        self.execute_all(&commands::linters(&subject, full_report))
    }

    /// Run black and isort over `files`, or over every module when empty.
    pub fn format(&mut self, files: &[String], check: bool) -> Result<Vec<ToolResult>> {
        let subject = self.subject(files)?;
        if subject.is_empty() {
            debug!("nothing to format");
            return Ok(Vec::new());
        }
        self.execute_all(&commands::formatters(&subject, check))
    }

    /// Render the html coverage report from existing coverage data.
    pub fn coverage_html(&mut self) -> Result<ToolResult> {
        self.execute(&commands::coverage_html())
    }

    /// Lint everything, then check formatting of everything.
    pub fn static_checks(&mut self) -> Result<Vec<ToolResult>> {
        let mut results = self.lint(&[], false)?;
        results.extend(self.format(&[], true)?);
        Ok(results)
    }

    /// Static checks followed by the test suite without coverage.
    pub fn all_checks(&mut self) -> Result<Vec<ToolResult>> {
        let mut results = self.static_checks()?;
        results.extend(self.test(false, false)?);
        Ok(results)
    }

    /// Resolved module list of the requested kind.
    pub fn modules(&mut self, kind: ModuleKind) -> Result<Vec<String>> {
        let project = self.project()?;
        match kind {
            ModuleKind::Project => project.project_modules(),
            ModuleKind::Test => project.test_modules(),
            ModuleKind::Extra => project.extra_modules(),
            ModuleKind::All => project.all_modules(),
        }
    }

    fn subject(&mut self, files: &[String]) -> Result<Vec<String>> {
        if !files.is_empty() {
            return Ok(files.to_vec());
        }
        self.project()?.args_or_all_modules(files)
    }

    fn project(&mut self) -> Result<&Project> {
        let project = match self.project.take() {
            Some(project) => project,
            None => {
                let project = Project::discover(&self.start)?;
                debug!(config = %project.config_path().display(), "loaded project");
                project
            }
        };
        Ok(self.project.insert(project))
    }

    /// Settings of the loaded project, or defaults when none was needed.
    fn run_options(&self) -> RunOptions {
        let defaults = RunnerSettings::default();
        let settings = self
            .project
            .as_ref()
            .map_or(&defaults, Project::settings);
        RunOptions {
            timeout: settings.timeout(),
            output_limit_bytes: settings.output_limit_bytes,
            echo: self.echo,
        }
    }

    fn execute(&self, invocation: &Invocation) -> Result<ToolResult> {
        debug!(command = %invocation, "running tool");
        self.runner.run(invocation, &self.run_options())
    }

    fn execute_all(&self, invocations: &[Invocation]) -> Result<Vec<ToolResult>> {
        invocations
            .iter()
            .map(|invocation| self.execute(invocation))
            .collect()
    }
}

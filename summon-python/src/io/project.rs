//! Module resolution for a discovered project file.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use toml::Table;
use tracing::debug;

use super::config::RunnerSettings;
use super::discover::find_config_file;
use crate::core::settings;
use crate::error::ProjectError;

/// A parsed project file and the directory it lives in.
///
/// Relative paths in the file (package globs, extra and test modules) are
/// resolved against [`Project::root`], so commands behave the same from any
/// subdirectory.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config_path: PathBuf,
    table: Table,
    settings: RunnerSettings,
}

impl Project {
    /// Find the project file above `start` and load it.
    pub fn discover(start: &Path) -> Result<Self> {
        let config_path = find_config_file(start)?;
        Self::load(&config_path)
    }

    /// Load a specific project file.
    pub fn load(config_path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(config_path)
            .with_context(|| format!("read {}", config_path.display()))?;
        let table: Table = toml::from_str(&contents)
            .with_context(|| format!("parse {}", config_path.display()))?;
        let root = config_path
            .parent()
            .with_context(|| format!("config path missing parent {}", config_path.display()))?;
        Self::from_table(root, config_path, table)
    }

    pub fn from_table(root: &Path, config_path: &Path, table: Table) -> Result<Self> {
        let settings = RunnerSettings::from_table(&table)
            .with_context(|| format!("load settings from {}", config_path.display()))?;
        Ok(Self {
            root: root.to_path_buf(),
            config_path: config_path.to_path_buf(),
            table,
            settings,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    /// Existing paths matched by the package patterns, in pattern order.
    ///
    /// `None` when the file names no packages at all. A pattern matching
    /// nothing contributes nothing.
    pub fn package_paths(&self) -> Result<Option<Vec<PathBuf>>> {
        let Some(patterns) = settings::package_patterns(&self.table)? else {
            return Ok(None);
        };
        let root = self
            .root
            .to_str()
            .ok_or_else(|| anyhow!("project root is not valid UTF-8: {}", self.root.display()))?;
        let base = PathBuf::from(glob::Pattern::escape(root));

        let mut paths = Vec::new();
        for pattern in patterns {
            let full = base.join(&pattern);
            let full = full
                .to_str()
                .ok_or_else(|| anyhow!("glob pattern is not valid UTF-8: {}", full.display()))?;
            let matches = glob::glob(full).with_context(|| format!("invalid glob {pattern}"))?;
            let before = paths.len();
            paths.extend(matches.filter_map(Result::ok));
            debug!(pattern = %pattern, matched = paths.len() - before, "expanded package pattern");
        }
        Ok(Some(paths))
    }

    /// The project's package paths.
    pub fn project_modules(&self) -> Result<Vec<String>> {
        let paths = self.package_paths()?.ok_or_else(|| {
            ProjectError::ValueMissing("Failed to get package from config files.".to_string())
        })?;
        Ok(paths.iter().map(|p| p.display().to_string()).collect())
    }

    /// Configured `test-modules`, falling back to the project modules.
    pub fn test_modules(&self) -> Result<Vec<String>> {
        match settings::test_modules(&self.table) {
            Some(modules) => Ok(self.resolve_all(&modules)),
            None => self.project_modules(),
        }
    }

    /// Configured `extra-modules`.
    pub fn extra_modules(&self) -> Result<Vec<String>> {
        let modules = settings::extra_modules(&self.table)?;
        Ok(self.resolve_all(&modules))
    }

    /// Sorted, de-duplicated union of project, extra and test modules.
    pub fn all_modules(&self) -> Result<Vec<String>> {
        let mut all = BTreeSet::new();
        all.extend(self.project_modules()?);
        all.extend(self.extra_modules()?);
        all.extend(self.test_modules()?);
        Ok(all.into_iter().collect())
    }

    /// `args` verbatim when non-empty, otherwise [`Project::all_modules`].
    pub fn args_or_all_modules(&self, args: &[String]) -> Result<Vec<String>> {
        if !args.is_empty() {
            return Ok(args.to_vec());
        }
        self.all_modules()
    }

    fn resolve_all(&self, modules: &[String]) -> Vec<String> {
        modules
            .iter()
            .map(|module| self.root.join(module).display().to_string())
            .collect()
    }
}

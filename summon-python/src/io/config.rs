//! Tool-dispatch settings stored in `[tool.summon.plugins.python]`.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use toml::Table;

use crate::core::settings::{PLUGIN_TABLE, read_toml_variable};

/// Settings that shape how external tools are run.
///
/// Shares the plugin table with the module keys (`extra-modules`,
/// `test-modules`), which are read separately and ignored here. Missing
/// fields default to values suited to interactive use.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct RunnerSettings {
    /// Kill a tool after this many seconds. Unset means wait indefinitely.
    pub timeout_secs: Option<u64>,

    /// Keep at most this many bytes of each tool's stdout and stderr in the results.
    pub output_limit_bytes: usize,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl RunnerSettings {
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == Some(0) {
            return Err(anyhow!("timeout-secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output-limit-bytes must be > 0"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Read settings from a parsed project file.
    ///
    /// If the plugin table is missing, returns `RunnerSettings::default()`.
    pub fn from_table(table: &Table) -> Result<Self> {
        let settings = match read_toml_variable(table, &PLUGIN_TABLE) {
            None => Self::default(),
            Some(value) => value
                .clone()
                .try_into()
                .with_context(|| format!("parse [{}]", PLUGIN_TABLE.join(".")))?,
        };
        settings.validate()?;
        Ok(settings)
    }
}

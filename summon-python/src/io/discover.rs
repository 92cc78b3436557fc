//! Locating the project file by walking up from the working directory.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ProjectError;

/// Config file names, in precedence order.
pub const CONFIG_CANDIDATES: [&str; 2] = ["summon.toml", "pyproject.toml"];

/// Look for `file_name` in `start`, then in each of its ancestors.
///
/// `start` should be absolute; a relative path stops at its first component.
pub fn reverse_directory_search(file_name: &str, start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(file_name))
        .find(|candidate| candidate.is_file())
}

/// Find the project file for `start`.
///
/// Candidates are tried one at a time, each with a full upward search, so a
/// `summon.toml` in an ancestor beats a `pyproject.toml` next to `start`.
pub fn find_config_file(start: &Path) -> Result<PathBuf, ProjectError> {
    for candidate in CONFIG_CANDIDATES {
        if let Some(path) = reverse_directory_search(candidate, start) {
            debug!(path = %path.display(), "found config file");
            return Ok(path);
        }
    }
    Err(ProjectError::ConfigMissing {
        candidates: CONFIG_CANDIDATES.iter().map(ToString::to_string).collect(),
    })
}

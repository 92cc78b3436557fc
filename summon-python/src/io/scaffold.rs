//! Default configuration files for a Python project (`summon-python setup`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use minijinja::{AutoEscape, Environment, context};
use toml_edit::{DocumentMut, InlineTable, Item, Table, TableLike};
use tracing::{debug, warn};

use super::discover::reverse_directory_search;

const CI_WORKFLOW_TEMPLATE: &str = include_str!("templates/ci_workflow.yml.j2");
const PRE_COMMIT_TEMPLATE: &str = include_str!("templates/pre_commit_config.yaml.j2");

/// Name the generated files use to invoke this tool.
pub const COMMAND_NAME: &str = "summon-python";

/// Python versions in the CI matrix when none are requested.
pub const DEFAULT_PYTHON_VERSIONS: [&str; 1] = ["3.10"];

/// CI step that installs this tool when no other command is given.
pub const DEFAULT_INSTALL_COMMAND: &str = "cargo install --locked summon-python";

/// Options for [`setup_project`].
#[derive(Debug, Clone)]
pub struct SetupOptions {
    /// Overwrite scaffold files that already exist.
    pub force: bool,
    /// Python versions for the CI test matrix.
    pub python_versions: Vec<String>,
    /// Shell command the CI jobs run to install this tool.
    pub install_command: String,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            force: false,
            python_versions: DEFAULT_PYTHON_VERSIONS.map(String::from).to_vec(),
            install_command: DEFAULT_INSTALL_COMMAND.to_string(),
        }
    }
}

/// Canonical scaffold paths for a project root.
#[derive(Debug, Clone)]
pub struct ScaffoldPaths {
    pub root: PathBuf,
    pub pyproject_path: PathBuf,
    pub workflow_path: PathBuf,
    pub pre_commit_path: PathBuf,
}

impl ScaffoldPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            pyproject_path: root.join("pyproject.toml"),
            workflow_path: root.join(".github").join("workflows").join("summon.yml"),
            pre_commit_path: root.join(".pre-commit-config.yaml"),
            root,
        }
    }
}

/// What `setup_project` did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupReport {
    pub written: Vec<PathBuf>,
    /// Existing files left alone because `force` was not set.
    pub skipped: Vec<PathBuf>,
    /// The `pyproject.toml` that received the mypy settings.
    pub mypy_configured: PathBuf,
}

/// Scaffold CI, pre-commit and mypy configuration next to the nearest `pyproject.toml`.
pub fn setup_project(start: &Path, options: &SetupOptions) -> Result<SetupReport> {
    let found = reverse_directory_search("pyproject.toml", start);
    setup_found_project(found.as_deref(), options)
}

fn setup_found_project(pyproject_path: Option<&Path>, options: &SetupOptions) -> Result<SetupReport> {
    let pyproject_path =
        pyproject_path.ok_or_else(|| anyhow!("Could not find a pyproject.toml file. Aborting."))?;
    let root = pyproject_path
        .parent()
        .with_context(|| format!("pyproject path missing parent {}", pyproject_path.display()))?;
    let paths = ScaffoldPaths::new(root);
    debug!(root = %paths.root.display(), "setting up project");

    if options.python_versions.is_empty() {
        bail!("at least one python version is required for the CI matrix");
    }
    if options.install_command.trim().is_empty() {
        bail!("the CI install command must not be empty");
    }

    let templates = Templates::new()?;
    let mut report = SetupReport {
        mypy_configured: paths.pyproject_path.clone(),
        ..SetupReport::default()
    };

    let workflow =
        templates.render_ci_workflow(&options.python_versions, &options.install_command)?;
    write_scaffold(&paths.workflow_path, &workflow, options.force, &mut report)?;
    let pre_commit = templates.render_pre_commit()?;
    write_scaffold(&paths.pre_commit_path, &pre_commit, options.force, &mut report)?;

    setup_mypy_config(&paths.pyproject_path)?;
    Ok(report)
}

/// Enable `tool.mypy.strict`, keeping the rest of the file as written.
pub fn setup_mypy_config(pyproject_path: &Path) -> Result<()> {
    let contents = fs::read_to_string(pyproject_path)
        .with_context(|| format!("read {}", pyproject_path.display()))?;
    let mut document: DocumentMut = contents
        .parse()
        .with_context(|| format!("parse {}", pyproject_path.display()))?;
    set_property(&mut document, "tool.mypy.strict", toml_edit::value(true))?;
    fs::write(pyproject_path, document.to_string())
        .with_context(|| format!("write {}", pyproject_path.display()))
}

/// Set a dotted `key`, creating intermediate tables as needed.
///
/// Descends through standard and inline tables alike. Tables created under
/// an inline table are inline too.
fn set_property(document: &mut DocumentMut, key: &str, value: Item) -> Result<()> {
    let mut parts: Vec<&str> = key.split('.').collect();
    let last = parts.pop().ok_or_else(|| anyhow!("empty key"))?;

    let mut table: &mut dyn TableLike = document.as_table_mut();
    let mut inline = false;
    for part in parts {
        let created = if inline {
            Item::Value(InlineTable::new().into())
        } else {
            let mut created = Table::new();
            created.set_implicit(true);
            Item::Table(created)
        };
        let item = table.entry(part).or_insert(created);
        inline = item.is_inline_table();
        table = item
            .as_table_like_mut()
            .with_context(|| format!("`{part}` in `{key}` is not a table"))?;
    }
    table.insert(last, value);
    Ok(())
}

fn write_scaffold(path: &Path, contents: &str, force: bool, report: &mut SetupReport) -> Result<()> {
    if path.exists() && !force {
        warn!(path = %path.display(), "file exists, skipping (use --force to overwrite)");
        report.skipped.push(path.to_path_buf());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("write file {}", path.display()))?;
    report.written.push(path.to_path_buf());
    Ok(())
}

/// Template engine wrapper around minijinja.
struct Templates {
    env: Environment<'static>,
}

impl Templates {
    fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_template("ci_workflow", CI_WORKFLOW_TEMPLATE)
            .context("load CI workflow template")?;
        env.add_template("pre_commit", PRE_COMMIT_TEMPLATE)
            .context("load pre-commit template")?;
        Ok(Self { env })
    }

    fn render_ci_workflow(&self, python_versions: &[String], install_command: &str) -> Result<String> {
        let template = self.env.get_template("ci_workflow")?;
        let rendered = template.render(context! {
            command => COMMAND_NAME,
            install_command => install_command,
            python_versions => python_versions,
            matrix_os => "${{ matrix.os }}",
            matrix_python => "${{ matrix.python }}",
        })?;
        Ok(rendered)
    }

    fn render_pre_commit(&self) -> Result<String> {
        let template = self.env.get_template("pre_commit")?;
        Ok(template.render(context! { command => COMMAND_NAME })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::read_toml_variable;
    use toml::Value;

    const PYPROJECT: &str = "# project file\n[tool.poetry]\nname = \"demo\" # keep me\n";

    fn project() -> tempfile::TempDir {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("pyproject.toml"), PYPROJECT).expect("write pyproject");
        temp
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).expect("read file")
    }

    fn mypy_value<'a>(parsed: &'a toml::Table, key: &str) -> Option<&'a Value> {
        read_toml_variable(parsed, &["tool", "mypy", key])
    }

    #[test]
    fn setup_writes_all_scaffold_files() {
        let temp = project();
        let report = setup_project(temp.path(), &SetupOptions::default()).expect("setup");
        let paths = ScaffoldPaths::new(temp.path());

        assert_eq!(
            report.written,
            vec![paths.workflow_path.clone(), paths.pre_commit_path.clone()]
        );
        assert!(report.skipped.is_empty());

        let workflow = read(&paths.workflow_path);
        assert!(workflow.contains("python: ['3.10']"));
        assert!(workflow.contains("runs-on: ${{ matrix.os }}"));
        assert!(workflow.contains("poetry run summon-python static-checks"));
        assert!(workflow.contains("poetry run summon-python test --coverage"));
        let installs: Vec<&str> = workflow
            .lines()
            .filter(|line| line.trim_start().starts_with("run: cargo install"))
            .collect();
        assert_eq!(installs.len(), 2);
        assert!(
            installs
                .iter()
                .all(|line| line.trim() == "run: cargo install --locked summon-python")
        );
        assert!(workflow.ends_with("fail_ci_if_error: false\n"));

        let pre_commit = read(&paths.pre_commit_path);
        assert!(pre_commit.contains("entry: poetry run summon-python lint --no-full-report"));
        assert!(pre_commit.contains("entry: poetry run summon-python format\n"));
    }

    #[test]
    fn setup_from_subdirectory_targets_pyproject_directory() {
        let temp = project();
        let nested = temp.path().join("src").join("demo");
        fs::create_dir_all(&nested).expect("mkdir");

        setup_project(&nested, &SetupOptions::default()).expect("setup");
        assert!(temp.path().join(".pre-commit-config.yaml").is_file());
        assert!(!nested.join(".pre-commit-config.yaml").exists());
    }

    #[test]
    fn python_matrix_lists_every_version() {
        let temp = project();
        let options = SetupOptions {
            python_versions: vec!["3.11".to_string(), "3.12".to_string()],
            ..SetupOptions::default()
        };
        setup_project(temp.path(), &options).expect("setup");
        let workflow = read(&ScaffoldPaths::new(temp.path()).workflow_path);
        assert!(workflow.contains("python: ['3.11', '3.12']"));
    }

    #[test]
    fn existing_files_kept_without_force() {
        let temp = project();
        let paths = ScaffoldPaths::new(temp.path());
        fs::write(&paths.pre_commit_path, "custom").expect("write custom");

        let report = setup_project(temp.path(), &SetupOptions::default()).expect("setup");
        assert_eq!(report.skipped, vec![paths.pre_commit_path.clone()]);
        assert_eq!(read(&paths.pre_commit_path), "custom");

        let forced = SetupOptions {
            force: true,
            ..SetupOptions::default()
        };
        setup_project(temp.path(), &forced).expect("setup");
        assert_ne!(read(&paths.pre_commit_path), "custom");
    }

    #[test]
    fn mypy_strict_added_preserving_comments() {
        let temp = project();
        setup_project(temp.path(), &SetupOptions::default()).expect("setup");

        let pyproject = read(&temp.path().join("pyproject.toml"));
        assert!(pyproject.starts_with(PYPROJECT));
        assert!(pyproject.contains("[tool.mypy]\nstrict = true\n"));
        assert!(!pyproject.contains("[tool]\n"));

        let parsed: toml::Table = pyproject.parse().expect("valid toml");
        assert_eq!(mypy_value(&parsed, "strict").and_then(Value::as_bool), Some(true));
    }

    #[test]
    fn mypy_setup_is_idempotent_and_keeps_other_keys() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("pyproject.toml");
        fs::write(&path, "[tool.mypy]\nstrict = false\nplugins = [\"x\"]\n").expect("write");

        setup_mypy_config(&path).expect("first");
        setup_mypy_config(&path).expect("second");

        let parsed: toml::Table = read(&path).parse().expect("valid toml");
        assert_eq!(mypy_value(&parsed, "strict").and_then(Value::as_bool), Some(true));
        assert!(mypy_value(&parsed, "plugins").is_some_and(Value::is_array));
    }

    #[test]
    fn mypy_setup_rejects_non_table_tool() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("pyproject.toml");
        fs::write(&path, "tool = 3\n").expect("write");

        let err = setup_mypy_config(&path).unwrap_err();
        assert!(err.to_string().contains("`tool`"));
    }

    #[test]
    fn custom_install_command_reaches_every_job() {
        let temp = project();
        let options = SetupOptions {
            install_command: "pipx install my-summon-wrapper".to_string(),
            ..SetupOptions::default()
        };
        setup_project(temp.path(), &options).expect("setup");

        let workflow = read(&ScaffoldPaths::new(temp.path()).workflow_path);
        assert_eq!(workflow.matches("run: pipx install my-summon-wrapper\n").count(), 2);
        assert!(!workflow.contains("cargo install"));
    }

    #[test]
    fn blank_install_command_is_rejected() {
        let temp = project();
        let options = SetupOptions {
            install_command: "  ".to_string(),
            ..SetupOptions::default()
        };
        assert!(setup_project(temp.path(), &options).is_err());
    }

    #[test]
    fn mypy_strict_added_inside_inline_tool_table() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("pyproject.toml");
        fs::write(&path, "tool = { poetry = { name = \"x\" } }\n").expect("write");

        setup_mypy_config(&path).expect("setup mypy");

        let parsed: toml::Table = read(&path).parse().expect("valid toml");
        assert_eq!(mypy_value(&parsed, "strict").and_then(Value::as_bool), Some(true));
        assert_eq!(
            read_toml_variable(&parsed, &["tool", "poetry", "name"]).and_then(Value::as_str),
            Some("x")
        );
    }

    #[test]
    fn setup_without_pyproject_fails() {
        let err = setup_found_project(None, &SetupOptions::default()).unwrap_err();
        assert_eq!(err.to_string(), "Could not find a pyproject.toml file. Aborting.");
    }
}

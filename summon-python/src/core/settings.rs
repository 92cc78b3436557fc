//! Extraction of module settings from a parsed project file.
//!
//! Two layouts are understood:
//!
//! - Poetry: `[tool.poetry]` `name` and `packages = [{ include, from }]`, with
//!   PEP 621 `[project] name` as a fallback for the package name.
//! - Plugin keys under `[tool.summon.plugins.python]`: `extra-modules` and
//!   `test-modules`.
//!
//! Functions here only produce relative glob patterns and strings; expanding
//! them against the filesystem happens in [`crate::io::project`].

use std::path::MAIN_SEPARATOR_STR;

use toml::{Table, Value};

use crate::error::ProjectError;

/// Table holding this tool's settings inside the project file.
pub const PLUGIN_TABLE: [&str; 4] = ["tool", "summon", "plugins", "python"];

const PACKAGE_NAME_KEYS: [&[&str]; 2] = [&["tool", "poetry", "name"], &["project", "name"]];
const POETRY_PACKAGES: [&str; 3] = ["tool", "poetry", "packages"];

/// Walk nested tables along `path`.
///
/// Returns `None` as soon as a key is missing or an intermediate value is not a table.
pub fn read_toml_variable<'a>(table: &'a Table, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut value = table.get(*first)?;
    for key in rest {
        value = value.as_table()?.get(*key)?;
    }
    Some(value)
}

/// `Some` only for an array whose every element is a string.
pub fn as_string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

/// Importable package name: poetry's `name`, else `[project] name`, dashes turned into underscores.
pub fn package_name(table: &Table) -> Result<Option<String>, ProjectError> {
    for path in PACKAGE_NAME_KEYS {
        match read_toml_variable(table, path) {
            None => {}
            Some(Value::String(name)) => return Ok(Some(name.replace('-', "_"))),
            Some(_) => {
                return Err(ProjectError::ValueType {
                    key: path.join("."),
                    expected: "a string",
                });
            }
        }
    }
    Ok(None)
}

/// Glob patterns, relative to the project root, that locate the project's packages.
///
/// A `tool.poetry.packages` array wins; each entry becomes `include` or
/// `from/include`. Without it the package name yields `<name>` and
/// `<name>.py`. `Ok(None)` when neither source exists.
pub fn package_patterns(table: &Table) -> Result<Option<Vec<String>>, ProjectError> {
    if let Some(Value::Array(entries)) = read_toml_variable(table, &POETRY_PACKAGES) {
        return entries
            .iter()
            .enumerate()
            .map(|(index, entry)| package_entry_pattern(index, entry))
            .collect::<Result<Vec<_>, _>>()
            .map(Some);
    }

    let Some(name) = package_name(table)? else {
        return Ok(None);
    };
    let name = glob::Pattern::escape(&name);
    Ok(Some(vec![name.clone(), format!("{name}.py")]))
}

fn package_entry_pattern(index: usize, entry: &Value) -> Result<String, ProjectError> {
    let key = format!("{}[{index}]", POETRY_PACKAGES.join("."));
    let entry = entry.as_table().ok_or_else(|| ProjectError::ValueType {
        key: key.clone(),
        expected: "a table",
    })?;

    let include = match entry.get("include") {
        Some(Value::String(include)) => include,
        Some(_) => {
            return Err(ProjectError::ValueType {
                key: format!("{key}.include"),
                expected: "a string",
            });
        }
        None => {
            return Err(ProjectError::ValueMissing(format!(
                "`{key}` has no `include` pattern"
            )));
        }
    };

    match entry.get("from") {
        None => Ok(include.clone()),
        Some(Value::String(from)) => Ok(format!("{from}{MAIN_SEPARATOR_STR}{include}")),
        Some(_) => Err(ProjectError::ValueType {
            key: format!("{key}.from"),
            expected: "a string",
        }),
    }
}

/// Helper modules to lint and format alongside the package.
///
/// Absent means none; any other shape than a list of strings is an error.
pub fn extra_modules(table: &Table) -> Result<Vec<String>, ProjectError> {
    let path = plugin_key("extra-modules");
    match read_toml_variable(table, &path) {
        None => Ok(Vec::new()),
        Some(value) => as_string_list(value).ok_or_else(|| ProjectError::ValueType {
            key: path.join("."),
            expected: "a list of strings",
        }),
    }
}

/// Explicitly configured test modules.
///
/// Unlike extras, a value of the wrong shape is ignored so that callers fall
/// back to the project modules.
pub fn test_modules(table: &Table) -> Option<Vec<String>> {
    read_toml_variable(table, &plugin_key("test-modules")).and_then(as_string_list)
}

fn plugin_key(key: &str) -> [&str; 5] {
    let [a, b, c, d] = PLUGIN_TABLE;
    [a, b, c, d, key]
}

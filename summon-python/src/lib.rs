//! Developer tasks for Python projects.
//!
//! Resolves which paths make up a Python project from its `summon.toml` or
//! `pyproject.toml` and dispatches the usual tools (pytest, coverage, mypy,
//! flake8, pylint, black, isort) against them. The crate keeps a strict split:
//!
//! - **[`core`]**: Pure logic (TOML extraction, command-line construction).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config discovery, globbing, child
//!   processes, scaffold files).
//!
//! [`tasks`] coordinates both to implement the CLI commands and [`report`]
//! turns their results into output and exit codes.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod report;
pub mod tasks;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

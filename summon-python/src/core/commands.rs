//! Command lines for the external tools.
//!
//! Each builder is a pure function of the module lists and flags, so the exact
//! argv handed to a tool can be asserted without spawning anything.

use std::fmt;

/// A program plus its arguments, run without a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

/// `pytest [--cov=a,b] <test modules>`.
///
/// `coverage_modules` is `Some` when coverage is requested; the modules are
/// passed as a single comma-joined `--cov` value.
pub fn pytest(coverage_modules: Option<&[String]>, test_modules: &[String]) -> Invocation {
    let coverage_flag = coverage_modules.map(|modules| format!("--cov={}", modules.join(",")));
    Invocation::new(
        "pytest",
        coverage_flag.into_iter().chain(test_modules.iter().cloned()),
    )
}

/// `coverage html`.
pub fn coverage_html() -> Invocation {
    Invocation::new("coverage", ["html"])
}

/// mypy, flake8 and pylint over `subject`, in that order.
pub fn linters(subject: &[String], full_report: bool) -> Vec<Invocation> {
    let report_flag = if full_report { "y" } else { "n" };
    vec![
        Invocation::new("mypy", subject.iter().cloned()),
        Invocation::new("flake8", subject.iter().cloned()),
        Invocation::new(
            "pylint",
            ["-r".to_string(), report_flag.to_string()]
                .into_iter()
                .chain(subject.iter().cloned()),
        ),
    ]
}

/// black and isort over `subject`, quiet, optionally in check-only mode.
pub fn formatters(subject: &[String], check: bool) -> Vec<Invocation> {
    let mut args = vec!["-q".to_string()];
    if check {
        args.push("--check".to_string());
    }
    args.extend(subject.iter().cloned());
    vec![
        Invocation::new("black", args.clone()),
        Invocation::new("isort", args),
    ]
}

//! Python project tasks: test, lint, format and scaffold.
//!
//! Modules are resolved from the nearest `summon.toml` or `pyproject.toml`
//! (see `summon-python modules`), then handed to pytest, coverage, mypy,
//! flake8, pylint, black and isort, one tool at a time.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use summon_python::core::types::{ModuleKind, ToolResult};
use summon_python::exit_codes;
use summon_python::io::process::ProcessRunner;
use summon_python::io::scaffold::{
    DEFAULT_INSTALL_COMMAND, DEFAULT_PYTHON_VERSIONS, SetupOptions, setup_project,
};
use summon_python::logging;
use summon_python::report;
use summon_python::tasks::Tasks;

#[derive(Parser)]
#[command(
    name = "summon-python",
    version,
    about = "Run tests, linters and formatters over a Python project"
)]
struct Cli {
    /// Print results as JSON instead of streaming tool output.
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging on stderr (`RUST_LOG` takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run tests with pytest.
    Test {
        /// Generate coverage information.
        #[arg(long)]
        coverage: bool,
        /// Generate an html coverage report (requires --coverage).
        #[arg(long)]
        html: bool,
    },
    /// Run all linters (mypy, flake8, pylint). Without files, everything is linted.
    Lint {
        files: Vec<String>,
        /// Print detailed pylint reports.
        #[arg(long, overrides_with = "no_full_report")]
        full_report: bool,
        #[arg(long, overrides_with = "full_report", hide = true)]
        no_full_report: bool,
    },
    /// Run all formatters (black, isort). Without files, everything is formatted.
    Format {
        files: Vec<String>,
        /// Only check instead of modifying.
        #[arg(long)]
        check: bool,
    },
    /// Generate an html coverage report.
    CoverageHtml,
    /// Run all static checks over all code.
    StaticChecks,
    /// Run all checks (static checks and tests) over all code.
    AllChecks,
    /// Print the resolved module paths.
    Modules {
        #[arg(value_enum, default_value_t = ModuleKind::All)]
        kind: ModuleKind,
    },
    /// Set up CI, pre-commit and strict mypy defaults for the project.
    Setup {
        /// Overwrite existing CI and pre-commit files.
        #[arg(short, long)]
        force: bool,
        /// Python version for the CI matrix (repeatable).
        #[arg(long = "python", value_name = "VERSION")]
        python_versions: Vec<String>,
        /// Command the CI jobs run to install summon-python.
        #[arg(long, value_name = "COMMAND", default_value = DEFAULT_INSTALL_COMMAND)]
        install_command: String,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let cwd = std::env::current_dir().context("resolve working directory")?;
    debug!(cwd = %cwd.display(), "starting");
    let mut tasks = Tasks::new(ProcessRunner, &cwd).echo(!cli.json);

    let results = match cli.command {
        Command::Test { coverage, html } => tasks.test(coverage, html)?,
        Command::Lint {
            files,
            full_report,
            no_full_report,
        } => tasks.lint(&files, full_report && !no_full_report)?,
        Command::Format { files, check } => tasks.format(&files, check)?,
        Command::CoverageHtml => vec![tasks.coverage_html()?],
        Command::StaticChecks => tasks.static_checks()?,
        Command::AllChecks => tasks.all_checks()?,
        Command::Modules { kind } => {
            let modules = tasks.modules(kind)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&modules)?);
            } else {
                for module in modules {
                    println!("{module}");
                }
            }
            return Ok(exit_codes::OK);
        }
        Command::Setup {
            force,
            python_versions,
            install_command,
        } => {
            let python_versions = if python_versions.is_empty() {
                DEFAULT_PYTHON_VERSIONS.map(String::from).to_vec()
            } else {
                python_versions
            };
            let setup = setup_project(
                &cwd,
                &SetupOptions {
                    force,
                    python_versions,
                    install_command,
                },
            )?;
            for path in &setup.written {
                println!("wrote {}", path.display());
            }
            for path in &setup.skipped {
                println!("skipped {} (exists, use --force to overwrite)", path.display());
            }
            println!("configured mypy in {}", setup.mypy_configured.display());
            return Ok(exit_codes::OK);
        }
    };

    print_results(&results, cli.json)?;
    Ok(report::exit_code(&results))
}

fn print_results(results: &[ToolResult], json: bool) -> Result<()> {
    if json {
        println!("{}", report::render_json(results)?);
    } else if !results.is_empty() {
        print!("{}", report::render_summary(results));
    }
    Ok(())
}

//! CLI tests for `summon-python setup`.

use std::fs;
use std::process::Command;

use summon_python::exit_codes;
use summon_python::io::scaffold::ScaffoldPaths;
use summon_python::test_support::TestProject;

fn setup(project: &TestProject, extra: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_summon-python"))
        .current_dir(project.path())
        .arg("setup")
        .args(extra)
        .output()
        .expect("run summon-python setup")
}

#[test]
fn setup_scaffolds_project() {
    let project = TestProject::new("[tool.poetry]\nname = \"demo\"\n").expect("project");

    let output = setup(
        &project,
        &[
            "--python",
            "3.12",
            "--install-command",
            "cargo install --locked --path tools/summon-python",
        ],
    );
    assert_eq!(output.status.code(), Some(exit_codes::OK));

    let paths = ScaffoldPaths::new(project.path());
    let workflow = fs::read_to_string(&paths.workflow_path).expect("workflow");
    assert!(workflow.contains("python: ['3.12']"));
    assert_eq!(
        workflow
            .matches("run: cargo install --locked --path tools/summon-python\n")
            .count(),
        2
    );
    assert!(paths.pre_commit_path.is_file());

    let pyproject = fs::read_to_string(&paths.pyproject_path).expect("pyproject");
    assert!(pyproject.contains("strict = true"));
}

#[test]
fn second_setup_skips_unless_forced() {
    let project = TestProject::new("[tool.poetry]\nname = \"demo\"\n").expect("project");
    let paths = ScaffoldPaths::new(project.path());

    assert_eq!(setup(&project, &[]).status.code(), Some(exit_codes::OK));
    fs::write(&paths.workflow_path, "# mine\n").expect("customize");

    let output = setup(&project, &[]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&output.stdout).contains("skipped"));
    assert_eq!(
        fs::read_to_string(&paths.workflow_path).expect("workflow"),
        "# mine\n"
    );

    assert_eq!(setup(&project, &["--force"]).status.code(), Some(exit_codes::OK));
    assert_ne!(
        fs::read_to_string(&paths.workflow_path).expect("workflow"),
        "# mine\n"
    );
}

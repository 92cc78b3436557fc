//! Running external tools with optional timeouts and bounded output capture.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::core::commands::Invocation;
use crate::core::types::{ToolOutcome, ToolResult};

/// How long reader threads may keep draining pipes after a timeout kill.
const DRAIN_AFTER_KILL: Duration = Duration::from_millis(500);

/// Bytes kept from one stream, and bytes dropped past the limit.
type StreamOutput = Result<(Vec<u8>, usize)>;

/// How a single invocation is run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Kill the tool after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Bytes of stdout and of stderr kept in the result.
    pub output_limit_bytes: usize,
    /// Stream the tool's output to our own stdout/stderr while it runs.
    pub echo: bool,
}

/// Executes tool invocations.
pub trait ToolRunner {
    fn run(&self, invocation: &Invocation, options: &RunOptions) -> Result<ToolResult>;
}

/// Runs invocations as child processes of the current working directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    #[instrument(skip_all, fields(program = %invocation.program))]
    fn run(&self, invocation: &Invocation, options: &RunOptions) -> Result<ToolResult> {
        let Some(program) = resolve_program(&invocation.program) else {
            warn!("program not found on PATH");
            if options.echo {
                eprintln!("summon-python: `{}` not found on PATH", invocation.program);
            }
            return Ok(ToolResult::without_output(
                invocation.argv(),
                ToolOutcome::Missing,
            ));
        };

        if options.echo {
            eprintln!("$ {invocation}");
        }
        let mut cmd = Command::new(program);
        cmd.args(&invocation.args);
        let child = match spawn(cmd, options) {
            Ok(child) => child,
            Err(err) => {
                error!(err = %err, "failed to spawn command");
                if options.echo {
                    eprintln!("summon-python: could not start `{}`: {err}", invocation.program);
                }
                let mut result =
                    ToolResult::without_output(invocation.argv(), ToolOutcome::SpawnFailed);
                result.stderr = err.to_string();
                return Ok(result);
            }
        };
        let output = wait_for_output(child, options)?;

        let outcome = if output.timed_out {
            ToolOutcome::TimedOut
        } else if output.success {
            ToolOutcome::Passed
        } else {
            ToolOutcome::Failed { code: output.code }
        };
        Ok(ToolResult {
            command: invocation.argv(),
            outcome,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            truncated_bytes: output.stdout_truncated + output.stderr_truncated,
        })
    }
}

fn resolve_program(program: &str) -> Option<PathBuf> {
    match which::which(program) {
        Ok(path) => Some(path),
        Err(err) => {
            debug!(err = %err, program, "which lookup failed");
            None
        }
    }
}

/// Captured child process output.
#[derive(Debug)]
struct CommandOutput {
    success: bool,
    code: Option<i32>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    stdout_truncated: usize,
    stderr_truncated: usize,
    timed_out: bool,
}

/// Spawn `cmd` with piped output and no stdin.
///
/// With a timeout the child leads its own process group, so a kill also
/// reaches anything it forked. Without one it stays in ours and receives
/// Ctrl-C from the terminal.
fn spawn(mut cmd: Command, options: &RunOptions) -> std::io::Result<Child> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if options.timeout.is_some() {
        lead_process_group(&mut cmd);
    }
    debug!("spawning child process");
    cmd.spawn()
}

/// Wait for a spawned child and capture stdout/stderr without risking pipe deadlocks.
///
/// Both streams are drained on their own threads while the child runs, and
/// optionally tee'd line by line to this process's stdout/stderr. After a
/// timeout kill, readers still blocked past [`DRAIN_AFTER_KILL`] are
/// abandoned along with their output.
fn wait_for_output(mut child: Child, options: &RunOptions) -> Result<CommandOutput> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let limit = options.output_limit_bytes;
    let (stdout_sink, stderr_sink): (Option<Box<dyn Write + Send>>, Option<Box<dyn Write + Send>>) =
        if options.echo {
            (
                Some(Box::new(std::io::stdout())),
                Some(Box::new(std::io::stderr())),
            )
        } else {
            (None, None)
        };
    let stdout_rx = spawn_reader(stdout, limit, stdout_sink);
    let stderr_rx = spawn_reader(stderr, limit, stderr_sink);

    let mut timed_out = false;
    let status = match options.timeout {
        Some(timeout) => match child.wait_timeout(timeout).context("wait for command")? {
            Some(status) => status,
            None => {
                warn!(
                    timeout_secs = timeout.as_secs_f64(),
                    "command timed out, killing"
                );
                timed_out = true;
                kill_process_tree(&mut child).context("kill command")?;
                child.wait().context("wait command after kill")?
            }
        },
        None => child.wait().context("wait for command")?,
    };

    let drain = timed_out.then_some(DRAIN_AFTER_KILL);
    let (stdout, stdout_truncated) = collect_output(&stdout_rx, drain).context("join stdout")?;
    let (stderr, stderr_truncated) = collect_output(&stderr_rx, drain).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        success: status.success(),
        code: status.code(),
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

#[cfg(unix)]
fn lead_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn lead_process_group(_cmd: &mut Command) {}

/// Kill the child's whole process group, falling back to the child alone.
#[cfg(unix)]
#[allow(unsafe_code)]
fn kill_process_tree(child: &mut Child) -> std::io::Result<()> {
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: killpg only reads its two integer arguments.
        if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
            return Ok(());
        }
        debug!(err = %std::io::Error::last_os_error(), "killpg failed, killing child only");
    }
    child.kill()
}

#[cfg(not(unix))]
fn kill_process_tree(child: &mut Child) -> std::io::Result<()> {
    child.kill()
}

fn spawn_reader<R: Read + Send + 'static>(
    reader: R,
    limit: usize,
    sink: Option<Box<dyn Write + Send>>,
) -> Receiver<StreamOutput> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver is gone when the reader was abandoned after a kill.
        tx.send(read_stream_limited(reader, limit, sink)).ok();
    });
    rx
}

/// Output of one reader thread; waits at most `drain` when given.
fn collect_output(rx: &Receiver<StreamOutput>, drain: Option<Duration>) -> StreamOutput {
    let Some(drain) = drain else {
        return rx
            .recv()
            .map_err(|_| anyhow!("output reader thread panicked"))?;
    };
    match rx.recv_timeout(drain) {
        Ok(output) => output,
        Err(RecvTimeoutError::Timeout) => {
            warn!("output still open after kill, abandoning reader");
            Ok((Vec::new(), 0))
        }
        Err(RecvTimeoutError::Disconnected) => Err(anyhow!("output reader thread panicked")),
    }
}

/// Read a stream line by line, keeping at most `limit` bytes and tee-ing every line to `sink`.
fn read_stream_limited<R: Read>(
    reader: R,
    limit: usize,
    mut sink: Option<Box<dyn Write + Send>>,
) -> Result<(Vec<u8>, usize)> {
    let mut buf_reader = BufReader::new(reader);
    let mut collected = Vec::new();
    let mut truncated = 0usize;

    loop {
        let mut line = Vec::new();
        let n = buf_reader
            .read_until(b'\n', &mut line)
            .context("read line")?;
        if n == 0 {
            break;
        }

        if let Some(writer) = sink.as_mut()
            && let Err(e) = writer.write_all(&line).and_then(|()| writer.flush())
        {
            warn!(err = %e, "failed to echo tool output");
            sink = None;
        }

        let remaining = limit.saturating_sub(collected.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            collected.extend_from_slice(&line[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((collected, truncated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet(timeout: Option<Duration>, limit: usize) -> RunOptions {
        RunOptions {
            timeout,
            output_limit_bytes: limit,
            echo: false,
        }
    }

    #[test]
    fn missing_program_is_reported_not_raised() {
        let invocation = Invocation::new("summon-python-no-such-tool", ["--version"]);
        let result = ProcessRunner
            .run(&invocation, &quiet(None, 1024))
            .expect("run");
        assert_eq!(result.outcome, ToolOutcome::Missing);
        assert_eq!(
            result.command,
            vec!["summon-python-no-such-tool", "--version"]
        );
    }

    #[test]
    fn read_stream_limited_counts_truncated_bytes() {
        let input: &[u8] = b"first line\nsecond line\n";
        let (kept, truncated) = read_stream_limited(input, 5, None).expect("read");
        assert_eq!(kept, b"first");
        assert_eq!(truncated, input.len() - 5);
    }

    #[cfg(unix)]
    #[test]
    fn captures_exit_code_and_output() {
        let invocation = Invocation::new("sh", ["-c", "echo out; echo err >&2; exit 3"]);
        let result = ProcessRunner
            .run(&invocation, &quiet(None, 1024))
            .expect("run");
        assert_eq!(result.outcome, ToolOutcome::Failed { code: Some(3) });
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
        assert_eq!(result.truncated_bytes, 0);
    }

    #[cfg(unix)]
    #[test]
    fn successful_command_passes() {
        let invocation = Invocation::new("sh", ["-c", "true"]);
        let result = ProcessRunner
            .run(&invocation, &quiet(Some(Duration::from_secs(30)), 1024))
            .expect("run");
        assert!(result.succeeded());
    }

    #[cfg(unix)]
    #[test]
    fn slow_command_times_out() {
        let invocation = Invocation::new("sleep", ["5"]);
        let result = ProcessRunner
            .run(&invocation, &quiet(Some(Duration::from_millis(100)), 1024))
            .expect("run");
        assert_eq!(result.outcome, ToolOutcome::TimedOut);
    }

    #[cfg(unix)]
    #[test]
    fn timeout_returns_promptly_when_tool_forks() {
        // `sh` forks `sleep`, which inherits the output pipes.
        let invocation = Invocation::new("sh", ["-c", "sleep 5; true"]);
        let started = std::time::Instant::now();
        let result = ProcessRunner
            .run(&invocation, &quiet(Some(Duration::from_millis(200)), 1024))
            .expect("run");
        let elapsed = started.elapsed();

        assert_eq!(result.outcome, ToolOutcome::TimedOut);
        assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
    }

    #[cfg(unix)]
    #[test]
    fn output_past_limit_is_counted_as_truncated() {
        let invocation = Invocation::new("sh", ["-c", "printf 0123456789; printf abcdef >&2"]);
        let result = ProcessRunner
            .run(&invocation, &quiet(None, 4))
            .expect("run");
        assert!(result.succeeded());
        assert_eq!(result.stdout, "0123");
        assert_eq!(result.stderr, "abcd");
        assert_eq!(result.truncated_bytes, 6 + 2);
    }

    #[cfg(unix)]
    #[test]
    fn unstartable_program_is_reported_not_raised() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir");
        let script = temp.path().join("flake8");
        std::fs::write(&script, "#!/nonexistent/python\n").expect("write script");
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .expect("chmod");

        let program = script.display().to_string();
        let invocation = Invocation::new(program.as_str(), ["x.py"]);
        let result = ProcessRunner
            .run(&invocation, &quiet(None, 1024))
            .expect("run");
        assert_eq!(result.outcome, ToolOutcome::SpawnFailed);
        assert!(!result.stderr.is_empty());
        assert_eq!(result.command, vec![program, "x.py".to_string()]);
    }
}

//! Process execution with captured output and timeouts.

use std::collections::HashMap;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use super::platform::{shell_executable, shell_flag};

/// Interval between exit checks while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long to wait for output pipes to close after a timeout kill.
const KILL_GRACE: Duration = Duration::from_secs(1);

/// Result of executing a command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether command succeeded (exit code 0).
    pub success: bool,

    /// Whether the command was killed for exceeding its timeout.
    pub timed_out: bool,
}

/// Options for command execution.
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    /// Working directory.
    pub cwd: Option<PathBuf>,

    /// Environment variables (merged with system env).
    pub env: HashMap<String, String>,

    /// Wall-clock limit (None = wait forever).
    pub timeout: Option<Duration>,
}

/// Run `line` through the system shell.
pub fn execute_shell(line: &str, options: &CommandOptions) -> io::Result<CommandResult> {
    let mut cmd = Command::new(shell_executable());
    cmd.arg(shell_flag()).arg(line);
    run_captured(cmd, options)
}

/// Run `argv[0]` directly with the remaining elements as arguments.
pub fn execute_argv(argv: &[String], options: &CommandOptions) -> io::Result<CommandResult> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty argument list"))?;

    let mut cmd = Command::new(program);
    cmd.args(args);
    run_captured(cmd, options)
}

fn run_captured(mut cmd: Command, options: &CommandOptions) -> io::Result<CommandResult> {
    let start = Instant::now();

    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }

    for (key, value) in &options.env {
        cmd.env(key, value);
    }

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    // Own process group, so a timeout can take down everything the step spawned
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let mut child = cmd.spawn()?;

    let (tx, rx) = mpsc::channel();
    let pending = drain(child.stdout.take(), Stream::Stdout, &tx)
        + drain(child.stderr.take(), Stream::Stderr, &tx);
    drop(tx);

    let deadline = options.timeout.map(|limit| start + limit);
    let (status, killed) = match deadline {
        Some(deadline) => wait_with_deadline(&mut child, deadline)?,
        None => (child.wait()?, false),
    };

    // Pipes stay open while anything the step backgrounded is alive
    let output = collect_output(&mut child, &rx, pending, deadline, killed);
    let duration = start.elapsed();

    let timed_out = killed || output.timed_out;
    let success = status.success() && !timed_out;
    Ok(CommandResult {
        exit_code: status.code(),
        stdout: output.stdout,
        stderr: output.stderr,
        duration,
        success,
        timed_out,
    })
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug, Default)]
struct CapturedOutput {
    stdout: String,
    stderr: String,
    timed_out: bool,
}

/// Read `pipe` to the end on a helper thread; returns how many readers were started.
fn drain<R: Read + Send + 'static>(
    pipe: Option<R>,
    stream: Stream,
    tx: &Sender<(Stream, Vec<u8>)>,
) -> usize {
    match pipe {
        Some(mut reader) => {
            let tx = tx.clone();
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = reader.read_to_end(&mut buf);
                let _ = tx.send((stream, buf));
            });
            1
        }
        None => 0,
    }
}

fn collect_output(
    child: &mut Child,
    rx: &Receiver<(Stream, Vec<u8>)>,
    pending: usize,
    deadline: Option<Instant>,
    killed: bool,
) -> CapturedOutput {
    let mut output = CapturedOutput {
        timed_out: killed,
        ..Default::default()
    };

    for _ in 0..pending {
        let received = match deadline {
            None => rx.recv().ok(),
            Some(_) if output.timed_out => rx.recv_timeout(KILL_GRACE).ok(),
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(remaining) {
                    Ok(message) => Some(message),
                    Err(RecvTimeoutError::Timeout) => {
                        terminate(child);
                        output.timed_out = true;
                        rx.recv_timeout(KILL_GRACE).ok()
                    }
                    Err(RecvTimeoutError::Disconnected) => None,
                }
            }
        };

        match received {
            Some((Stream::Stdout, bytes)) => {
                output.stdout = String::from_utf8_lossy(&bytes).into_owned()
            }
            Some((Stream::Stderr, bytes)) => {
                output.stderr = String::from_utf8_lossy(&bytes).into_owned()
            }
            None => break,
        }
    }

    output
}

fn wait_with_deadline(child: &mut Child, deadline: Instant) -> io::Result<(ExitStatus, bool)> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false));
        }

        if Instant::now() >= deadline {
            terminate(child);
            let status = child.wait()?;
            return Ok((status, true));
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill the child's whole process group.
#[cfg(unix)]
fn terminate(child: &mut Child) {
    let pgid = child.id() as libc::pid_t;
    tracing::debug!("Killing process group {}", pgid);
    // SAFETY: kill(2) with a negative pid signals the group created by
    // `process_group(0)` above; no memory is shared with the callee.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
}

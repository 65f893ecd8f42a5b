//! Runs one external tool invocation and collects its output.
//!
//! stdin is closed, stdout and stderr are drained on their own threads
//! so a chatty tool cannot block on a full pipe while we wait for it.

use std::ffi::OsString;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How often a child is polled while a timeout is armed
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of a finished tool run
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Why a tool run produced no [`ToolOutput`]
#[derive(Debug)]
pub enum ProcessFailure {
    /// The program could not be started
    Spawn(io::Error),
    /// Waiting on the child or reading its pipes failed
    Io(io::Error),
    /// The deadline passed; the child was killed and reaped
    TimedOut(Duration),
}

/// Run `program` with `args`, waiting for it to exit.
///
/// Without a timeout a hung tool blocks the caller indefinitely.
pub fn run_tool(
    program: &Path,
    args: &[OsString],
    timeout: Option<Duration>,
) -> Result<ToolOutput, ProcessFailure> {
    debug!(tool = %program.display(), ?args, "spawning external tool");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(ProcessFailure::Spawn)?;

    let stdout = spawn_reader(child.stdout.take());
    let stderr = spawn_reader(child.stderr.take());

    let status = match timeout {
        None => child.wait().map_err(ProcessFailure::Io)?,
        Some(limit) => wait_with_deadline(&mut child, limit)?,
    };

    Ok(ToolOutput {
        status,
        stdout: join_reader(stdout)?,
        stderr: join_reader(stderr)?,
    })
}

fn spawn_reader<R>(pipe: Option<R>) -> Option<JoinHandle<io::Result<Vec<u8>>>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            pipe.read_to_end(&mut buffer)?;
            Ok(buffer)
        })
    })
}

fn join_reader(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> Result<String, ProcessFailure> {
    let Some(handle) = handle else {
        return Ok(String::new());
    };
    let bytes = handle
        .join()
        .map_err(|_| ProcessFailure::Io(io::Error::other("output reader thread panicked")))?
        .map_err(ProcessFailure::Io)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn wait_with_deadline(child: &mut Child, limit: Duration) -> Result<ExitStatus, ProcessFailure> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait().map_err(ProcessFailure::Io)? {
            return Ok(status);
        }
        if started.elapsed() >= limit {
            warn!(pid = child.id(), ?limit, "external tool timed out, killing it");
            // The child may exit between try_wait and kill; either way reap it.
            let _ = child.kill();
            let _ = child.wait();
            // Reader threads are left to finish on their own: a grandchild
            // may still hold the pipes open.
            return Err(ProcessFailure::TimedOut(limit));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sh(script: &str) -> (PathBuf, Vec<OsString>) {
        (PathBuf::from("/bin/sh"), vec!["-c".into(), script.into()])
    }

    #[test]
    fn captures_both_streams() {
        let (program, args) = sh("echo out; echo err >&2");
        let output = run_tool(&program, &args, None).unwrap();

        assert!(output.status.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[test]
    fn reports_exit_code() {
        let (program, args) = sh("exit 2");
        let output = run_tool(&program, &args, Some(Duration::from_secs(10))).unwrap();

        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn missing_program_is_a_spawn_failure() {
        let result = run_tool(Path::new("/nonexistent/tool-12345"), &[], None);
        assert!(matches!(result, Err(ProcessFailure::Spawn(_))));
    }

    #[test]
    fn timeout_kills_hung_tool() {
        let (program, args) = sh("exec sleep 30");
        let started = Instant::now();
        let result = run_tool(&program, &args, Some(Duration::from_millis(200)));

        assert!(matches!(result, Err(ProcessFailure::TimedOut(_))));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}

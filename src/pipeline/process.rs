//! Running wakatime-cli.

use super::batch::Invocation;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub success: bool,
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Errors that prevent a process result from being captured.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to start {}: {source}", .binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write extra heartbeats to stdin: {0}")]
    Stdin(#[source] io::Error),

    #[error("failed waiting for process: {0}")]
    Wait(#[source] io::Error),

    #[error("process timed out after {0:?}")]
    TimedOut(Duration),
}

/// Something that can execute a rendered invocation.
pub trait ProcessRunner: Send + Sync {
    /// Run to completion and capture both output streams.
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessError>;
}

/// Runs invocations as child processes.
#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    timeout: Option<Duration>,
}

impl CommandRunner {
    /// Runner without a time limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the child and report [`ProcessError::TimedOut`] after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, ProcessError> {
        let Some(timeout) = self.timeout else {
            return child.wait().map_err(ProcessError::Wait);
        };

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait().map_err(ProcessError::Wait)? {
                return Ok(status);
            }
            if started.elapsed() >= timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProcessError::TimedOut(timeout));
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
}

fn read_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

impl ProcessRunner for CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ProcessError> {
        let mut child = Command::new(&invocation.binary)
            .args(invocation.tokens())
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                binary: invocation.binary.clone(),
                source,
            })?;

        // Feed stdin from its own thread so a chatty child cannot deadlock us.
        let writer = child
            .stdin
            .take()
            .zip(invocation.stdin.clone())
            .map(|(mut pipe, payload)| thread::spawn(move || pipe.write_all(payload.as_bytes())));
        let stdout = read_pipe(child.stdout.take());
        let stderr = read_pipe(child.stderr.take());

        let status = self.wait(&mut child)?;

        if let Some(writer) = writer {
            if let Ok(Err(e)) = writer.join() {
                // A child that exits without reading stdin closes the pipe early.
                if e.kind() != io::ErrorKind::BrokenPipe {
                    return Err(ProcessError::Stdin(e));
                }
            }
        }

        Ok(ProcessOutput {
            success: status.success(),
            exit_code: status.code(),
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(binary: &str, args: &[&str], stdin: Option<&str>) -> Invocation {
        Invocation {
            binary: PathBuf::from(binary),
            args: args.iter().map(|s| s.to_string()).collect(),
            display_args: Vec::new(),
            stdin: stdin.map(str::to_string),
        }
    }

    #[test]
    fn test_missing_binary_is_spawn_error() {
        let runner = CommandRunner::new();
        let err = runner
            .run(&invocation("/nonexistent/wakatime-cli", &[], None))
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
        assert!(err.to_string().contains("/nonexistent/wakatime-cli"));
    }

    #[cfg(unix)]
    #[test]
    fn test_arguments_are_split_into_tokens() {
        let runner = CommandRunner::new();
        let output = runner
            .run(&invocation("echo", &["--entity\" \"/a b.rs", "--write"], None))
            .unwrap();
        assert!(output.success);
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout, "--entity /a b.rs --write\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_stdin_payload_reaches_child() {
        let runner = CommandRunner::new();
        let output = runner.run(&invocation("cat", &[], Some("[{}]"))).unwrap();
        assert_eq!(output.stdout, "[{}]");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_captured() {
        let runner = CommandRunner::new();
        let output = runner.run(&invocation("false", &[], None)).unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(1));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let runner = CommandRunner::with_timeout(Duration::from_millis(100));
        let err = runner.run(&invocation("sleep", &["5"], None)).unwrap_err();
        assert!(matches!(err, ProcessError::TimedOut(_)));
    }
}

//! Executing `go test -json` for reruns.

#![allow(missing_docs)]

use std::io::{BufReader, Read};
use std::process::{Command, Stdio};
use std::thread;

use crossbeam_channel::Sender;

use crate::collector::stream::read_event_stream;
use crate::core::config::RerunConfig;
use crate::core::errors::{GtvError, Result};
use crate::logger::activity::ActivityLoggerHandle;
use crate::model::event::TestEvent;
use crate::session::rerun::RerunTarget;

/// How a completed execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Passed,
    /// The toolchain exited non-zero; failing tests are a normal result.
    TestsFailed,
}

/// Something that can run a rerun target and stream its events.
///
/// Implementations send every event into `tx` and drop it when done, which
/// is what ends ingestion for the rerun's History.
pub trait TestExecutor: Send + Sync {
    fn run(&self, target: &RerunTarget, tx: Sender<TestEvent>) -> Result<RunOutcome>;
}

/// Runs the real `go` toolchain.
#[derive(Debug, Clone)]
pub struct GoTestExecutor {
    go_binary: String,
    extra_args: Vec<String>,
    logger: ActivityLoggerHandle,
}

impl GoTestExecutor {
    #[must_use]
    pub fn new(config: &RerunConfig, logger: ActivityLoggerHandle) -> Self {
        Self {
            go_binary: config.go_binary.clone(),
            extra_args: config.extra_args.clone(),
            logger,
        }
    }

    /// Arguments passed to the `go` binary for `target`.
    #[must_use]
    pub fn command_args(&self, target: &RerunTarget) -> Vec<String> {
        let mut args = vec!["test".to_string(), "-json".to_string()];
        args.extend(self.extra_args.iter().cloned());
        if let Some(pattern) = target.run_pattern() {
            args.push("-run".to_string());
            args.push(pattern);
        }
        args.push(target.package().to_string());
        args
    }
}

impl TestExecutor for GoTestExecutor {
    fn run(&self, target: &RerunTarget, tx: Sender<TestEvent>) -> Result<RunOutcome> {
        let args = self.command_args(target);
        let mut child = Command::new(&self.go_binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GtvError::Execution {
                details: format!("failed to start {}: {e}", self.go_binary),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| GtvError::Execution {
            details: "stdout pipe unavailable".to_string(),
        })?;
        let stderr = child.stderr.take();

        // stderr is drained concurrently so a chatty build cannot fill the
        // pipe and stall stdout.
        let stderr_reader = thread::Builder::new()
            .name("gtv-go-stderr".to_string())
            .spawn(move || {
                let mut captured = String::new();
                if let Some(mut pipe) = stderr {
                    let _ = pipe.read_to_string(&mut captured);
                }
                captured
            })
            .map_err(|e| GtvError::Runtime {
                details: format!("failed to spawn stderr reader: {e}"),
            })?;

        let source = format!("{} {}", self.go_binary, args.join(" "));
        let streamed = read_event_stream(BufReader::new(stdout), &source, &tx, &self.logger);
        drop(tx);
        if streamed.is_err() {
            // Nobody drains stdout any more.
            let _ = child.kill();
        }

        let status = child.wait().map_err(|e| GtvError::Execution {
            details: format!("failed to wait for {}: {e}", self.go_binary),
        })?;
        let stderr_text = stderr_reader.join().unwrap_or_default();
        streamed.map_err(|e| GtvError::Execution {
            details: format!("reading test output: {e}"),
        })?;

        match status.code() {
            Some(0) => Ok(RunOutcome::Passed),
            Some(_) => Ok(RunOutcome::TestsFailed),
            None => Err(GtvError::Execution {
                details: format!(
                    "{} terminated by signal: {}",
                    self.go_binary,
                    last_line(&stderr_text)
                ),
            }),
        }
    }
}

fn last_line(text: &str) -> &str {
    text.lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::unbounded;

    use super::*;
    use crate::model::tree::{NodeRef, TestKey};

    fn executor(go_binary: &str, extra: &[&str]) -> GoTestExecutor {
        let config = RerunConfig {
            go_binary: go_binary.to_string(),
            extra_args: extra.iter().map(ToString::to_string).collect(),
        };
        GoTestExecutor::new(&config, ActivityLoggerHandle::disabled())
    }

    #[test]
    fn package_rerun_args() {
        let target = RerunTarget::from_ref(&NodeRef::Package("example.com/a".to_string())).unwrap();
        assert_eq!(
            executor("go", &["-count=1"]).command_args(&target),
            vec!["test", "-json", "-count=1", "example.com/a"]
        );
    }

    #[test]
    fn single_test_rerun_args() {
        let target =
            RerunTarget::from_ref(&NodeRef::Test(TestKey::new("example.com/a", "TestX/y"))).unwrap();
        assert_eq!(
            executor("go", &[]).command_args(&target),
            vec!["test", "-json", "-run", "^TestX$/^y$", "example.com/a"]
        );
    }

    #[test]
    fn missing_binary_is_execution_error() {
        let target = RerunTarget::Package("example.com/a".to_string());
        let (tx, rx) = unbounded();
        let err = executor("/nonexistent/gtv-test-go", &[])
            .run(&target, tx)
            .unwrap_err();
        assert_eq!(err.code(), "GTV-4001");
        // The sender was consumed, so the channel is closed.
        assert!(rx.recv().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_tests_failed() {
        use std::os::unix::fs::PermissionsExt;

        // A stand-in toolchain that ignores its arguments, prints one event
        // and exits 1 like `go test` with a failing test.
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-go");
        std::fs::write(
            &script,
            "#!/bin/sh\necho '{\"Action\":\"fail\",\"Package\":\"p\",\"Test\":\"TestA\"}'\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let (tx, rx) = unbounded();
        let outcome = executor(script.to_str().unwrap(), &[])
            .run(&RerunTarget::Package("p".to_string()), tx)
            .unwrap();
        assert_eq!(outcome, RunOutcome::TestsFailed);
        assert_eq!(rx.iter().count(), 1);
    }
}

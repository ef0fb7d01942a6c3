pub mod docker;
pub mod error;
pub mod local;
pub mod mock;
pub mod sink;
pub mod ssh;

pub use docker::DockerOps;
pub use error::ExecError;
pub use local::LocalExecutor;
pub use mock::MockExecutor;
pub use sink::{MemorySink, NullSink, OutputSink, StdoutSink};
pub use ssh::SshExecutor;

use async_trait::async_trait;
use pgward_core::{Config, ExecutionMode};
use std::sync::Arc;

/// Executor trait defines the ability to run shell commands against one host.
///
/// Implementors:
/// - [`LocalExecutor`]: spawns processes directly on this host
/// - [`SshExecutor`]: runs every command over a held SSH session
///
/// All Docker-aware behavior lives in [`DockerOps`], which is written once
/// against `execute`/`file_exists` and therefore works over any transport.
#[async_trait]
pub trait Executor: Send + Sync {
    /// The configuration this executor is bound to.
    fn config(&self) -> &Config;

    /// Run a command to completion and return its output and exit code.
    ///
    /// With `invocation.check` set, a non-zero exit becomes
    /// [`ExecError::CommandFailed`]; otherwise the exit code is returned as
    /// data. With a stdin payload, the payload is written to the command's
    /// input and the stream is closed so the command observes EOF.
    async fn execute(&self, invocation: Invocation) -> Result<CommandOutput, ExecError>;

    /// True iff `path` exists as a regular file on the target host.
    /// "Not found" is `false`, never an error; only transport failures raise.
    async fn file_exists(&self, path: &str) -> Result<bool, ExecError>;

    /// Release the underlying transport. No-op for transports without one.
    async fn close(&self) -> Result<(), ExecError> {
        Ok(())
    }
}

/// One command to run: the command text plus per-call options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    /// Echo `$ <command>` to the output sink before running. Default true.
    pub show_command: bool,
    /// Payload written to the command's standard input, then EOF.
    pub stdin: Option<String>,
    /// Escalate a non-zero exit code into an error. Default true.
    pub check: bool,
}

impl Invocation {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            show_command: true,
            stdin: None,
            check: true,
        }
    }

    /// Suppress command echoing; used by internal probes.
    pub fn quiet(mut self) -> Self {
        self.show_command = false;
        self
    }

    pub fn stdin(mut self, payload: impl Into<String>) -> Self {
        self.stdin = Some(payload.into());
        self
    }

    pub fn stdin_opt(mut self, payload: Option<&str>) -> Self {
        self.stdin = payload.map(str::to_string);
        self
    }

    pub fn check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }
}

/// What a finished command produced. Output text is UTF-8 decoded and trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Apply the check contract shared by every transport: with `check` set,
    /// a non-zero exit becomes [`ExecError::CommandFailed`] carrying the
    /// captured output; without it, the result is returned as-is.
    pub fn checked(self, check: bool) -> Result<Self, ExecError> {
        if check && self.exit_code != 0 {
            return Err(ExecError::CommandFailed {
                stdout: self.stdout,
                stderr: self.stderr,
                exit_code: self.exit_code,
            });
        }
        Ok(self)
    }
}

pub(crate) fn decode_trimmed(bytes: Vec<u8>) -> Result<String, ExecError> {
    let text = String::from_utf8(bytes).map_err(ExecError::transport)?;
    Ok(text.trim().to_string())
}

/// Build the executor for the configured execution mode. In remote mode the
/// SSH session is established here; callers must `close()` it when done (or
/// use [`SshExecutor::with_session`] directly for scoped acquisition).
pub async fn build_executor(
    config: Arc<Config>,
    sink: Arc<dyn OutputSink>,
) -> Result<Box<dyn Executor>, ExecError> {
    match config.execution_mode {
        ExecutionMode::Local => Ok(Box::new(LocalExecutor::new(config, sink))),
        ExecutionMode::Remote => {
            let executor = SshExecutor::new(config, sink);
            executor.connect().await?;
            Ok(Box::new(executor))
        }
    }
}

/// Run `f` against an executor, then `close()` it, on the success and the
/// error path alike. A close failure only surfaces when the body succeeded.
pub async fn with_executor<'a, T, E, F, Fut>(executor: &'a dyn Executor, f: F) -> Result<T, E>
where
    E: From<ExecError>,
    F: FnOnce(&'a dyn Executor) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>> + 'a,
{
    let result = f(executor).await;
    match executor.close().await {
        Ok(()) => result,
        Err(close_err) => result.and(Err(close_err.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_defaults() {
        let inv = Invocation::new("echo hi");
        assert!(inv.show_command);
        assert!(inv.check);
        assert!(inv.stdin.is_none());
    }

    #[test]
    fn checked_passes_zero_exit_through() {
        let out = CommandOutput {
            stdout: "ok".into(),
            stderr: String::new(),
            exit_code: 0,
        };
        assert!(out.clone().checked(true).is_ok());
        assert!(out.checked(false).is_ok());
    }

    #[test]
    fn checked_escalates_only_when_asked() {
        let out = CommandOutput {
            stdout: "partial".into(),
            stderr: "boom".into(),
            exit_code: 3,
        };
        let unchecked = out.clone().checked(false).expect("check=false never fails");
        assert_eq!(unchecked.exit_code, 3);

        match out.checked(true) {
            Err(ExecError::CommandFailed {
                stdout,
                stderr,
                exit_code,
            }) => {
                assert_eq!(stdout, "partial");
                assert_eq!(stderr, "boom");
                assert_eq!(exit_code, 3);
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[test]
    fn decode_trims_surrounding_whitespace() {
        let text = decode_trimmed(b"  hello world\n".to_vec()).expect("utf-8");
        assert_eq!(text, "hello world");
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let err = decode_trimmed(vec![0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, ExecError::Transport(_)));
    }

    #[tokio::test]
    async fn with_executor_closes_exactly_once_on_success() {
        let mock = MockExecutor::new();
        let result = with_executor(&mock, |exec| async move {
            exec.execute(Invocation::new("true")).await.map(|_| ())
        })
        .await;
        assert!(result.is_ok());
        assert_eq!(mock.close_calls(), 1);
    }

    #[tokio::test]
    async fn with_executor_closes_exactly_once_on_error() {
        let mock = MockExecutor::new();
        mock.push_failure(1, "boom");
        let result = with_executor(&mock, |exec| async move {
            exec.execute(Invocation::new("false")).await.map(|_| ())
        })
        .await;
        assert!(matches!(result, Err(ExecError::CommandFailed { .. })));
        assert_eq!(mock.close_calls(), 1);
    }
}

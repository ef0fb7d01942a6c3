use crate::sink::OutputSink;
use crate::{decode_trimmed, CommandOutput, ExecError, Executor, Invocation};
use async_trait::async_trait;
use pgward_core::Config;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Runs commands by spawning processes directly on this host.
pub struct LocalExecutor {
    config: Arc<Config>,
    sink: Arc<dyn OutputSink>,
}

impl LocalExecutor {
    pub fn new(config: Arc<Config>, sink: Arc<dyn OutputSink>) -> Self {
        Self { config, sink }
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    fn config(&self) -> &Config {
        &self.config
    }

    async fn execute(&self, invocation: Invocation) -> Result<CommandOutput, ExecError> {
        if invocation.show_command {
            self.sink.line(&format!("$ {}", invocation.command));
        }

        // sh -c so shell features (pipes, redirection) behave the same as on
        // the remote transport.
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(&invocation.command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command.stdin(if invocation.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = command.spawn().map_err(ExecError::transport)?;

        if let Some(payload) = &invocation.stdin {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| ExecError::transport("child stdin was not piped".to_string()))?;
            stdin
                .write_all(payload.as_bytes())
                .await
                .map_err(ExecError::transport)?;
            // Dropping the handle closes the pipe; the child sees EOF.
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(ExecError::transport)?;
        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = decode_trimmed(output.stdout)?;
        let stderr = decode_trimmed(output.stderr)?;

        if exit_code != 0 {
            tracing::debug!(exit_code, command = %invocation.command, "local command exited non-zero");
        }

        CommandOutput {
            stdout,
            stderr,
            exit_code,
        }
        .checked(invocation.check)
    }

    async fn file_exists(&self, path: &str) -> Result<bool, ExecError> {
        match tokio::fs::metadata(path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ExecError::transport(e)),
        }
    }
}

use crate::sink::OutputSink;
use crate::{decode_trimmed, CommandOutput, ExecError, Executor, Invocation};
use async_trait::async_trait;
use pgward_core::Config;
use russh::client;
use russh::{ChannelMsg, Disconnect};
use russh_keys::{key, load_secret_key};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

struct ClientHandler;

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = anyhow::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &key::PublicKey,
    ) -> Result<bool, Self::Error> {
        // Trust-on-first-use. pgward is an operator tool pointed at hosts the
        // operator already controls; strict host key checking is not applied.
        Ok(true)
    }
}

/// Runs commands on a remote host over a held SSH session.
///
/// Lifecycle: `connect` establishes the session, `disconnect` tears it down
/// (idempotent). Every capability method fails with
/// [`ExecError::NotConnected`] while no session is open; there is no implicit
/// reconnect. [`SshExecutor::with_session`] wraps a block of work so the
/// session is released on every exit path.
pub struct SshExecutor {
    config: Arc<Config>,
    sink: Arc<dyn OutputSink>,
    session: Mutex<Option<client::Handle<ClientHandler>>>,
}

impl SshExecutor {
    pub fn new(config: Arc<Config>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            config,
            sink,
            session: Mutex::new(None),
        }
    }

    /// Establish the SSH session using key-based authentication.
    ///
    /// Fails with [`ExecError::InvalidConfig`] before any network activity
    /// when the bound configuration does not validate. On any failure the
    /// executor stays unconnected.
    pub async fn connect(&self) -> Result<(), ExecError> {
        if !self.config.validate() {
            return Err(ExecError::InvalidConfig(
                self.config.validation_errors().join("; "),
            ));
        }
        let remote = &self.config.remote;

        let key_pair = load_secret_key(&remote.ssh_key_path, None)
            .map_err(|e| ExecError::connection(&remote.host, e))?;

        let ssh_config = Arc::new(client::Config::default());
        let connecting = client::connect(
            ssh_config,
            (remote.host.as_str(), remote.port),
            ClientHandler,
        );
        let mut handle = match tokio::time::timeout(CONNECT_TIMEOUT, connecting).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => return Err(ExecError::connection(&remote.host, e)),
            Err(_) => {
                return Err(ExecError::connection(
                    &remote.host,
                    format!("connection timed out after {}s", CONNECT_TIMEOUT.as_secs()),
                ))
            }
        };

        let authenticated = handle
            .authenticate_publickey(&remote.user, Arc::new(key_pair))
            .await
            .map_err(|e| ExecError::connection(&remote.host, e))?;
        if !authenticated {
            return Err(ExecError::connection(
                &remote.host,
                "public key authentication rejected".to_string(),
            ));
        }

        *self.session.lock().await = Some(handle);
        tracing::info!(host = %remote.host, port = remote.port, "ssh session established");
        self.sink.line(&format!("Connected to {}", remote.host));
        Ok(())
    }

    /// Close the session. Idempotent; a never-opened session is a no-op.
    pub async fn disconnect(&self) {
        let mut guard = self.session.lock().await;
        if let Some(handle) = guard.take() {
            let _ = handle.disconnect(Disconnect::ByApplication, "", "en").await;
            tracing::debug!(host = %self.config.remote.host, "ssh session closed");
        }
    }

    /// Scoped acquisition: connect, run `f` with this executor, and
    /// disconnect on both the success and the error path.
    pub async fn with_session<'a, T, F, Fut>(&'a self, f: F) -> Result<T, ExecError>
    where
        F: FnOnce(&'a Self) -> Fut,
        Fut: Future<Output = Result<T, ExecError>> + 'a,
    {
        self.connect().await?;
        let result = f(self).await;
        self.disconnect().await;
        result
    }
}

#[async_trait]
impl Executor for SshExecutor {
    fn config(&self) -> &Config {
        &self.config
    }

    async fn execute(&self, invocation: Invocation) -> Result<CommandOutput, ExecError> {
        // Holding the lock for the whole call keeps channel I/O on this
        // session sequential; interleaved writes are not a supported mode.
        let guard = self.session.lock().await;
        let handle = guard.as_ref().ok_or(ExecError::NotConnected)?;

        if invocation.show_command {
            self.sink.line(&format!("$ {}", invocation.command));
        }

        let mut channel = handle
            .channel_open_session()
            .await
            .map_err(ExecError::transport)?;
        channel
            .exec(true, invocation.command.as_str())
            .await
            .map_err(ExecError::transport)?;

        // Write the payload (if any) and close our side before waiting on the
        // exit status, so a command that reads all of stdin cannot deadlock.
        if let Some(payload) = &invocation.stdin {
            channel
                .data(payload.as_bytes())
                .await
                .map_err(ExecError::transport)?;
        }
        channel.eof().await.map_err(ExecError::transport)?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = None;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExtendedData { ref data, .. } => stderr.extend_from_slice(data),
                ChannelMsg::ExitStatus { exit_status } => exit_code = Some(exit_status as i32),
                _ => {}
            }
        }

        let exit_code = exit_code.ok_or_else(|| {
            ExecError::transport("channel closed without reporting an exit status".to_string())
        })?;
        let stdout = decode_trimmed(stdout)?;
        let stderr = decode_trimmed(stderr)?;

        if exit_code != 0 {
            tracing::debug!(exit_code, command = %invocation.command, "remote command exited non-zero");
        }

        CommandOutput {
            stdout,
            stderr,
            exit_code,
        }
        .checked(invocation.check)
    }

    async fn file_exists(&self, path: &str) -> Result<bool, ExecError> {
        let output = self
            .execute(
                Invocation::new(format!("test -f {}", path))
                    .quiet()
                    .check(false),
            )
            .await?;
        Ok(output.exit_code == 0)
    }

    async fn close(&self) -> Result<(), ExecError> {
        self.disconnect().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;
    use pgward_core::ExecutionMode;

    fn remote_config() -> Config {
        let mut config = Config::default();
        config.execution_mode = ExecutionMode::Remote;
        config.remote.host = "db.example.com".to_string();
        config.remote.user = "deploy".to_string();
        config.remote.ssh_key_path = "/nonexistent/key".to_string();
        config
    }

    fn executor(config: Config) -> SshExecutor {
        SshExecutor::new(Arc::new(config), Arc::new(NullSink))
    }

    #[tokio::test]
    async fn execute_without_session_fails_closed() {
        let exec = executor(remote_config());
        let err = exec.execute(Invocation::new("echo hi")).await.unwrap_err();
        assert!(matches!(err, ExecError::NotConnected));
    }

    #[tokio::test]
    async fn file_exists_without_session_fails_closed() {
        let exec = executor(remote_config());
        let err = exec.file_exists("/etc/hostname").await.unwrap_err();
        assert!(matches!(err, ExecError::NotConnected));
    }

    #[tokio::test]
    async fn connect_rejects_invalid_config_before_network() {
        let mut config = remote_config();
        config.remote.host.clear();
        let exec = executor(config);
        let err = exec.connect().await.unwrap_err();
        assert!(matches!(err, ExecError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn connect_fails_on_unreadable_key() {
        // Valid config, but the key file does not exist: Connection, naming
        // the target host, raised before any network attempt.
        let exec = executor(remote_config());
        match exec.connect().await.unwrap_err() {
            ExecError::Connection { host, .. } => assert_eq!(host, "db.example.com"),
            other => panic!("expected Connection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let exec = executor(remote_config());
        exec.disconnect().await;
        exec.disconnect().await;
        let err = exec.execute(Invocation::new("true")).await.unwrap_err();
        assert!(matches!(err, ExecError::NotConnected));
    }

    #[tokio::test]
    async fn with_session_surfaces_connect_failure() {
        let mut config = remote_config();
        config.remote.user.clear();
        let exec = executor(config);
        let result = exec
            .with_session(|_| async { Ok::<(), ExecError>(()) })
            .await;
        assert!(matches!(result, Err(ExecError::InvalidConfig(_))));
    }
}

use thiserror::Error;

pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Everything the executor layer can fail with. All variants propagate to the
/// immediate caller; nothing is swallowed inside the executor. Probe
/// operations avoid the `CommandFailed` path by running with `check=false`.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Configuration failed validation before a transport was attempted.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Network or authentication failure while establishing the SSH session.
    #[error("failed to connect to {host}: {source}")]
    Connection {
        host: String,
        #[source]
        source: BoxedCause,
    },

    /// `execute` on a remote executor with no live session. Usage error,
    /// never transient; there is no implicit reconnect.
    #[error("not connected to remote host")]
    NotConnected,

    /// A command exited non-zero under `check=true`. Carries the captured
    /// output so callers can present diagnostics.
    #[error("command failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        stdout: String,
        stderr: String,
        exit_code: i32,
    },

    /// Stream or decoding failure in the transport itself.
    #[error("transport failure: {0}")]
    Transport(#[source] BoxedCause),
}

impl ExecError {
    pub fn connection(host: impl Into<String>, cause: impl Into<BoxedCause>) -> Self {
        Self::Connection {
            host: host.into(),
            source: cause.into(),
        }
    }

    pub fn transport(cause: impl Into<BoxedCause>) -> Self {
        Self::Transport(cause.into())
    }
}

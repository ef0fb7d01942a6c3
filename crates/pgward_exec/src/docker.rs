//! Docker semantics shared by every transport.
//!
//! Everything here is built on [`Executor::execute`] alone, so container
//! probing behaves identically whether commands run locally or over SSH.

use crate::{CommandOutput, ExecError, Executor, Invocation};
use async_trait::async_trait;

/// Docker-aware operations derived from the executor primitives.
///
/// `docker_exec` performs no quoting or escaping; callers own producing a
/// shell-safe command string.
#[async_trait]
pub trait DockerOps: Executor {
    /// Run `command` inside a running container via `docker exec`.
    ///
    /// `-i` is added iff a non-empty stdin payload is given (interactive mode
    /// is what forwards stdin into the container's process), `-u <user>` iff
    /// a non-empty user is given.
    async fn docker_exec(
        &self,
        container: &str,
        command: &str,
        user: Option<&str>,
        stdin: Option<&str>,
        check: bool,
    ) -> Result<CommandOutput, ExecError> {
        let docker_command = build_docker_exec(container, command, user, stdin);
        self.execute(Invocation::new(docker_command).stdin_opt(stdin).check(check))
            .await
    }

    /// True iff `container` is currently running.
    ///
    /// The name filter is anchored (`^name$`) so `web2` never matches a probe
    /// for `web`, and the name must appear verbatim as a full output line.
    async fn check_container_running(&self, container: &str) -> Result<bool, ExecError> {
        let command = format!(
            "docker ps --filter name=^{container}$ --filter status=running --format '{{{{.Names}}}}'"
        );
        let output = self
            .execute(Invocation::new(command).quiet().check(false))
            .await?;
        Ok(output.exit_code == 0 && output.stdout.lines().any(|line| line == container))
    }

    /// Status text for `container` (e.g. "Up 2 hours"), or `None` if the
    /// runtime does not know it.
    ///
    /// Runs with `check=false`, so a failing probe and a truly absent
    /// container both come back as `None`; callers cannot tell the two apart
    /// from this call alone.
    async fn get_container_status(&self, container: &str) -> Result<Option<String>, ExecError> {
        let command =
            format!("docker ps -a --filter name=^{container}$ --format '{{{{.Status}}}}'");
        let output = self
            .execute(Invocation::new(command).quiet().check(false))
            .await?;
        if output.exit_code == 0 && !output.stdout.is_empty() {
            Ok(Some(output.stdout))
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl<T: Executor + ?Sized> DockerOps for T {}

fn build_docker_exec(
    container: &str,
    command: &str,
    user: Option<&str>,
    stdin: Option<&str>,
) -> String {
    let mut docker_command = String::from("docker exec");
    if stdin.is_some_and(|payload| !payload.is_empty()) {
        docker_command.push_str(" -i");
    }
    if let Some(user) = user.filter(|user| !user.is_empty()) {
        docker_command.push_str(" -u ");
        docker_command.push_str(user);
    }
    docker_command.push(' ');
    docker_command.push_str(container);
    docker_command.push(' ');
    docker_command.push_str(command);
    docker_command
}

//! Mock executor — scripted command results for testing without a transport.

use crate::{CommandOutput, ExecError, Executor, Invocation};
use async_trait::async_trait;
use pgward_core::Config;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Records every invocation and replays a scripted queue of results.
/// An empty queue yields successful, empty output. The check contract is
/// applied exactly as the real transports apply it.
#[derive(Default)]
pub struct MockExecutor {
    config: Config,
    script: Mutex<VecDeque<CommandOutput>>,
    invocations: Mutex<Vec<Invocation>>,
    files: Mutex<HashSet<String>>,
    close_calls: AtomicUsize,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn push_result(&self, output: CommandOutput) {
        self.script.lock().expect("mock lock").push_back(output);
    }

    pub fn push_success(&self, stdout: &str) {
        self.push_result(CommandOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            exit_code: 0,
        });
    }

    pub fn push_failure(&self, exit_code: i32, stderr: &str) {
        self.push_result(CommandOutput {
            stdout: String::new(),
            stderr: stderr.to_string(),
            exit_code,
        });
    }

    pub fn add_file(&self, path: &str) {
        self.files.lock().expect("mock lock").insert(path.to_string());
    }

    /// Every invocation seen so far, in order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().expect("mock lock").clone()
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executor for MockExecutor {
    fn config(&self) -> &Config {
        &self.config
    }

    async fn execute(&self, invocation: Invocation) -> Result<CommandOutput, ExecError> {
        let output = self
            .script
            .lock()
            .expect("mock lock")
            .pop_front()
            .unwrap_or(CommandOutput {
                stdout: String::new(),
                stderr: String::new(),
                exit_code: 0,
            });
        let check = invocation.check;
        self.invocations.lock().expect("mock lock").push(invocation);
        output.checked(check)
    }

    async fn file_exists(&self, path: &str) -> Result<bool, ExecError> {
        Ok(self.files.lock().expect("mock lock").contains(path))
    }

    async fn close(&self) -> Result<(), ExecError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

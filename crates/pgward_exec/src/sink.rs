//! Injected output channel for command echoes and connection notices.
//!
//! Executors never print to a global console; they write user-facing lines to
//! an [`OutputSink`] handed to them at construction, so tests can capture the
//! side channel without grabbing process-wide stdout.

use std::sync::Mutex;

pub trait OutputSink: Send + Sync {
    fn line(&self, message: &str);
}

/// Writes to stdout. The sink used by the CLI.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn line(&self, message: &str) {
        println!("{}", message);
    }
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn line(&self, _message: &str) {}
}

/// Buffers lines in memory; test support.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("sink lock poisoned").clone()
    }
}

impl OutputSink for MemorySink {
    fn line(&self, message: &str) {
        self.lines
            .lock()
            .expect("sink lock poisoned")
            .push(message.to_string());
    }
}

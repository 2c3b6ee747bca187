use std::sync::{Arc, Mutex};

/// Line-oriented progress output.
pub trait DiagnosticSink: Send + Sync {
    fn line(&self, line: &str);
}

pub fn running_line(identity: &str, remaining_ms: u64) -> String {
    format!("{} is running, {}ms remaining", identity, remaining_ms)
}

pub fn finished_line(identity: &str) -> String {
    format!("{} has finished execution.", identity)
}

/// Forwards lines to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn line(&self, line: &str) {
        tracing::info!("{}", line);
    }
}

/// Prints lines to stdout, one per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl DiagnosticSink for StdoutSink {
    fn line(&self, line: &str) {
        println!("{}", line);
    }
}

/// Keeps lines in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Lines mentioning `identity` as the subject.
    pub fn lines_for(&self, identity: &str) -> Vec<String> {
        let prefix = format!("{} ", identity);
        self.lines()
            .into_iter()
            .filter(|l| l.starts_with(&prefix))
            .collect()
    }
}

impl DiagnosticSink for MemorySink {
    fn line(&self, line: &str) {
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line.to_string()),
            Err(poisoned) => poisoned.into_inner().push(line.to_string()),
        }
    }
}

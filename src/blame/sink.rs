//! Output side of the host contract.
//!
//! Workers hand finished files to `SinkAdapter`, which forwards them to the
//! host's `BlameOutput` in a single call per file. The host's sink has to be
//! safe for concurrent calls; no locking is added on this side.

use std::sync::{Arc, Mutex};

use crate::models::{BlameLine, InputFile};

/// Receiver of blame results, called from worker threads.
pub trait BlameOutput: Send + Sync {
    fn blame_result(&self, file: &InputFile, lines: Vec<BlameLine>);
}

#[derive(Clone)]
pub struct SinkAdapter {
    output: Arc<dyn BlameOutput>,
}

impl SinkAdapter {
    pub fn new(output: Arc<dyn BlameOutput>) -> Self {
        Self { output }
    }

    pub fn forward(&self, file: &InputFile, lines: Vec<BlameLine>) {
        debug_assert_eq!(lines.len(), file.lines());
        tracing::debug!("Blame result for {}: {} lines", file.relative_path(), lines.len());
        self.output.blame_result(file, lines);
    }
}

/// Host-side sink keeping every result in memory, in delivery order.
#[derive(Debug, Default)]
pub struct CollectingOutput {
    results: Mutex<Vec<(InputFile, Vec<BlameLine>)>>,
}

impl CollectingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<(InputFile, Vec<BlameLine>)> {
        match self.results.lock() {
            Ok(results) => results.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl BlameOutput for CollectingOutput {
    fn blame_result(&self, file: &InputFile, lines: Vec<BlameLine>) {
        let mut results = match self.results.lock() {
            Ok(results) => results,
            Err(poisoned) => poisoned.into_inner(),
        };
        results.push((file.clone(), lines));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_once_per_call() {
        let output = Arc::new(CollectingOutput::new());
        let adapter = SinkAdapter::new(output.clone());
        let file = InputFile::new("a.cs", "/work/a.cs", 2);

        adapter.forward(&file, BlameLine::placeholders(2));

        let results = output.snapshot();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, file);
        assert_eq!(results[0].1.len(), 2);
    }
}
